use persistence_core::persistable::Persistable;
use persistence_macros::entity;

#[entity(table = "people", id = i32, debug = false)]
#[derive(PartialEq)]
struct Person {
    #[column(name = "person_id")]
    id: Option<i32>,
    #[column(name = "full_name")]
    name: String,
    nickname: Option<String>,
    #[column(skip)]
    cached_label: String,
}

impl std::fmt::Debug for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Person(..)")
    }
}

fn main() {
    assert_eq!(Person::ID_COLUMN, "person_id");
    assert_eq!(Person::COLUMNS, &["full_name", "nickname"]);
    assert!(Person::has_property("nickname"));
    assert!(!Person::has_property("cached_label"));

    let p = Person::default();
    assert_eq!(p.values().len(), 2);
    assert_eq!(p, p.clone());
    let _ = format!("{:?}", p);
}
