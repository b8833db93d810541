use persistence_core::persistable::Persistable;
use persistence_macros::entity;

#[entity(table = "tags", id = String, generated = false)]
struct Tag {
    label: String,
}

fn main() {
    assert!(!Tag::ID_GENERATED);
    let tag = Tag {
        id: Some("rust".into()),
        label: "Rust".into(),
    };
    assert_eq!(tag.id().map(String::as_str), Some("rust"));
}
