use persistence_core::persistable::Persistable;
use persistence_core::value::Value;
use persistence_macros::entity;

#[entity(table = "accounts")]
struct Account {
    name: String,
    balance: i64,
}

fn main() {
    assert_eq!(Account::ENTITY, "Account");
    assert_eq!(Account::TABLE, "accounts");
    assert_eq!(Account::ID_COLUMN, "id");
    assert_eq!(Account::COLUMNS, &["name", "balance"]);
    assert!(Account::ID_GENERATED);

    let mut account = Account {
        id: None,
        name: "main".into(),
        balance: 10,
    };
    assert!(account.id().is_none());
    account.set_id(3);
    assert_eq!(account.id(), Some(&3));
    assert_eq!(account.values(), vec![Value::Text("main".into()), Value::Int(10)]);

    let _ = format!("{:?}", account.clone());
    let _ = Account::default();
}
