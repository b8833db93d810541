mod common;

use common::{TestDb, User, seed};
use persistence_core::error::PersistenceError;
use persistence_core::provider::PersistenceProvider;
use persistence_core::{named_params, params};
use persistence_sqlx::{ManagedPersistenceProvider, Query};

fn names(users: Vec<User>) -> Vec<String> {
    users.into_iter().map(|u| u.name).collect()
}

#[tokio::test]
async fn positional_and_ordinal_parameters() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let factory = db.factory().await?;
    seed(&factory, &[("Alice", 30), ("alfred", 45), ("Bob", 50)]).await?;
    let provider = ManagedPersistenceProvider::managed(factory);

    let found = provider
        .find_by_query::<User>(
            "SELECT id, name, email, age FROM users WHERE lower(name) LIKE ?1 ORDER BY name",
            &params!["%al%"],
        )
        .await?;
    assert_eq!(names(found), vec!["Alice", "alfred"]);

    let found = provider
        .find_by_query::<User>(
            "SELECT id, name, email, age FROM users WHERE age >= ? AND age <= ?",
            &params![40, 50],
        )
        .await?;
    assert_eq!(names(found), vec!["alfred", "Bob"]);

    let none = provider
        .find_by_query::<User>(
            "SELECT id, name, email, age FROM users WHERE name = ?",
            &params!["nobody"],
        )
        .await?;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn named_parameters_and_named_queries() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let factory = db.factory().await?;
    seed(&factory, &[("Alice", 30), ("Bob", 50), ("Carol", 70)]).await?;
    let provider = ManagedPersistenceProvider::managed(factory);

    let found = provider
        .find_by_query_and_named_params::<User>(
            "SELECT id, name, email, age FROM users WHERE age > :min AND age < :max",
            &named_params! { "min" => 40, "max" => 80 },
        )
        .await?;
    assert_eq!(names(found), vec!["Bob", "Carol"]);

    let found = provider
        .find_by_named_query_and_named_params::<User>("User.byName", &named_params! { "name" => "Alice" })
        .await?;
    assert_eq!(names(found), vec!["Alice"]);

    let found = provider
        .find_by_named_query::<User>("User.olderThan", &params![40])
        .await?;
    assert_eq!(names(found), vec!["Bob", "Carol"]);

    let err = provider
        .find_by_named_query::<User>("User.missing", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::NamedQueryNotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn parameter_errors_surface() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let provider = ManagedPersistenceProvider::managed(db.factory().await?);

    let err = provider
        .find_by_query_and_named_params::<User>(
            "SELECT id, name, email, age FROM users WHERE name = :name",
            &named_params! { "name" => "x", "extra" => 1 },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::QueryParameter { .. }));

    let err = provider
        .find_by_query::<User>("SELECT id, name, email, age FROM users WHERE name = ?", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::QueryParameter { .. }));
    Ok(())
}

#[tokio::test]
async fn counts_convert_to_requested_type() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let factory = db.factory().await?;
    seed(&factory, &[("Alice", 30), ("Bob", 50), ("Carol", 70)]).await?;
    let provider = ManagedPersistenceProvider::managed(factory);

    let older: u32 = provider
        .count_by_named_query_and_named_params("User.countOlderThan", &named_params! { "age" => 40 })
        .await?;
    assert_eq!(older, 2);

    let all: usize = provider
        .count_by_query_and_named_params("SELECT COUNT(*) FROM users", &Default::default())
        .await?;
    assert_eq!(all, 3);

    let err = provider
        .count_by_query_and_named_params::<u8>("SELECT 1000", &Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::TypeMismatch { found: "i64", .. }));
    Ok(())
}

#[tokio::test]
async fn session_queries_and_execute_update() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let factory = db.factory().await?;
    seed(&factory, &[("Alice", 30), ("Bob", 50)]).await?;

    let mut session = factory.open_session()?;
    let mut bump = Query::new("UPDATE users SET age = age + ? WHERE name = ?");
    bump.set_parameter(0, 1)?.set_parameter(1, "Alice")?;
    assert_eq!(session.execute_update(&bump).await?, 1);

    let mut by_name = session.named_query("User.byName")?;
    by_name.set_named_parameter("name", "Alice")?;
    let alice: Option<User> = session.unique_result(&by_name).await?;
    assert_eq!(alice.map(|u| u.age), Some(31));

    let everyone = session.create_query("SELECT id, name, email, age FROM users");
    let err = session.unique_result::<User>(&everyone).await.unwrap_err();
    assert!(matches!(err, PersistenceError::NonUniqueResult { count: 2 }));

    let err = by_name.set_parameter(0, 1).unwrap_err();
    assert!(matches!(err, PersistenceError::QueryParameter { .. }));

    session.close().await?;
    let err = session.list::<User>(&everyone).await.unwrap_err();
    assert!(matches!(err, PersistenceError::SessionClosed));
    Ok(())
}
