mod common;

use common::{Tag, TestDb, User, seed};
use persistence_core::error::PersistenceError;
use persistence_core::provider::PersistenceProvider;
use persistence_sqlx::ManagedPersistenceProvider;

#[tokio::test]
async fn save_assigns_generated_id_and_reloads() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let provider = ManagedPersistenceProvider::managed(db.factory().await?);

    let saved = provider.save(User::new("Alice", 30)).await?;
    let id = saved.id.expect("generated id");
    assert_eq!(saved.name, "Alice");

    let found = provider.find_by_id::<User>(&id).await?;
    assert_eq!(found, Some(saved));
    assert_eq!(provider.find_by_id::<User>(&(id + 100)).await?, None);
    Ok(())
}

#[tokio::test]
async fn update_changes_existing_row() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let provider = ManagedPersistenceProvider::managed(db.factory().await?);

    let mut user = provider.save(User::new("Bob", 40)).await?;
    user.age = 41;
    user.email = None;
    let updated = provider.update(user.clone()).await?;
    assert_eq!(updated, user);
    assert_eq!(provider.count_all::<User>().await?, 1);
    Ok(())
}

#[tokio::test]
async fn save_with_unknown_generated_id_is_stale() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let provider = ManagedPersistenceProvider::managed(db.factory().await?);

    let mut ghost = User::new("Ghost", 1);
    ghost.id = Some(999);
    let err = provider.save(ghost).await.unwrap_err();
    assert!(matches!(err, PersistenceError::StaleState { entity: "User", .. }));
    assert_eq!(provider.count_all::<User>().await?, 0);
    Ok(())
}

#[tokio::test]
async fn assigned_ids_insert_then_update() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let provider = ManagedPersistenceProvider::managed(db.factory().await?);

    let tag = Tag {
        id: Some("rust".into()),
        label: "Rust".into(),
    };
    assert_eq!(provider.save(tag.clone()).await?, tag);

    let renamed = Tag {
        label: "Rust lang".into(),
        ..tag
    };
    assert_eq!(provider.save(renamed.clone()).await?, renamed);
    assert_eq!(provider.count_all::<Tag>().await?, 1);

    let err = provider.save(Tag::default()).await.unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::MissingIdentifier {
            entity: "Tag",
            action: "save"
        }
    ));
    Ok(())
}

#[tokio::test]
async fn delete_by_entity_and_by_id() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let factory = db.factory().await?;
    let users = seed(&factory, &[("Ann", 20), ("Ben", 25), ("Cid", 30)]).await?;
    let provider = ManagedPersistenceProvider::managed(factory);

    provider.delete(&users[0]).await?;
    provider.delete_by_id::<User>(users[1].id.as_ref().expect("id")).await?;
    assert_eq!(provider.find_all::<User>().await?, vec![users[2].clone()]);

    // 显式标识优先于实体上的标识
    provider
        .delete_by_entity_or_id(Some(&users[0]), users[2].id.as_ref())
        .await?;
    assert_eq!(provider.count_all::<User>().await?, 0);
    Ok(())
}

#[tokio::test]
async fn delete_failures() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let provider = ManagedPersistenceProvider::managed(db.factory().await?);

    let err = provider.delete(&User::new("Nobody", 0)).await.unwrap_err();
    assert_eq!(err.to_string(), "could not delete User: id is null");

    let err = provider
        .delete_by_entity_or_id::<User>(None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::MissingIdentifier { .. }));

    let err = provider.delete_by_id::<User>(&42).await.unwrap_err();
    assert!(matches!(err, PersistenceError::StaleState { .. }));
    Ok(())
}

#[tokio::test]
async fn find_all_range_applies_offset_and_limit() -> anyhow::Result<()> {
    let db = TestDb::new()?;
    let factory = db.factory().await?;
    seed(&factory, &[("A", 1), ("B", 2), ("C", 3), ("D", 4)]).await?;
    let provider = ManagedPersistenceProvider::managed(factory);

    let names = |users: Vec<User>| users.into_iter().map(|u| u.name).collect::<Vec<_>>();
    assert_eq!(names(provider.find_all::<User>().await?).len(), 4);
    assert_eq!(
        names(provider.find_all_range::<User>(Some(1), Some(2)).await?),
        vec!["B", "C"]
    );
    assert_eq!(
        names(provider.find_all_range::<User>(Some(3), None).await?),
        vec!["D"]
    );
    assert_eq!(
        names(provider.find_all_range::<User>(None, Some(1)).await?),
        vec!["A"]
    );
    Ok(())
}
