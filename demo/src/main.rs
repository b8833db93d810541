mod user;

use persistence_core::dao::BasePersistence;
use persistence_sqlx::{
    ManagedPersistenceProvider, ManualPersistenceProvider, PersistenceConfig, Query, SessionFactory,
    SessionManager,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use user::{CriteriaUserDao, ManualUserDao, QueryUserDao, SCHEMA, User, UserDao};

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("persistence.toml"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = config_path();
    let config = PersistenceConfig::load(&path)?;
    info!(path = %path.display(), url = %config.url, "configuration loaded");

    let factory = SessionFactory::build(&config).await?;
    let mut session = factory.open_session()?;
    session.execute_update(&Query::new(SCHEMA)).await?;
    session.execute_update(&Query::new("DELETE FROM users")).await?;
    session.close().await?;

    let criteria = CriteriaUserDao::new(ManagedPersistenceProvider::managed(factory.clone()));
    let query = QueryUserDao::new(ManagedPersistenceProvider::managed(factory.clone()));
    let manager = Arc::new(SessionManager::from_config(config));
    let manual = ManualUserDao::new(ManualPersistenceProvider::manual(manager.clone()));

    let mut alice = criteria
        .save(User::new("Alice", Some("alice@example.com"), 30))
        .await?;
    query.save(User::new("Malcolm", None, 45)).await?;
    manual
        .save(User::new("Bob", Some("bob@example.com"), 50))
        .await?;

    alice.age += 1;
    let alice = criteria.update(alice).await?;
    info!(?alice, "updated");

    info!(users = ?criteria.find_by_name("al").await?, "criteria dao");
    info!(users = ?query.find_by_name("AL").await?, "query dao");
    info!(users = ?manual.find_by_name("Al").await?, "manual dao");
    info!(users = ?query.find_by_email("bob@example.com").await?, "by email");

    let page = manual.find_all_range(Some(1), Some(1)).await?;
    info!(?page, total = manual.count_all().await?, "second page");

    manual.delete(&alice).await?;
    info!(remaining = query.count_all().await?, "alice deleted");

    manager.shutdown().await?;
    factory.close().await;
    Ok(())
}
