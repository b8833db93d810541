#![allow(dead_code)]

use persistence_macros::entity;
use persistence_sqlx::{PersistenceConfig, Query, SessionFactory};
use tempfile::TempDir;

#[entity(table = "users")]
#[derive(PartialEq)]
pub struct User {
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

impl User {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            age,
        }
    }
}

#[entity(table = "tags", id = String, generated = false)]
#[derive(PartialEq)]
pub struct Tag {
    pub label: String,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        age INTEGER NOT NULL
    )",
    "CREATE TABLE tags (id TEXT PRIMARY KEY, label TEXT NOT NULL)",
];

/// 临时 SQLite 数据库；`dir` 需与工厂同生命周期
pub struct TestDb {
    pub dir: TempDir,
    pub config: PersistenceConfig,
}

impl TestDb {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_cache(false)
    }

    pub fn with_cache(use_query_cache: bool) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let mut config = PersistenceConfig::builder()
            .url(url)
            .max_connections(4)
            .named_queries(
                [
                    (
                        "User.byName".to_string(),
                        "SELECT id, name, email, age FROM users WHERE name = :name".to_string(),
                    ),
                    (
                        "User.olderThan".to_string(),
                        "SELECT id, name, email, age FROM users WHERE age > ? ORDER BY age".to_string(),
                    ),
                    (
                        "User.countOlderThan".to_string(),
                        "SELECT COUNT(*) FROM users WHERE age > :age".to_string(),
                    ),
                ]
                .into_iter()
                .collect(),
            )
            .build();
        config.cache.use_query_cache = use_query_cache;
        Ok(Self { dir, config })
    }

    /// 构建工厂并建表
    pub async fn factory(&self) -> anyhow::Result<SessionFactory> {
        let factory = SessionFactory::build(&self.config).await?;
        let mut session = factory.open_session()?;
        for ddl in SCHEMA {
            session.execute_update(&Query::new(*ddl)).await?;
        }
        session.close().await?;
        Ok(factory)
    }
}

pub async fn seed(factory: &SessionFactory, users: &[(&str, i64)]) -> anyhow::Result<Vec<User>> {
    let mut session = factory.open_session()?;
    session.begin_transaction().await?;
    let mut saved = Vec::with_capacity(users.len());
    for (name, age) in users {
        let mut user = User::new(name, *age);
        session.save(&mut user).await?;
        saved.push(user);
    }
    session.commit().await?;
    session.close().await?;
    Ok(saved)
}
