use async_trait::async_trait;
use persistence_core::dao::BasePersistence;
use persistence_core::error::PersistenceResult;
use persistence_core::provider::{CriteriaPersistenceProvider, PersistenceProvider};
use persistence_core::{MatchMode, Restrictions, named_params, params};
use persistence_macros::entity;
use persistence_sqlx::{ManagedPersistenceProvider, ManualPersistenceProvider};

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    age INTEGER NOT NULL
)";

#[entity(table = "users")]
#[derive(PartialEq)]
pub struct User {
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

impl User {
    pub fn new(name: impl Into<String>, email: Option<&str>, age: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.map(str::to_string),
            age,
        }
    }
}

/// 用户 DAO
#[async_trait]
pub trait UserDao: BasePersistence<User> {
    /// 按名字片段查找，忽略大小写
    async fn find_by_name(&self, name: &str) -> PersistenceResult<Vec<User>>;

    async fn find_by_email(&self, email: &str) -> PersistenceResult<Vec<User>> {
        self.persistence_provider()
            .find_by_named_query_and_named_params("User.byEmail", &named_params! { "email" => email })
            .await
    }
}

/// 基于 Criteria 的实现
pub struct CriteriaUserDao {
    provider: ManagedPersistenceProvider,
}

impl CriteriaUserDao {
    pub fn new(provider: ManagedPersistenceProvider) -> Self {
        Self { provider }
    }
}

impl BasePersistence<User> for CriteriaUserDao {
    type Provider = ManagedPersistenceProvider;

    fn persistence_provider(&self) -> &Self::Provider {
        &self.provider
    }
}

#[async_trait]
impl UserDao for CriteriaUserDao {
    async fn find_by_name(&self, name: &str) -> PersistenceResult<Vec<User>> {
        self.provider
            .find_by_criteria(vec![Restrictions::ilike("name", name, MatchMode::Anywhere)])
            .await
    }
}

/// 基于 SQL 查询的实现
pub struct QueryUserDao {
    provider: ManagedPersistenceProvider,
}

impl QueryUserDao {
    pub fn new(provider: ManagedPersistenceProvider) -> Self {
        Self { provider }
    }
}

impl BasePersistence<User> for QueryUserDao {
    type Provider = ManagedPersistenceProvider;

    fn persistence_provider(&self) -> &Self::Provider {
        &self.provider
    }
}

#[async_trait]
impl UserDao for QueryUserDao {
    async fn find_by_name(&self, name: &str) -> PersistenceResult<Vec<User>> {
        let pattern = format!("%{}%", name.to_lowercase());
        self.provider
            .find_by_query(
                "SELECT id, name, email, age FROM users WHERE lower(name) LIKE ?1 ORDER BY id",
                &params![pattern],
            )
            .await
    }
}

/// 手动管理会话的实现
pub struct ManualUserDao {
    provider: ManualPersistenceProvider,
}

impl ManualUserDao {
    pub fn new(provider: ManualPersistenceProvider) -> Self {
        Self { provider }
    }
}

impl BasePersistence<User> for ManualUserDao {
    type Provider = ManualPersistenceProvider;

    fn persistence_provider(&self) -> &Self::Provider {
        &self.provider
    }
}

#[async_trait]
impl UserDao for ManualUserDao {
    async fn find_by_name(&self, name: &str) -> PersistenceResult<Vec<User>> {
        self.provider
            .find_by_criteria(vec![Restrictions::ilike("name", name, MatchMode::Anywhere)])
            .await
    }
}
