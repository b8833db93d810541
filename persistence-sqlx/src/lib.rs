//! 基于 sqlx 的持久化提供者（persistence-sqlx）
//!
//! - `config`：`PersistenceConfig`，从 TOML 加载并支持环境变量覆盖；
//! - `factory` / `session`：会话工厂、会话与查询，封装连接池、事务与 SQL 执行；
//! - `cache`：可选的查询缓存，按表区域失效；
//! - `context`：会话生命周期变体（托管、手动、EntityManager 绑定）；
//! - `provider`：`SqlxPersistenceProvider<C>`，在会话之上实现提供者协议。
//!
pub mod cache;
pub mod config;
pub mod context;
pub mod factory;
pub mod provider;
pub mod session;

pub use cache::{ALL_REGIONS, CacheKey, CacheStats, QueryCache};
pub use config::{CacheConfig, PersistenceConfig};
pub use context::entity_manager::{
    EntityManager, EntityManagerContext, EntityManagerFactory, EntityTransaction,
};
pub use context::managed::ManagedSessionContext;
pub use context::manual::{ManualSessionContext, SessionManager};
pub use context::{Operation, Propagation, SessionContext, SessionLease};
pub use factory::SessionFactory;
pub use provider::{
    EntityManagerPersistenceProvider, ManagedPersistenceProvider, ManualPersistenceProvider,
    SqlxPersistenceProvider,
};
pub use session::{Query, Session};
