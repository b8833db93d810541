//! 通用持久化抽象层（persistence-core）
//!
//! 提供与具体数据库后端解耦的 CRUD 契约与构件：
//! - 实体与标识（`persistable`）、动态绑定值（`value`）
//! - 条件查询（`criteria`）：`Criterion` / `Restrictions` / `Criteria`
//! - 查询参数展开与命名查询注册表（`query`）
//! - 按方言渲染 SQL（`sql`）
//! - 持久化提供者协议（`provider`）与 DAO 基础协议（`dao`）
//!
//! 本 crate 只定义协议与 SQL 渲染规则，会话、事务与连接池由上层
//! （例如 `persistence-sqlx`）基于 sqlx 提供实现并注入。
//!
//! 典型用法：
//! 1. 使用 `#[entity]` 宏声明实体，获得 `Persistable` 实现；
//! 2. 选择一个 `PersistenceProvider` 实现（托管、手动或 EntityManager 绑定）；
//! 3. 在 DAO 中实现 `BasePersistence`，复用默认的 CRUD 委托。
//!
pub mod criteria;
pub mod dao;
pub mod error;
pub mod persistable;
pub mod provider;
pub mod query;
pub mod sql;
pub mod value;

pub use criteria::{Criteria, Criterion, MatchMode, Order, Projection, Restrictions, ResultTransformer};
pub use error::{PersistenceError, PersistenceResult};
pub use persistable::{Identifier, Persistable};
pub use provider::{CriteriaPersistenceProvider, PersistenceProvider};
pub use query::{NamedQueryRegistry, QueryParameters};
pub use sql::{Dialect, SqlBuilder, SqlStatement};
pub use value::{Value, ValueKind};

// 宏生成的代码通过 ::persistence_core::sqlx 引用 sqlx，调用方无需直接依赖
pub use sqlx;

// 允许在本 crate 内部通过 ::persistence_core 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::persistence_core 路径。
extern crate self as persistence_core;
