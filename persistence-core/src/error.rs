//! 持久化层统一错误定义
//!
//! 覆盖会话生命周期、查询参数绑定、条件渲染、实体标识与数据库驱动错误，
//! 便于各提供者实现统一转换为 `PersistenceError`。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PersistenceError {
    // --- 数据库/驱动 ---
    #[error("database error: {reason}")]
    Database { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },

    // --- 实体与标识 ---
    #[error("could not {action} {entity}: id is null")]
    MissingIdentifier {
        entity: &'static str,
        action: &'static str,
    },
    #[error("stale state: no row of {entity} matched id={id}")]
    StaleState { entity: &'static str, id: String },
    #[error("invalid identifier: {reason}")]
    InvalidIdentifier { reason: String },

    // --- 查询 ---
    #[error("query did not return a unique result: {count} rows")]
    NonUniqueResult { count: usize },
    #[error("named query not known: {name}")]
    NamedQueryNotFound { name: String },
    #[error("query parameter error: {reason}")]
    QueryParameter { reason: String },
    #[error("could not resolve property: {property} of: {entity}")]
    UnknownProperty {
        property: String,
        entity: &'static str,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // --- 会话/配置 ---
    #[error("session is closed")]
    SessionClosed,
    #[error("session factory is closed")]
    SessionFactoryClosed,
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    // --- 手动会话模式下对失败操作的包装 ---
    #[error("could not {action}: {reason}")]
    Operation {
        action: &'static str,
        reason: String,
    },
}

/// 统一 Result 类型别名
pub type PersistenceResult<T> = Result<T, PersistenceError>;

// ---- Cross-crate conversions for infrastructure convenience ----
// 允许在提供者实现中直接使用 `?` 将 sqlx/uuid 等错误转换为 PersistenceError

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PersistenceError::NotFound {
                reason: "row not found".to_string(),
            },
            sqlx::Error::PoolClosed => PersistenceError::SessionFactoryClosed,
            other => PersistenceError::Database {
                reason: other.to_string(),
            },
        }
    }
}

impl From<uuid::Error> for PersistenceError {
    fn from(err: uuid::Error) -> Self {
        PersistenceError::InvalidIdentifier {
            reason: err.to_string(),
        }
    }
}

impl From<std::num::ParseIntError> for PersistenceError {
    fn from(err: std::num::ParseIntError) -> Self {
        PersistenceError::InvalidIdentifier {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Database {
            reason: format!("serialization error: {err}"),
        }
    }
}
