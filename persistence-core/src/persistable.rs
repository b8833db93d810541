//! 可持久化实体（Persistable）基础抽象
//!
//! 为实体提供统一的标识（Id）与表映射能力：表名、主键列、普通列、
//! 列值提取与行映射（通过 sqlx `FromRow`）。
//!
use crate::error::{PersistenceError, PersistenceResult};
use crate::value::Value;
use sqlx::FromRow;
use sqlx::any::AnyRow;
use std::fmt::Debug;

/// 实体标识类型
pub trait Identifier: Clone + Debug + Send + Sync + 'static {
    /// 转换为绑定值
    fn to_value(&self) -> Value;

    /// 从数据库返回的值（例如自增主键）还原标识
    fn from_value(value: Value) -> PersistenceResult<Self>;
}

impl Identifier for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> PersistenceResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            Value::Text(s) => Ok(s.parse()?),
            other => Err(PersistenceError::TypeMismatch {
                expected: "i64",
                found: other.type_name(),
            }),
        }
    }
}

impl Identifier for i32 {
    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> PersistenceResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|e| PersistenceError::InvalidIdentifier {
            reason: format!("{wide} does not fit in i32: {e}"),
        })
    }
}

impl Identifier for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> PersistenceResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Int(v) => Ok(v.to_string()),
            other => Err(PersistenceError::TypeMismatch {
                expected: "String",
                found: other.type_name(),
            }),
        }
    }
}

/// 可持久化实体
///
/// 通常由 `#[entity(table = "...")]` 宏生成实现；手写实现时需保证
/// `values()` 的顺序与 `COLUMNS` 一致。
pub trait Persistable: for<'r> FromRow<'r, AnyRow> + Clone + Send + Sync + Unpin + 'static {
    /// 标识类型
    type Id: Identifier;

    /// 实体名（用于错误信息与日志）
    const ENTITY: &'static str;

    /// 表名
    const TABLE: &'static str;

    /// 主键列
    const ID_COLUMN: &'static str = "id";

    /// 除主键外的列，顺序与 `values()` 一致
    const COLUMNS: &'static [&'static str];

    /// 主键是否由数据库生成；为 false 时标识由调用方分配
    const ID_GENERATED: bool = true;

    /// 获取标识；尚未持久化的实体（数据库生成主键）返回 None
    fn id(&self) -> Option<&Self::Id>;

    /// 回填标识
    fn set_id(&mut self, id: Self::Id);

    /// 列值，顺序与 `COLUMNS` 一致
    fn values(&self) -> Vec<Value>;

    /// 判断属性名是否映射到本实体的列
    fn has_property(property: &str) -> bool {
        property == Self::ID_COLUMN || Self::COLUMNS.contains(&property)
    }
}
