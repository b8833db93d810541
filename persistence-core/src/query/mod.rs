//! 查询参数与命名查询
//!
//! - `QueryParameters`：位置参数或命名参数；
//! - `expand`：将 `?`、`?N`、`:name` 占位符改写为方言占位符并生成有序绑定值；
//! - `NamedQueryRegistry`：命名查询注册表（名称 → SQL）。
//!
mod named;
mod params;

pub use named::NamedQueryRegistry;
pub use params::expand;
pub(crate) use params::copy_literal_or_comment;

use crate::error::{PersistenceError, PersistenceResult};
use crate::value::{Value, ValueKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryParameters {
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

impl QueryParameters {
    pub fn none() -> Self {
        QueryParameters::Positional(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            QueryParameters::Positional(v) => v.is_empty(),
            QueryParameters::Named(m) => m.is_empty(),
        }
    }

    /// 设置位置参数（从 0 开始）；中间空缺的位置以 NULL 文本占位
    pub fn set_positional(&mut self, position: usize, value: Value) -> PersistenceResult<()> {
        if matches!(self, QueryParameters::Named(map) if map.is_empty()) {
            *self = QueryParameters::Positional(Vec::new());
        }
        match self {
            QueryParameters::Positional(values) => {
                if values.len() <= position {
                    values.resize(position + 1, Value::Null(ValueKind::Text));
                }
                values[position] = value;
                Ok(())
            }
            QueryParameters::Named(_) => Err(PersistenceError::QueryParameter {
                reason: format!("cannot set positional parameter {position} on a query bound by name"),
            }),
        }
    }

    /// 设置命名参数
    pub fn set_named(&mut self, name: impl Into<String>, value: Value) -> PersistenceResult<()> {
        if matches!(self, QueryParameters::Positional(values) if values.is_empty()) {
            *self = QueryParameters::Named(BTreeMap::new());
        }
        match self {
            QueryParameters::Named(map) => {
                map.insert(name.into(), value);
                Ok(())
            }
            QueryParameters::Positional(_) => Err(PersistenceError::QueryParameter {
                reason: format!(
                    "cannot set named parameter :{} on a query bound by position",
                    name.into()
                ),
            }),
        }
    }
}

impl Default for QueryParameters {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Vec<Value>> for QueryParameters {
    fn from(values: Vec<Value>) -> Self {
        QueryParameters::Positional(values)
    }
}

impl From<&[Value]> for QueryParameters {
    fn from(values: &[Value]) -> Self {
        QueryParameters::Positional(values.to_vec())
    }
}

impl From<BTreeMap<String, Value>> for QueryParameters {
    fn from(map: BTreeMap<String, Value>) -> Self {
        QueryParameters::Named(map)
    }
}

impl From<&BTreeMap<String, Value>> for QueryParameters {
    fn from(map: &BTreeMap<String, Value>) -> Self {
        QueryParameters::Named(map.clone())
    }
}
