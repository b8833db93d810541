//! 动态绑定值（Value）
//!
//! 查询参数、条件值与实体列值的统一表示。取值范围与 sqlx `Any` 驱动
//! 可编码的类型一致：布尔、64 位整数、浮点、文本与字节串；
//! `uuid` 与 `chrono` 的类型以文本形式绑定。
//!
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 值的类型标签，用于绑定带类型的 NULL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null(kind) => *kind,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self.kind() {
            ValueKind::Bool => "bool",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
        }
    }
}

/// 可转换为 `Value` 的类型的静态类型标签
pub trait ValueType {
    const KIND: ValueKind;
}

macro_rules! impl_value_type {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(
            impl ValueType for $ty {
                const KIND: ValueKind = ValueKind::$kind;
            }
        )+
    };
}

impl_value_type!(Bool => bool);
impl_value_type!(Int => i8, i16, i32, i64, u8, u16, u32);
impl_value_type!(Float => f32, f64);
impl_value_type!(Text => String, &str, &String, Uuid, DateTime<Utc>, NaiveDate, NaiveDateTime);
impl_value_type!(Bytes => Vec<u8>, &[u8]);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! int_into_value {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )+
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Text(v.to_rfc3339())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value> + ValueType,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null(T::KIND),
        }
    }
}

/// 构造位置参数列表：`params!["alice", 18]`
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::value::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::value::Value::from($value)),+]
    };
}

/// 构造命名参数表：`named_params! { "name" => "alice" }`
#[macro_export]
macro_rules! named_params {
    () => {
        ::std::collections::BTreeMap::<::std::string::String, $crate::value::Value>::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::<::std::string::String, $crate::value::Value>::new();
        $(map.insert(::std::string::String::from($name), $crate::value::Value::from($value));)+
        map
    }};
}
