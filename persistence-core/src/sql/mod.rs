//! SQL 方言与语句构建
//!
//! `Dialect` 决定占位符形式与分页子句；`SqlBuilder` 在拼接 SQL 的同时
//! 按顺序收集绑定值，产出 `SqlStatement`。
//!
mod entity;

pub use entity::EntityStatements;

use crate::error::{PersistenceError, PersistenceResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
    MySql,
}

impl Dialect {
    /// 按连接 URL 的 scheme 推断方言
    pub fn from_url(url: &str) -> PersistenceResult<Self> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| PersistenceError::Configuration {
                reason: format!("database url has no scheme: {url}"),
            })?;

        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            other => Err(PersistenceError::Configuration {
                reason: format!("unsupported database scheme: {other}"),
            }),
        }
    }

    /// 第 `index` 个（从 1 开始）绑定参数的占位符
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    /// INSERT 是否支持 RETURNING 子句回传生成主键
    pub fn supports_returning(&self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::Sqlite)
    }

    /// 分页子句；仅在设置了 max_results 时限制条数，仅在设置了 first_result 时偏移
    pub fn limit_offset(&self, first_result: Option<u64>, max_results: Option<u64>) -> String {
        let mut out = String::new();
        match (max_results, first_result) {
            (Some(max), _) => {
                let _ = write!(out, " LIMIT {max}");
            }
            (None, Some(_)) => match self {
                Dialect::Postgres => {}
                Dialect::Sqlite => out.push_str(" LIMIT -1"),
                Dialect::MySql => out.push_str(" LIMIT 18446744073709551615"),
            },
            (None, None) => {}
        }
        if let Some(first) = first_result {
            let _ = write!(out, " OFFSET {first}");
        }
        out
    }
}

/// 渲染完成的语句：SQL 文本及其有序绑定值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }
}

/// SQL 拼接器
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    dialect: Dialect,
    sql: String,
    values: Vec<Value>,
}

impl SqlBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            values: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    pub fn push_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    /// 追加占位符并记录绑定值
    pub fn push_bind(&mut self, value: Value) -> &mut Self {
        self.values.push(value);
        let placeholder = self.dialect.placeholder(self.values.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// 以逗号分隔追加多个绑定占位符
    pub fn push_binds(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_bind(value);
        }
        self
    }

    pub fn build(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            values: self.values,
        }
    }
}

/// 校验 SQL 标识符（表名/列名）；拒绝可能造成注入的字符
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
