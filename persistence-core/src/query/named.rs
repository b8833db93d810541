use crate::error::{PersistenceError, PersistenceResult};
use std::collections::HashMap;

/// 命名查询注册表（名称 → SQL）
#[derive(Debug, Clone, Default)]
pub struct NamedQueryRegistry {
    queries: HashMap<String, String>,
}

impl NamedQueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命名查询；同名查询会被覆盖并返回旧的 SQL
    pub fn register(&mut self, name: impl Into<String>, sql: impl Into<String>) -> Option<String> {
        self.queries.insert(name.into(), sql.into())
    }

    pub fn get(&self, name: &str) -> PersistenceResult<&str> {
        self.queries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PersistenceError::NamedQueryNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// 已注册的查询名（只读视图）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<K, V> FromIterator<(K, V)> for NamedQueryRegistry
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (name, sql) in iter {
            registry.register(name, sql);
        }
        registry
    }
}
