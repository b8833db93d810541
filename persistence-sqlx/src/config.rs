use bon::Builder;
use persistence_core::error::{PersistenceError, PersistenceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 默认配置资源
pub const DEFAULT_RESOURCE: &str = "persistence.toml";

/// 覆盖 `url` 的环境变量
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// 持久化配置
///
/// ```toml
/// url = "sqlite://app.db?mode=rwc"
/// max_connections = 5
/// show_sql = true
///
/// [cache]
/// use_query_cache = true
///
/// [named_queries]
/// "User.byName" = "SELECT id, name FROM users WHERE name = :name"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct PersistenceConfig {
    #[builder(into)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    #[builder(default = default_max_connections())]
    pub max_connections: u32,
    #[serde(default)]
    #[builder(default)]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    #[builder(default = default_acquire_timeout_secs())]
    pub acquire_timeout_secs: u64,
    /// 以 info 级别输出执行的 SQL
    #[serde(default)]
    #[builder(default)]
    pub show_sql: bool,
    #[serde(default)]
    #[builder(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    #[builder(default)]
    pub named_queries: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub use_query_cache: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl PersistenceConfig {
    pub fn from_toml_str(contents: &str) -> PersistenceResult<Self> {
        let config: Self = toml::from_str(contents).map_err(|err| PersistenceError::Configuration {
            reason: format!("invalid persistence config: {err}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|err| PersistenceError::Configuration {
                reason: format!("failed to read {}: {err}", path.display()),
            })?;
        Self::from_toml_str(&contents)
    }

    /// 读取配置文件并应用环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        Ok(Self::from_file(path)?.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// 以给定的查找函数应用覆盖；空白值会被忽略
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.url = url;
        }
        self
    }

    pub fn validate(&self) -> PersistenceResult<()> {
        if self.url.trim().is_empty() {
            return Err(PersistenceError::Configuration {
                reason: "url must not be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(PersistenceError::Configuration {
                reason: "max_connections must be positive".to_string(),
            });
        }
        if self.min_connections > self.max_connections {
            return Err(PersistenceError::Configuration {
                reason: format!(
                    "min_connections ({}) exceeds max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }
        Ok(())
    }
}
