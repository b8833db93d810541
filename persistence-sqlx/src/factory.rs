use crate::cache::QueryCache;
use crate::config::PersistenceConfig;
use crate::session::Session;
use persistence_core::error::{PersistenceError, PersistenceResult};
use persistence_core::query::NamedQueryRegistry;
use persistence_core::sql::Dialect;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

tokio::task_local! {
    static AMBIENT: AmbientSession;
}

/// 绑定到当前任务的事务性会话
#[derive(Clone)]
struct AmbientSession {
    factory: usize,
    session: Arc<Mutex<Session>>,
}

struct FactoryInner {
    pool: AnyPool,
    dialect: Dialect,
    named_queries: NamedQueryRegistry,
    query_cache: Option<QueryCache>,
    show_sql: bool,
}

/// 会话工厂
///
/// 持有连接池、方言、命名查询与查询缓存；克隆开销很小，所有克隆共享同一连接池。
#[derive(Clone)]
pub struct SessionFactory {
    inner: Arc<FactoryInner>,
}

impl SessionFactory {
    pub async fn build(config: &PersistenceConfig) -> PersistenceResult<Self> {
        config.validate()?;
        let dialect = Dialect::from_url(&config.url)?;

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        let named_queries: NamedQueryRegistry = config
            .named_queries
            .iter()
            .map(|(name, sql)| (name.as_str(), sql.as_str()))
            .collect();
        let query_cache = config.cache.use_query_cache.then(QueryCache::new);

        info!(
            ?dialect,
            max_connections = config.max_connections,
            named_queries = named_queries.len(),
            query_cache = query_cache.is_some(),
            "session factory built"
        );

        Ok(Self {
            inner: Arc::new(FactoryInner {
                pool,
                dialect,
                named_queries,
                query_cache,
                show_sql: config.show_sql,
            }),
        })
    }

    pub fn open_session(&self) -> PersistenceResult<Session> {
        if self.is_closed() {
            return Err(PersistenceError::SessionFactoryClosed);
        }
        Ok(Session::new(self.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// 关闭连接池；之后打开会话会失败
    pub async fn close(&self) {
        if !self.is_closed() {
            self.inner.pool.close().await;
            info!("session factory closed");
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    pub fn named_queries(&self) -> &NamedQueryRegistry {
        &self.inner.named_queries
    }

    pub fn query_cache(&self) -> Option<&QueryCache> {
        self.inner.query_cache.as_ref()
    }

    pub(crate) fn pool(&self) -> &AnyPool {
        &self.inner.pool
    }

    pub(crate) fn show_sql(&self) -> bool {
        self.inner.show_sql
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// 当前任务上由本工厂开启的环境事务会话
    pub fn current_session(&self) -> Option<Arc<Mutex<Session>>> {
        AMBIENT
            .try_with(|ambient| (ambient.factory == self.id()).then(|| ambient.session.clone()))
            .ok()
            .flatten()
    }

    /// 在环境事务中执行 `work`
    ///
    /// `Ok` 时提交，`Err` 时回滚。已处于本工厂的环境事务中时直接加入，
    /// 由外层决定提交或回滚。
    pub async fn in_transaction<F, Fut, R>(&self, work: F) -> PersistenceResult<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PersistenceResult<R>>,
    {
        if self.current_session().is_some() {
            return work().await;
        }

        let mut session = self.open_session()?;
        session.begin_transaction().await?;
        let session = Arc::new(Mutex::new(session));
        let ambient = AmbientSession {
            factory: self.id(),
            session: session.clone(),
        };

        let result = AMBIENT.scope(ambient, work()).await;

        let mut session = session.lock().await;
        match result {
            Ok(value) => {
                session.commit().await?;
                session.close().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "ambient transaction failed");
                session.rollback().await?;
                session.close().await?;
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("dialect", &self.inner.dialect)
            .field("closed", &self.is_closed())
            .field("named_queries", &self.inner.named_queries.len())
            .field("query_cache", &self.inner.query_cache)
            .finish()
    }
}
