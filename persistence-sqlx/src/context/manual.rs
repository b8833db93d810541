use super::{Operation, SessionContext, SessionLease, wrap};
use crate::config::{DEFAULT_RESOURCE, PersistenceConfig};
use crate::factory::SessionFactory;
use crate::session::Session;
use async_trait::async_trait;
use persistence_core::error::PersistenceResult;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

enum FactorySource {
    Resource(PathBuf),
    Config(Box<PersistenceConfig>),
}

/// 手动会话管理
///
/// 首次使用时按配置惰性构建会话工厂（默认读取 `persistence.toml`，
/// 并应用 `DATABASE_URL` 覆盖），并维护一个当前会话：会话已关闭时重新打开。
pub struct SessionManager {
    source: FactorySource,
    factory: OnceCell<SessionFactory>,
    current: Mutex<Option<Arc<Mutex<Session>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::from_resource(DEFAULT_RESOURCE)
    }

    pub fn from_resource(path: impl Into<PathBuf>) -> Self {
        Self::with_source(FactorySource::Resource(path.into()))
    }

    pub fn from_config(config: PersistenceConfig) -> Self {
        Self::with_source(FactorySource::Config(Box::new(config)))
    }

    fn with_source(source: FactorySource) -> Self {
        Self {
            source,
            factory: OnceCell::new(),
            current: Mutex::new(None),
        }
    }

    pub async fn session_factory(&self) -> PersistenceResult<&SessionFactory> {
        self.factory
            .get_or_try_init(|| async {
                let config = match &self.source {
                    FactorySource::Resource(path) => PersistenceConfig::load(path)?,
                    FactorySource::Config(config) => config.as_ref().clone(),
                };
                SessionFactory::build(&config).await
            })
            .await
    }

    /// 当前会话；尚未打开或已关闭时打开新的会话
    pub async fn current_session(&self) -> PersistenceResult<Arc<Mutex<Session>>> {
        let mut current = self.current.lock().await;
        if let Some(session) = current.as_ref()
            && session.lock().await.is_open()
        {
            return Ok(session.clone());
        }

        let session = Arc::new(Mutex::new(self.session_factory().await?.open_session()?));
        debug!("opened new current session");
        *current = Some(session.clone());
        Ok(session)
    }

    pub async fn close_session(&self) -> PersistenceResult<()> {
        match self.current.lock().await.take() {
            Some(session) => session.lock().await.close().await,
            None => Ok(()),
        }
    }

    /// 关闭当前会话与会话工厂
    pub async fn shutdown(&self) -> PersistenceResult<()> {
        self.close_session().await?;
        if let Some(factory) = self.factory.get() {
            factory.close().await;
        }
        Ok(())
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 手动会话上下文
///
/// 按标识查询与写操作在事务中执行（失败时回滚），错误以
/// `PersistenceError::Operation` 包装；每个操作结束后都会关闭当前会话。
#[derive(Clone)]
pub struct ManualSessionContext {
    manager: Arc<SessionManager>,
}

impl ManualSessionContext {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    async fn open_inner(&self, operation: Operation) -> PersistenceResult<SessionLease> {
        let session = self.manager.current_session().await?;
        let mut lease = SessionLease::shared(session.lock_owned().await, operation).closing();
        if operation == Operation::FindById || operation.is_write() {
            if let Err(err) = lease.session().begin_transaction().await {
                if let Err(close_err) = lease.session().close().await {
                    warn!(error = %close_err, "could not close session");
                }
                return Err(err);
            }
            lease = lease.transactional().wrapping_errors();
        }
        Ok(lease)
    }
}

#[async_trait]
impl SessionContext for ManualSessionContext {
    async fn open(&self, operation: Operation) -> PersistenceResult<SessionLease> {
        let lease = self.open_inner(operation).await;
        if operation == Operation::FindById || operation.is_write() {
            lease.map_err(|err| wrap(operation, err))
        } else {
            lease
        }
    }
}
