use super::{Operation, SessionContext, SessionLease};
use crate::config::PersistenceConfig;
use crate::factory::SessionFactory;
use crate::session::Session;
use async_trait::async_trait;
use persistence_core::error::{PersistenceError, PersistenceResult};
use std::sync::Arc;
use tokio::sync::Mutex;

/// EntityManager 工厂
#[derive(Debug, Clone)]
pub struct EntityManagerFactory {
    factory: SessionFactory,
}

impl EntityManagerFactory {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    pub async fn from_config(config: &PersistenceConfig) -> PersistenceResult<Self> {
        Ok(Self::new(SessionFactory::build(config).await?))
    }

    pub fn create_entity_manager(&self) -> PersistenceResult<EntityManager> {
        Ok(EntityManager {
            session: Arc::new(Mutex::new(self.factory.open_session()?)),
        })
    }

    pub fn session_factory(&self) -> &SessionFactory {
        &self.factory
    }

    pub fn is_open(&self) -> bool {
        !self.factory.is_closed()
    }

    pub async fn close(&self) {
        self.factory.close().await;
    }
}

/// 持有一个委托会话；克隆共享同一会话
#[derive(Debug, Clone)]
pub struct EntityManager {
    session: Arc<Mutex<Session>>,
}

impl EntityManager {
    /// 底层会话
    pub fn get_delegate(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    pub fn get_transaction(&self) -> EntityTransaction {
        EntityTransaction {
            session: self.session.clone(),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.session.lock().await.is_open()
    }

    pub async fn close(&self) -> PersistenceResult<()> {
        self.session.lock().await.close().await
    }
}

/// 资源本地事务
#[derive(Debug, Clone)]
pub struct EntityTransaction {
    session: Arc<Mutex<Session>>,
}

impl EntityTransaction {
    pub async fn begin(&self) -> PersistenceResult<()> {
        self.session.lock().await.begin_transaction().await
    }

    pub async fn commit(&self) -> PersistenceResult<()> {
        self.session.lock().await.commit().await
    }

    pub async fn rollback(&self) -> PersistenceResult<()> {
        self.session.lock().await.rollback().await
    }

    pub async fn is_active(&self) -> bool {
        self.session.lock().await.is_transaction_active()
    }
}

/// 绑定到 EntityManager 的会话上下文
///
/// 总是使用委托会话；写操作只在没有活动事务时开启并提交自己的事务，
/// 否则加入调用方通过 `EntityTransaction` 开启的事务。
#[derive(Debug, Clone)]
pub struct EntityManagerContext {
    entity_manager: EntityManager,
}

impl EntityManagerContext {
    pub fn new(entity_manager: EntityManager) -> Self {
        Self { entity_manager }
    }

    pub fn entity_manager(&self) -> &EntityManager {
        &self.entity_manager
    }
}

#[async_trait]
impl SessionContext for EntityManagerContext {
    async fn open(&self, operation: Operation) -> PersistenceResult<SessionLease> {
        let guard = self.entity_manager.get_delegate().lock_owned().await;
        if !guard.is_open() {
            return Err(PersistenceError::SessionClosed);
        }
        let mut lease = SessionLease::shared(guard, operation);
        if operation.is_write() && !lease.session().is_transaction_active() {
            lease.session().begin_transaction().await?;
            lease = lease.transactional();
        }
        Ok(lease)
    }
}
