use super::{Operation, Propagation, SessionContext, SessionLease};
use crate::factory::SessionFactory;
use async_trait::async_trait;
use persistence_core::error::PersistenceResult;
use std::collections::HashMap;

/// 容器托管的会话上下文
///
/// 默认传播方式：`save`/`update` 为 `RequiresNew`，`delete`/`delete_by_id`
/// 为 `Required`，读操作为 `Supports`。环境事务由
/// `SessionFactory::in_transaction` 提供。
#[derive(Debug, Clone)]
pub struct ManagedSessionContext {
    factory: SessionFactory,
    overrides: HashMap<Operation, Propagation>,
}

impl ManagedSessionContext {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            overrides: HashMap::new(),
        }
    }

    /// 覆盖某个操作的传播方式
    pub fn with_propagation(mut self, operation: Operation, propagation: Propagation) -> Self {
        self.overrides.insert(operation, propagation);
        self
    }

    pub fn propagation(&self, operation: Operation) -> Propagation {
        if let Some(p) = self.overrides.get(&operation) {
            return *p;
        }
        match operation {
            Operation::Save | Operation::Update => Propagation::RequiresNew,
            Operation::Delete | Operation::DeleteById => Propagation::Required,
            Operation::FindById | Operation::Find | Operation::Count => Propagation::Supports,
        }
    }

    pub fn session_factory(&self) -> &SessionFactory {
        &self.factory
    }

    async fn new_transaction(&self, operation: Operation) -> PersistenceResult<SessionLease> {
        let mut session = self.factory.open_session()?;
        session.begin_transaction().await?;
        Ok(SessionLease::owned(session, operation).transactional().closing())
    }
}

#[async_trait]
impl SessionContext for ManagedSessionContext {
    async fn open(&self, operation: Operation) -> PersistenceResult<SessionLease> {
        let ambient = self.factory.current_session();
        match (self.propagation(operation), ambient) {
            (Propagation::RequiresNew, _) | (Propagation::Required, None) => {
                self.new_transaction(operation).await
            }
            (Propagation::Required | Propagation::Supports, Some(session)) => {
                Ok(SessionLease::shared(session.lock_owned().await, operation))
            }
            (Propagation::Supports, None) => {
                let session = self.factory.open_session()?;
                Ok(SessionLease::owned(session, operation).closing())
            }
        }
    }
}
