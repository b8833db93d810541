//! 会话生命周期变体
//!
//! 提供者的每个操作都先通过 `SessionContext::open` 取得一个 `SessionLease`，
//! 在其会话上执行，再以 `SessionLease::complete` 结束这次工作单元。
//! 变体之间的差异（是否开启/加入事务、结束后是否关闭会话、如何包装错误）
//! 全部体现在租约上。
//!
pub mod entity_manager;
pub mod managed;
pub mod manual;

use crate::session::Session;
use async_trait::async_trait;
use persistence_core::error::{PersistenceError, PersistenceResult};
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

/// 提供者操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindById,
    Find,
    Count,
    Save,
    Update,
    Delete,
    DeleteById,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::Save | Operation::Update | Operation::Delete | Operation::DeleteById
        )
    }

    /// 用于错误信息的动作名
    pub fn action(&self) -> &'static str {
        match self {
            Operation::FindById => "find by id",
            Operation::Find => "find",
            Operation::Count => "count",
            Operation::Save => "save",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::DeleteById => "delete by id",
        }
    }
}

/// 事务传播方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// 加入环境事务，没有时开启自己的事务
    Required,
    /// 总是使用独立的会话与事务
    RequiresNew,
    /// 有环境事务时加入，否则以非事务方式执行
    Supports,
}

#[async_trait]
pub trait SessionContext: Send + Sync {
    async fn open(&self, operation: Operation) -> PersistenceResult<SessionLease>;
}

enum LeasedSession {
    Owned(Session),
    Shared(OwnedMutexGuard<Session>),
}

/// 一次操作期间对会话的占用
pub struct SessionLease {
    session: LeasedSession,
    operation: Operation,
    owns_transaction: bool,
    close_after: bool,
    wrap_errors: bool,
}

impl SessionLease {
    /// 独占的新会话
    pub fn owned(session: Session, operation: Operation) -> Self {
        Self::with(LeasedSession::Owned(session), operation)
    }

    /// 与其他操作共享的会话（环境事务或 EntityManager 的委托会话）
    pub fn shared(guard: OwnedMutexGuard<Session>, operation: Operation) -> Self {
        Self::with(LeasedSession::Shared(guard), operation)
    }

    fn with(session: LeasedSession, operation: Operation) -> Self {
        Self {
            session,
            operation,
            owns_transaction: false,
            close_after: false,
            wrap_errors: false,
        }
    }

    /// 事务由本次租约开启，结束时提交或回滚
    pub fn transactional(mut self) -> Self {
        self.owns_transaction = true;
        self
    }

    /// 结束时关闭会话
    pub fn closing(mut self) -> Self {
        self.close_after = true;
        self
    }

    /// 以 `PersistenceError::Operation` 包装失败
    pub fn wrapping_errors(mut self) -> Self {
        self.wrap_errors = true;
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn session(&mut self) -> &mut Session {
        match &mut self.session {
            LeasedSession::Owned(session) => session,
            LeasedSession::Shared(guard) => guard,
        }
    }

    /// 结束工作单元：按需提交/回滚并关闭会话
    ///
    /// 操作本身的错误优先于提交、关闭阶段的错误返回。
    pub async fn complete<R>(mut self, result: PersistenceResult<R>) -> PersistenceResult<R> {
        let settled = if self.owns_transaction {
            match &result {
                Ok(_) => self.session().commit().await,
                Err(err) => {
                    warn!(operation = self.operation.action(), error = %err, "operation failed");
                    self.session().rollback().await
                }
            }
        } else {
            Ok(())
        };
        let closed = if self.close_after {
            self.session().close().await
        } else {
            Ok(())
        };

        let outcome = result.and_then(|value| settled.map(|_| value)).and_then(|value| closed.map(|_| value));
        if self.wrap_errors {
            outcome.map_err(|err| wrap(self.operation, err))
        } else {
            outcome
        }
    }
}

pub(crate) fn wrap(operation: Operation, err: PersistenceError) -> PersistenceError {
    match err {
        PersistenceError::Operation { .. } => err,
        other => PersistenceError::Operation {
            action: operation.action(),
            reason: other.to_string(),
        },
    }
}
