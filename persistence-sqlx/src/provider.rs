//! 基于会话的持久化提供者
//!
//! 每个操作通过 `SessionContext` 取得会话租约，在会话上执行后结束租约；
//! 会话生命周期与事务传播由上下文决定。
//!
use crate::context::entity_manager::{EntityManager, EntityManagerContext};
use crate::context::managed::ManagedSessionContext;
use crate::context::manual::{ManualSessionContext, SessionManager};
use crate::context::{Operation, SessionContext};
use crate::factory::SessionFactory;
use crate::session::{Query, Session};
use async_trait::async_trait;
use persistence_core::criteria::{Criteria, Criterion, Projection, ResultTransformer};
use persistence_core::error::{PersistenceError, PersistenceResult};
use persistence_core::persistable::Persistable;
use persistence_core::provider::{CriteriaPersistenceProvider, NamedParams, PersistenceProvider};
use persistence_core::query::QueryParameters;
use persistence_core::value::Value;
use std::sync::Arc;

pub type ManagedPersistenceProvider = SqlxPersistenceProvider<ManagedSessionContext>;
pub type ManualPersistenceProvider = SqlxPersistenceProvider<ManualSessionContext>;
pub type EntityManagerPersistenceProvider = SqlxPersistenceProvider<EntityManagerContext>;

#[derive(Debug, Clone)]
pub struct SqlxPersistenceProvider<C> {
    context: C,
}

impl<C> SqlxPersistenceProvider<C> {
    pub fn new(context: C) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &C {
        &self.context
    }
}

impl ManagedPersistenceProvider {
    pub fn managed(factory: SessionFactory) -> Self {
        Self::new(ManagedSessionContext::new(factory))
    }
}

impl ManualPersistenceProvider {
    pub fn manual(manager: Arc<SessionManager>) -> Self {
        Self::new(ManualSessionContext::new(manager))
    }
}

impl EntityManagerPersistenceProvider {
    pub fn entity_manager(entity_manager: EntityManager) -> Self {
        Self::new(EntityManagerContext::new(entity_manager))
    }
}

impl<C: SessionContext> SqlxPersistenceProvider<C> {
    async fn find_with_query<T: Persistable>(
        &self,
        query: QueryOrigin<'_>,
        params: QueryParameters,
        cacheable: bool,
    ) -> PersistenceResult<Vec<T>> {
        let mut lease = self.context.open(Operation::Find).await?;
        let result = list_query(lease.session(), query, params, cacheable).await;
        lease.complete(result).await
    }

    async fn count_with_query<N>(
        &self,
        query: QueryOrigin<'_>,
        params: &NamedParams,
    ) -> PersistenceResult<N>
    where
        N: TryFrom<i64> + Send + 'static,
    {
        let mut lease = self.context.open(Operation::Count).await?;
        let result = count_query(lease.session(), query, params.into()).await;
        lease.complete(result).await
    }

    async fn save_as<T: Persistable>(&self, operation: Operation, entity: T) -> PersistenceResult<T> {
        let mut lease = self.context.open(operation).await?;
        let result = save_and_reload(lease.session(), entity).await;
        lease.complete(result).await
    }

    async fn delete_as<T: Persistable>(
        &self,
        operation: Operation,
        entity: Option<&T>,
        id: Option<&T::Id>,
    ) -> PersistenceResult<()> {
        let mut lease = self.context.open(operation).await?;
        let result = match id.or_else(|| entity.and_then(Persistable::id)) {
            Some(id) => lease.session().delete::<T>(id).await,
            None => Err(PersistenceError::MissingIdentifier {
                entity: T::ENTITY,
                action: "delete",
            }),
        };
        lease.complete(result).await
    }
}

#[derive(Clone, Copy)]
enum QueryOrigin<'a> {
    Named(&'a str),
    Sql(&'a str),
}

fn resolve(session: &Session, origin: QueryOrigin<'_>) -> PersistenceResult<Query> {
    match origin {
        QueryOrigin::Named(name) => session.named_query(name),
        QueryOrigin::Sql(sql) => Ok(session.create_query(sql)),
    }
}

async fn list_query<T: Persistable>(
    session: &mut Session,
    origin: QueryOrigin<'_>,
    params: QueryParameters,
    cacheable: bool,
) -> PersistenceResult<Vec<T>> {
    let query = resolve(session, origin)?
        .with_parameters(params)
        .cacheable(cacheable);
    session.list(&query).await
}

async fn count_query<N>(
    session: &mut Session,
    origin: QueryOrigin<'_>,
    params: QueryParameters,
) -> PersistenceResult<N>
where
    N: TryFrom<i64>,
{
    let query = resolve(session, origin)?.with_parameters(params);
    session.unique_scalar(&query).await
}

async fn save_and_reload<T: Persistable>(session: &mut Session, mut entity: T) -> PersistenceResult<T> {
    session.save_or_update(&mut entity).await?;
    let id = entity.id().cloned().ok_or(PersistenceError::MissingIdentifier {
        entity: T::ENTITY,
        action: "save",
    })?;
    session
        .get::<T>(&id)
        .await?
        .ok_or_else(|| PersistenceError::NotFound {
            reason: format!("{} with id {id:?} vanished after save", T::ENTITY),
        })
}

fn criteria_of<T: Persistable>(criterions: Vec<Criterion>) -> Criteria<T> {
    Criteria::for_entity().add_all(criterions)
}

#[async_trait]
impl<C: SessionContext> PersistenceProvider for SqlxPersistenceProvider<C> {
    async fn find_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<Option<T>> {
        let mut lease = self.context.open(Operation::FindById).await?;
        let result = lease.session().get::<T>(id).await;
        lease.complete(result).await
    }

    async fn find_all_range<T: Persistable>(
        &self,
        first_result: Option<u64>,
        max_results: Option<u64>,
    ) -> PersistenceResult<Vec<T>> {
        let criteria = criteria_of::<T>(Vec::new())
            .set_first_result(first_result)
            .set_max_results(max_results);
        let mut lease = self.context.open(Operation::Find).await?;
        let result = lease.session().list_criteria(&criteria).await;
        lease.complete(result).await
    }

    async fn find_by_named_query_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query_name: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>> {
        self.find_with_query(QueryOrigin::Named(query_name), params.into(), cacheable)
            .await
    }

    async fn find_by_named_query_and_named_params_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>> {
        self.find_with_query(QueryOrigin::Named(query_name), params.into(), cacheable)
            .await
    }

    async fn find_by_query_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>> {
        self.find_with_query(QueryOrigin::Sql(query), params.into(), cacheable)
            .await
    }

    async fn find_by_query_and_named_params_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>> {
        self.find_with_query(QueryOrigin::Sql(query), params.into(), cacheable)
            .await
    }

    async fn count_all<T: Persistable>(&self) -> PersistenceResult<i64> {
        self.count_by_criteria::<T, i64>(Vec::new()).await
    }

    async fn count_by_named_query_and_named_params<N>(
        &self,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<N>
    where
        N: TryFrom<i64> + Send + 'static,
    {
        self.count_with_query(QueryOrigin::Named(query_name), params)
            .await
    }

    async fn count_by_query_and_named_params<N>(
        &self,
        query: &str,
        params: &NamedParams,
    ) -> PersistenceResult<N>
    where
        N: TryFrom<i64> + Send + 'static,
    {
        self.count_with_query(QueryOrigin::Sql(query), params).await
    }

    async fn save<T: Persistable>(&self, entity: T) -> PersistenceResult<T> {
        self.save_as(Operation::Save, entity).await
    }

    async fn update<T: Persistable>(&self, entity: T) -> PersistenceResult<T> {
        self.save_as(Operation::Update, entity).await
    }

    async fn delete<T: Persistable>(&self, entity: &T) -> PersistenceResult<()> {
        self.delete_as::<T>(Operation::Delete, Some(entity), None)
            .await
    }

    async fn delete_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<()> {
        self.delete_as::<T>(Operation::DeleteById, None, Some(id))
            .await
    }

    async fn delete_by_entity_or_id<T: Persistable>(
        &self,
        entity: Option<&T>,
        id: Option<&T::Id>,
    ) -> PersistenceResult<()> {
        self.delete_as::<T>(Operation::Delete, entity, id).await
    }
}

#[async_trait]
impl<C: SessionContext> CriteriaPersistenceProvider for SqlxPersistenceProvider<C> {
    async fn find_by_criteria_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        first_result: Option<u64>,
        max_results: Option<u64>,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Vec<T>> {
        let criteria = criteria_of::<T>(criterions)
            .set_first_result(first_result)
            .set_max_results(max_results)
            .set_cacheable(cacheable);
        let mut lease = self.context.open(Operation::Find).await?;
        let result = lease.session().list_criteria(&criteria).await;
        lease.complete(result).await
    }

    async fn find_unique_result_by_criteria_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Option<T>> {
        let criteria = criteria_of::<T>(criterions).set_cacheable(cacheable);
        let mut lease = self.context.open(Operation::Find).await?;
        let result = lease.session().unique_criteria(&criteria).await;
        lease.complete(result).await
    }

    async fn count_by_criteria_with_transformer<T, N>(
        &self,
        transformer: ResultTransformer,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<N>
    where
        T: Persistable,
        N: TryFrom<i64> + Send + 'static,
    {
        let criteria = criteria_of::<T>(criterions)
            .set_projection(Projection::RowCount)
            .set_result_transformer(transformer);
        let mut lease = self.context.open(Operation::Count).await?;
        let result = lease.session().count_criteria::<T, N>(&criteria).await;
        lease.complete(result).await
    }
}
