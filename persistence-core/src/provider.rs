//! 持久化提供者协议
//!
//! `PersistenceProvider` 定义与实体类型、标识类型无关的 CRUD 契约；
//! `CriteriaPersistenceProvider` 在其上追加条件查询。各重载之间的委托关系
//! 以默认方法给出，实现方只需提供最完整的形式。
//!
use crate::criteria::{Criterion, ResultTransformer};
use crate::error::PersistenceResult;
use crate::persistable::Persistable;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 命名参数表
pub type NamedParams = BTreeMap<String, Value>;

#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    async fn find_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<Option<T>>;

    async fn find_all<T: Persistable>(&self) -> PersistenceResult<Vec<T>> {
        self.find_all_range::<T>(None, None).await
    }

    async fn find_all_range<T: Persistable>(
        &self,
        first_result: Option<u64>,
        max_results: Option<u64>,
    ) -> PersistenceResult<Vec<T>>;

    async fn find_by_named_query<T: Persistable>(
        &self,
        query_name: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>> {
        self.find_by_named_query_cacheable::<T>(false, query_name, params)
            .await
    }

    async fn find_by_named_query_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query_name: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>>;

    async fn find_by_named_query_and_named_params<T: Persistable>(
        &self,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>> {
        self.find_by_named_query_and_named_params_cacheable::<T>(false, query_name, params)
            .await
    }

    async fn find_by_named_query_and_named_params_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>>;

    async fn find_by_query<T: Persistable>(
        &self,
        query: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>> {
        self.find_by_query_cacheable::<T>(false, query, params).await
    }

    async fn find_by_query_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>>;

    async fn find_by_query_and_named_params<T: Persistable>(
        &self,
        query: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>> {
        self.find_by_query_and_named_params_cacheable::<T>(false, query, params)
            .await
    }

    async fn find_by_query_and_named_params_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>>;

    async fn count_all<T: Persistable>(&self) -> PersistenceResult<i64>;

    /// 执行命名查询并将唯一的标量结果转换为 `N`
    async fn count_by_named_query_and_named_params<N>(
        &self,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<N>
    where
        N: TryFrom<i64> + Send + 'static;

    /// 执行查询并将唯一的标量结果转换为 `N`
    async fn count_by_query_and_named_params<N>(
        &self,
        query: &str,
        params: &NamedParams,
    ) -> PersistenceResult<N>
    where
        N: TryFrom<i64> + Send + 'static;

    /// 保存实体：无标识时插入，有标识时保存或更新；返回按标识重新读取的实体
    async fn save<T: Persistable>(&self, entity: T) -> PersistenceResult<T>;

    async fn update<T: Persistable>(&self, entity: T) -> PersistenceResult<T> {
        self.save(entity).await
    }

    async fn delete<T: Persistable>(&self, entity: &T) -> PersistenceResult<()> {
        self.delete_by_entity_or_id::<T>(Some(entity), None).await
    }

    async fn delete_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<()> {
        self.delete_by_entity_or_id::<T>(None, Some(id)).await
    }

    /// 按实体或标识删除；显式标识优先，两者都缺失标识时报错
    async fn delete_by_entity_or_id<T: Persistable>(
        &self,
        entity: Option<&T>,
        id: Option<&T::Id>,
    ) -> PersistenceResult<()>;
}

#[async_trait]
pub trait CriteriaPersistenceProvider: PersistenceProvider {
    async fn find_by_criteria<T: Persistable>(
        &self,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Vec<T>> {
        self.find_by_criteria_range::<T>(None, None, criterions)
            .await
    }

    async fn find_by_criteria_range<T: Persistable>(
        &self,
        first_result: Option<u64>,
        max_results: Option<u64>,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Vec<T>> {
        self.find_by_criteria_cacheable::<T>(false, first_result, max_results, criterions)
            .await
    }

    async fn find_by_criteria_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        first_result: Option<u64>,
        max_results: Option<u64>,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Vec<T>>;

    async fn find_unique_result_by_criteria<T: Persistable>(
        &self,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Option<T>> {
        self.find_unique_result_by_criteria_cacheable::<T>(false, criterions)
            .await
    }

    /// 至多一行；多于一行时返回 `NonUniqueResult`
    async fn find_unique_result_by_criteria_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Option<T>>;

    async fn count_by_criteria<T, N>(&self, criterions: Vec<Criterion>) -> PersistenceResult<N>
    where
        T: Persistable,
        N: TryFrom<i64> + Send + 'static,
    {
        self.count_by_criteria_with_transformer::<T, N>(
            ResultTransformer::DistinctRootEntity,
            criterions,
        )
        .await
    }

    async fn count_by_criteria_with_transformer<T, N>(
        &self,
        transformer: ResultTransformer,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<N>
    where
        T: Persistable,
        N: TryFrom<i64> + Send + 'static;
}

#[async_trait]
impl<P> PersistenceProvider for Arc<P>
where
    P: PersistenceProvider + ?Sized,
{
    async fn find_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<Option<T>> {
        (**self).find_by_id::<T>(id).await
    }

    async fn find_all_range<T: Persistable>(
        &self,
        first_result: Option<u64>,
        max_results: Option<u64>,
    ) -> PersistenceResult<Vec<T>> {
        (**self).find_all_range::<T>(first_result, max_results).await
    }

    async fn find_by_named_query_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query_name: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>> {
        (**self)
            .find_by_named_query_cacheable::<T>(cacheable, query_name, params)
            .await
    }

    async fn find_by_named_query_and_named_params_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>> {
        (**self)
            .find_by_named_query_and_named_params_cacheable::<T>(cacheable, query_name, params)
            .await
    }

    async fn find_by_query_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query: &str,
        params: &[Value],
    ) -> PersistenceResult<Vec<T>> {
        (**self)
            .find_by_query_cacheable::<T>(cacheable, query, params)
            .await
    }

    async fn find_by_query_and_named_params_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        query: &str,
        params: &NamedParams,
    ) -> PersistenceResult<Vec<T>> {
        (**self)
            .find_by_query_and_named_params_cacheable::<T>(cacheable, query, params)
            .await
    }

    async fn count_all<T: Persistable>(&self) -> PersistenceResult<i64> {
        (**self).count_all::<T>().await
    }

    async fn count_by_named_query_and_named_params<N>(
        &self,
        query_name: &str,
        params: &NamedParams,
    ) -> PersistenceResult<N>
    where
        N: TryFrom<i64> + Send + 'static,
    {
        (**self)
            .count_by_named_query_and_named_params::<N>(query_name, params)
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
        (**self)
            .count_by_query_and_named_params::<N>(query, params)
            .await
    }

    async fn save<T: Persistable>(&self, entity: T) -> PersistenceResult<T> {
        (**self).save(entity).await
    }

    async fn update<T: Persistable>(&self, entity: T) -> PersistenceResult<T> {
        (**self).update(entity).await
    }

    async fn delete<T: Persistable>(&self, entity: &T) -> PersistenceResult<()> {
        (**self).delete(entity).await
    }

    async fn delete_by_id<T: Persistable>(&self, id: &T::Id) -> PersistenceResult<()> {
        (**self).delete_by_id::<T>(id).await
    }

    async fn delete_by_entity_or_id<T: Persistable>(
        &self,
        entity: Option<&T>,
        id: Option<&T::Id>,
    ) -> PersistenceResult<()> {
        (**self).delete_by_entity_or_id::<T>(entity, id).await
    }
}

#[async_trait]
impl<P> CriteriaPersistenceProvider for Arc<P>
where
    P: CriteriaPersistenceProvider + ?Sized,
{
    async fn find_by_criteria_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        first_result: Option<u64>,
        max_results: Option<u64>,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Vec<T>> {
        (**self)
            .find_by_criteria_cacheable::<T>(cacheable, first_result, max_results, criterions)
            .await
    }

    async fn find_unique_result_by_criteria_cacheable<T: Persistable>(
        &self,
        cacheable: bool,
        criterions: Vec<Criterion>,
    ) -> PersistenceResult<Option<T>> {
        (**self)
            .find_unique_result_by_criteria_cacheable::<T>(cacheable, criterions)
            .await
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
        (**self)
            .count_by_criteria_with_transformer::<T, N>(transformer, criterions)
            .await
    }
}
