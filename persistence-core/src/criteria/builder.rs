use super::criterion::{Criterion, Order};
use crate::error::PersistenceResult;
use crate::persistable::Persistable;
use crate::sql::{Dialect, EntityStatements, SqlBuilder, SqlStatement};
use std::fmt;
use std::marker::PhantomData;

/// 结果转换方式；仅影响行数投影的计数口径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTransformer {
    RootEntity,
    #[default]
    DistinctRootEntity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    RowCount,
}

/// 面向单个实体的条件查询
///
/// 条件之间以 AND 连接；`first_result`/`max_results` 仅在设置时生效。
pub struct Criteria<T> {
    criterions: Vec<Criterion>,
    orders: Vec<Order>,
    first_result: Option<u64>,
    max_results: Option<u64>,
    cacheable: bool,
    projection: Option<Projection>,
    result_transformer: ResultTransformer,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Criteria<T> {
    fn clone(&self) -> Self {
        Self {
            criterions: self.criterions.clone(),
            orders: self.orders.clone(),
            first_result: self.first_result,
            max_results: self.max_results,
            cacheable: self.cacheable,
            projection: self.projection,
            result_transformer: self.result_transformer,
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Criteria<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Criteria")
            .field("entity", &std::any::type_name::<T>())
            .field("criterions", &self.criterions)
            .field("orders", &self.orders)
            .field("first_result", &self.first_result)
            .field("max_results", &self.max_results)
            .field("cacheable", &self.cacheable)
            .field("projection", &self.projection)
            .finish()
    }
}

impl<T> Default for Criteria<T> {
    fn default() -> Self {
        Self {
            criterions: Vec::new(),
            orders: Vec::new(),
            first_result: None,
            max_results: None,
            cacheable: false,
            projection: None,
            result_transformer: ResultTransformer::default(),
            _entity: PhantomData,
        }
    }
}

impl<T: Persistable> Criteria<T> {
    pub fn for_entity() -> Self {
        Self::default()
    }

    pub fn add(mut self, criterion: Criterion) -> Self {
        self.criterions.push(criterion);
        self
    }

    pub fn add_all(mut self, criterions: impl IntoIterator<Item = Criterion>) -> Self {
        self.criterions.extend(criterions);
        self
    }

    pub fn add_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn set_first_result(mut self, first_result: Option<u64>) -> Self {
        self.first_result = first_result;
        self
    }

    pub fn set_max_results(mut self, max_results: Option<u64>) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn set_cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    pub fn set_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn set_result_transformer(mut self, transformer: ResultTransformer) -> Self {
        self.result_transformer = transformer;
        self
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    /// 渲染查询语句；设置了行数投影时渲染为计数语句
    pub fn to_statement(&self, dialect: Dialect) -> PersistenceResult<SqlStatement> {
        match self.projection {
            Some(Projection::RowCount) => self.count_statement(dialect),
            None => self.select_statement(dialect),
        }
    }

    fn select_statement(&self, dialect: Dialect) -> PersistenceResult<SqlStatement> {
        EntityStatements::<T>::new(dialect)?;
        let mut b = SqlBuilder::new(dialect);
        b.push("SELECT ")
            .push(&EntityStatements::<T>::select_columns())
            .push(" FROM ")
            .push(T::TABLE);
        self.render_where(&mut b)?;
        if !self.orders.is_empty() {
            b.push(" ORDER BY ");
            for (i, order) in self.orders.iter().enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                order.render::<T>(&mut b)?;
            }
        }
        b.push(&dialect.limit_offset(self.first_result, self.max_results));
        Ok(b.build())
    }

    fn count_statement(&self, dialect: Dialect) -> PersistenceResult<SqlStatement> {
        EntityStatements::<T>::new(dialect)?;
        let mut b = SqlBuilder::new(dialect);
        match self.result_transformer {
            ResultTransformer::DistinctRootEntity => {
                b.push("SELECT COUNT(DISTINCT ").push(T::ID_COLUMN).push(")");
            }
            ResultTransformer::RootEntity => {
                b.push("SELECT COUNT(*)");
            }
        }
        b.push(" FROM ").push(T::TABLE);
        self.render_where(&mut b)?;
        Ok(b.build())
    }

    fn render_where(&self, b: &mut SqlBuilder) -> PersistenceResult<()> {
        for (i, criterion) in self.criterions.iter().enumerate() {
            b.push(if i == 0 { " WHERE " } else { " AND " });
            criterion.render::<T>(b)?;
        }
        Ok(())
    }
}
