//! 会话与查询
//!
//! `Session` 惰性获取连接；开启事务后所有操作都在同一事务连接上执行。
//! 实体读写按 `Persistable` 映射生成 SQL，查询语句经参数展开后按方言执行。
//!
use crate::cache::{ALL_REGIONS, CacheKey};
use crate::factory::SessionFactory;
use persistence_core::criteria::{Criteria, Projection};
use persistence_core::error::{PersistenceError, PersistenceResult};
use persistence_core::persistable::{Identifier, Persistable};
use persistence_core::query::{QueryParameters, expand};
use persistence_core::sql::{Dialect, EntityStatements, SqlStatement};
use persistence_core::value::{Value, ValueKind};
use sqlx::AnyConnection;
use sqlx::any::{AnyArguments, AnyQueryResult, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{Any, Arguments, Row, Transaction};
use std::any::type_name;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const SQL_TARGET: &str = "persistence::sql";

enum SessionConnection {
    Plain(PoolConnection<Any>),
    Transactional(Transaction<'static, Any>),
}

impl SessionConnection {
    fn executor(&mut self) -> &mut AnyConnection {
        match self {
            SessionConnection::Plain(conn) => conn,
            SessionConnection::Transactional(tx) => tx,
        }
    }
}

/// 查询：SQL、参数与是否可缓存
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    sql: String,
    params: QueryParameters,
    cacheable: bool,
    synchronized: Vec<String>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: QueryParameters::none(),
            cacheable: false,
            synchronized: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, params: impl Into<QueryParameters>) -> Self {
        self.params = params.into();
        self
    }

    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// 声明查询读取的表
    ///
    /// 缓存结果只在这些表被写入时失效；未声明时任何写操作都会使其失效。
    pub fn synchronized_with(mut self, table: impl Into<String>) -> Self {
        self.synchronized.push(table.into());
        self
    }

    pub fn synchronized_tables(&self) -> &[String] {
        &self.synchronized
    }

    /// 设置位置参数（从 0 开始）
    pub fn set_parameter(&mut self, position: usize, value: impl Into<Value>) -> PersistenceResult<&mut Self> {
        self.params.set_positional(position, value.into())?;
        Ok(self)
    }

    pub fn set_named_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> PersistenceResult<&mut Self> {
        self.params.set_named(name, value.into())?;
        Ok(self)
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &QueryParameters {
        &self.params
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

pub struct Session {
    factory: SessionFactory,
    connection: Option<SessionConnection>,
    open: bool,
    // 事务内写过的缓存区域，提交或回滚时结束写入标记
    touched: BTreeSet<&'static str>,
}

impl Session {
    pub(crate) fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            connection: None,
            open: true,
            touched: BTreeSet::new(),
        }
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    pub fn dialect(&self) -> Dialect {
        self.factory.dialect()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_transaction_active(&self) -> bool {
        matches!(self.connection, Some(SessionConnection::Transactional(_)))
    }

    fn ensure_open(&self) -> PersistenceResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(PersistenceError::SessionClosed)
        }
    }

    async fn connection(&mut self) -> PersistenceResult<&mut AnyConnection> {
        self.ensure_open()?;
        if self.connection.is_none() {
            let conn = self.factory.pool().acquire().await?;
            self.connection = Some(SessionConnection::Plain(conn));
        }
        match self.connection.as_mut() {
            Some(conn) => Ok(conn.executor()),
            None => Err(PersistenceError::SessionClosed),
        }
    }

    // ---- transactions ----

    /// 开启事务；已有活动事务时不做任何事
    pub async fn begin_transaction(&mut self) -> PersistenceResult<()> {
        self.ensure_open()?;
        if self.is_transaction_active() {
            return Ok(());
        }
        // 释放普通连接，改用事务连接
        self.connection = None;
        let tx = self.factory.pool().begin().await?;
        self.connection = Some(SessionConnection::Transactional(tx));
        debug!(target: SQL_TARGET, "transaction begun");
        Ok(())
    }

    /// 提交事务；没有活动事务时不做任何事
    pub async fn commit(&mut self) -> PersistenceResult<()> {
        self.ensure_open()?;
        match self.connection.take() {
            Some(SessionConnection::Transactional(tx)) => {
                let result = tx.commit().await;
                self.release_touched();
                result?;
                debug!(target: SQL_TARGET, "transaction committed");
                Ok(())
            }
            other => {
                self.connection = other;
                Ok(())
            }
        }
    }

    /// 回滚事务；没有活动事务时不做任何事
    pub async fn rollback(&mut self) -> PersistenceResult<()> {
        self.ensure_open()?;
        match self.connection.take() {
            Some(SessionConnection::Transactional(tx)) => {
                warn!(target: SQL_TARGET, "rolling back transaction");
                let result = tx.rollback().await;
                self.release_touched();
                result.map_err(Into::into)
            }
            other => {
                self.connection = other;
                Ok(())
            }
        }
    }

    /// 关闭会话，未提交的事务会被回滚；重复关闭不报错
    pub async fn close(&mut self) -> PersistenceResult<()> {
        if !self.open {
            return Ok(());
        }
        let result = self.rollback().await;
        self.connection = None;
        self.open = false;
        result
    }

    // ---- entity operations ----

    pub async fn get<T: Persistable>(&mut self, id: &T::Id) -> PersistenceResult<Option<T>> {
        let stmt = EntityStatements::<T>::new(self.dialect())?.select_by_id(id);
        self.log(&stmt);
        let args = bind_values(stmt.values)?;
        let row = sqlx::query_as_with::<Any, T, _>(&stmt.sql, args)
            .fetch_optional(self.connection().await?)
            .await?;
        Ok(row)
    }

    /// 插入实体；数据库生成主键时总是插入新行并回填标识
    pub async fn save<T: Persistable>(&mut self, entity: &mut T) -> PersistenceResult<()> {
        let dialect = self.dialect();
        let stmt = EntityStatements::<T>::new(dialect)?.insert(entity)?;
        self.log(&stmt);
        let args = bind_values(stmt.values)?;

        if T::ID_GENERATED {
            let id = if dialect.supports_returning() {
                let row = sqlx::query_with::<Any, _>(&stmt.sql, args)
                    .fetch_one(self.connection().await?)
                    .await?;
                decode_generated_id::<T::Id>(&row)?
            } else {
                let result = sqlx::query_with::<Any, _>(&stmt.sql, args)
                    .execute(self.connection().await?)
                    .await?;
                let last = result.last_insert_id().ok_or_else(|| PersistenceError::Database {
                    reason: format!("no generated key returned for {}", T::ENTITY),
                })?;
                T::Id::from_value(Value::Int(last))?
            };
            entity.set_id(id);
        } else {
            sqlx::query_with::<Any, _>(&stmt.sql, args)
                .execute(self.connection().await?)
                .await?;
        }

        self.touch(T::TABLE);
        Ok(())
    }

    /// 按标识更新，返回受影响的行数
    pub async fn update<T: Persistable>(&mut self, entity: &T) -> PersistenceResult<u64> {
        let stmt = EntityStatements::<T>::new(self.dialect())?.update(entity)?;
        let result = self.execute(stmt).await?;
        self.touch(T::TABLE);
        Ok(result.rows_affected())
    }

    /// 无标识时插入；有标识时更新，未命中时按主键策略插入或报告过期状态
    pub async fn save_or_update<T: Persistable>(&mut self, entity: &mut T) -> PersistenceResult<()> {
        let Some(id) = entity.id().cloned() else {
            if T::ID_GENERATED {
                return self.save(entity).await;
            }
            return Err(PersistenceError::MissingIdentifier {
                entity: T::ENTITY,
                action: "save",
            });
        };

        if self.update(entity).await? > 0 {
            return Ok(());
        }
        if T::ID_GENERATED {
            return Err(PersistenceError::StaleState {
                entity: T::ENTITY,
                id: format!("{id:?}"),
            });
        }
        self.save(entity).await
    }

    /// 按标识删除；没有行被删除时报告过期状态
    pub async fn delete<T: Persistable>(&mut self, id: &T::Id) -> PersistenceResult<()> {
        let stmt = EntityStatements::<T>::new(self.dialect())?.delete_by_id(id);
        let result = self.execute(stmt).await?;
        self.touch(T::TABLE);
        if result.rows_affected() == 0 {
            return Err(PersistenceError::StaleState {
                entity: T::ENTITY,
                id: format!("{id:?}"),
            });
        }
        Ok(())
    }

    // ---- queries ----

    pub fn create_query(&self, sql: impl Into<String>) -> Query {
        Query::new(sql)
    }

    pub fn named_query(&self, name: &str) -> PersistenceResult<Query> {
        let sql = self.factory.named_queries().get(name)?;
        Ok(Query::new(sql))
    }

    pub async fn list<T: Persistable>(&mut self, query: &Query) -> PersistenceResult<Vec<T>> {
        let stmt = expand(&query.sql, &query.params, self.dialect())?;
        let regions: Vec<&str> = query.synchronized.iter().map(String::as_str).collect();
        self.fetch_rows(stmt, query.cacheable, &regions).await
    }

    /// 至多一行；多于一行时返回 `NonUniqueResult`
    pub async fn unique_result<T: Persistable>(&mut self, query: &Query) -> PersistenceResult<Option<T>> {
        let rows = self.list::<T>(query).await?;
        single(rows)
    }

    /// 唯一的整数标量结果（例如 COUNT），转换为 `N`
    pub async fn unique_scalar<N>(&mut self, query: &Query) -> PersistenceResult<N>
    where
        N: TryFrom<i64>,
    {
        let stmt = expand(&query.sql, &query.params, self.dialect())?;
        self.fetch_scalar(stmt).await
    }

    /// 执行更新语句，返回受影响的行数；会清空整个查询缓存
    pub async fn execute_update(&mut self, query: &Query) -> PersistenceResult<u64> {
        let stmt = expand(&query.sql, &query.params, self.dialect())?;
        let result = self.execute(stmt).await?;
        self.touch(ALL_REGIONS);
        Ok(result.rows_affected())
    }

    // ---- criteria ----

    pub async fn list_criteria<T: Persistable>(&mut self, criteria: &Criteria<T>) -> PersistenceResult<Vec<T>> {
        let stmt = criteria.to_statement(self.dialect())?;
        self.fetch_rows(stmt, criteria.is_cacheable(), &[T::TABLE]).await
    }

    pub async fn unique_criteria<T: Persistable>(
        &mut self,
        criteria: &Criteria<T>,
    ) -> PersistenceResult<Option<T>> {
        let rows = self.list_criteria(criteria).await?;
        single(rows)
    }

    /// 行数投影；未设置投影时按 `Projection::RowCount` 计数
    pub async fn count_criteria<T, N>(&mut self, criteria: &Criteria<T>) -> PersistenceResult<N>
    where
        T: Persistable,
        N: TryFrom<i64>,
    {
        let stmt = match criteria.projection() {
            Some(Projection::RowCount) => criteria.to_statement(self.dialect())?,
            None => criteria
                .clone()
                .set_projection(Projection::RowCount)
                .to_statement(self.dialect())?,
        };
        self.fetch_scalar(stmt).await
    }

    // ---- execution ----

    async fn fetch_rows<T: Persistable>(
        &mut self,
        stmt: SqlStatement,
        cacheable: bool,
        regions: &[&str],
    ) -> PersistenceResult<Vec<T>> {
        let key = match self.factory.query_cache() {
            Some(cache) if cacheable => {
                let key = CacheKey::new::<T>(regions, &stmt)?;
                if let Some(rows) = cache.get::<T>(&key) {
                    debug!(target: SQL_TARGET, sql = %stmt.sql, "query cache hit");
                    return Ok(rows);
                }
                Some((key, cache.timestamp()))
            }
            _ => None,
        };

        self.log(&stmt);
        let args = bind_values(stmt.values)?;
        let rows = sqlx::query_as_with::<Any, T, _>(&stmt.sql, args)
            .fetch_all(self.connection().await?)
            .await?;

        if let (Some((key, started_at)), Some(cache)) = (key, self.factory.query_cache())
            && !cache.put(key, &rows, started_at)
        {
            debug!(target: SQL_TARGET, "query result not cached: region written concurrently");
        }
        Ok(rows)
    }

    async fn fetch_scalar<N>(&mut self, stmt: SqlStatement) -> PersistenceResult<N>
    where
        N: TryFrom<i64>,
    {
        self.log(&stmt);
        let args = bind_values(stmt.values)?;
        let value: i64 = sqlx::query_scalar_with::<Any, i64, _>(&stmt.sql, args)
            .fetch_one(self.connection().await?)
            .await?;
        N::try_from(value).map_err(|_| PersistenceError::TypeMismatch {
            expected: type_name::<N>(),
            found: "i64",
        })
    }

    async fn execute(&mut self, stmt: SqlStatement) -> PersistenceResult<AnyQueryResult> {
        self.log(&stmt);
        let args = bind_values(stmt.values)?;
        let result = sqlx::query_with::<Any, _>(&stmt.sql, args)
            .execute(self.connection().await?)
            .await?;
        Ok(result)
    }

    // 事务内的写入在结束前一直阻止相关区域进入缓存
    fn touch(&mut self, region: &'static str) {
        let Some(cache) = self.factory.query_cache() else {
            return;
        };
        if !self.is_transaction_active() {
            cache.invalidate(region);
        } else if self.touched.insert(region) {
            cache.begin_write(region);
        }
    }

    fn release_touched(&mut self) {
        let touched = std::mem::take(&mut self.touched);
        if let Some(cache) = self.factory.query_cache() {
            for region in touched {
                cache.end_write(region);
            }
        }
    }

    fn log(&self, stmt: &SqlStatement) {
        if self.factory.show_sql() {
            info!(target: SQL_TARGET, sql = %stmt.sql, binds = ?stmt.values);
        } else {
            debug!(target: SQL_TARGET, sql = %stmt.sql, binds = ?stmt.values);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // 未提交的事务随连接归还而回滚
        self.release_touched();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("open", &self.open)
            .field("transaction_active", &self.is_transaction_active())
            .finish()
    }
}

fn single<T>(mut rows: Vec<T>) -> PersistenceResult<Option<T>> {
    match rows.len() {
        0 | 1 => Ok(rows.pop()),
        count => Err(PersistenceError::NonUniqueResult { count }),
    }
}

fn bind_values<'q>(values: Vec<Value>) -> PersistenceResult<AnyArguments<'q>> {
    let mut args = AnyArguments::default();
    for value in values {
        let bound = match value {
            Value::Null(ValueKind::Bool) => args.add(None::<bool>),
            Value::Null(ValueKind::Int) => args.add(None::<i64>),
            Value::Null(ValueKind::Float) => args.add(None::<f64>),
            Value::Null(ValueKind::Text) => args.add(None::<String>),
            Value::Null(ValueKind::Bytes) => args.add(None::<Vec<u8>>),
            Value::Bool(v) => args.add(v),
            Value::Int(v) => args.add(v),
            Value::Float(v) => args.add(v),
            Value::Text(v) => args.add(v),
            Value::Bytes(v) => args.add(v),
        };
        bound.map_err(|err| PersistenceError::QueryParameter {
            reason: err.to_string(),
        })?;
    }
    Ok(args)
}

/// 读取 RETURNING 子句返回的主键
fn decode_generated_id<I: Identifier>(row: &AnyRow) -> PersistenceResult<I> {
    if let Ok(id) = row.try_get::<i64, _>(0) {
        return I::from_value(Value::Int(id));
    }
    let id: String = row.try_get(0)?;
    I::from_value(Value::Text(id))
}
