//! 查询缓存
//!
//! 只缓存标记为 cacheable 的查询结果。每个条目记录它依赖的表区域（region），
//! 未声明依赖的条目视为依赖所有表。
//!
//! 写操作通过区域时间戳参与失效：事务内首次写某表时 `begin_write` 标记该区域
//! 正在写入，提交或回滚时 `end_write` 撤销标记；非事务写直接 `invalidate`。
//! 三者都会清除相关条目并刷新区域的失效时间。区域正在写入，或在查询开始之后
//! 被失效过时，查询结果不会写入缓存。
//!
use dashmap::DashMap;
use persistence_core::error::PersistenceResult;
use persistence_core::sql::SqlStatement;
use std::any::{Any, type_name};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 代表所有表的区域；`execute_update` 等无法确定目标表的写操作使用它
pub const ALL_REGIONS: &str = "*";

type CachedRows = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    regions: Vec<String>,
    fingerprint: String,
}

impl CacheKey {
    /// 以结果类型、SQL 与绑定值（含分页）生成指纹；`regions` 为空表示依赖所有表
    pub fn new<T: 'static>(regions: &[&str], statement: &SqlStatement) -> PersistenceResult<Self> {
        let fingerprint = serde_json::to_string(&(type_name::<T>(), statement))?;
        let mut regions: Vec<String> = regions.iter().map(|r| r.to_string()).collect();
        regions.sort();
        regions.dedup();
        Ok(Self {
            regions,
            fingerprint,
        })
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    fn depends_on(&self, region: &str) -> bool {
        region == ALL_REGIONS || self.regions.is_empty() || self.regions.iter().any(|r| r == region)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionState {
    writers: u32,
    invalidated_at: u64,
}

#[derive(Default)]
pub struct QueryCache {
    entries: DashMap<CacheKey, CachedRows>,
    regions: DashMap<String, RegionState>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单调递增的时间戳；查询开始前取得，`put` 时用于判断结果是否过期
    pub fn timestamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get<T>(&self, key: &CacheKey) -> Option<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let found = self
            .entries
            .get(key)
            .and_then(|rows| rows.value().clone().downcast::<Vec<T>>().ok());
        match found {
            Some(rows) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(rows.as_ref().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// 缓存 `started_at` 时开始的查询结果
    ///
    /// 依赖的区域正在写入，或在 `started_at` 之后被失效过时不缓存，返回 `false`。
    pub fn put<T>(&self, key: CacheKey, rows: &[T], started_at: u64) -> bool
    where
        T: Clone + Send + Sync + 'static,
    {
        if !self.is_fresh(&key, started_at) {
            return false;
        }
        self.entries.insert(key.clone(), Arc::new(rows.to_vec()));
        // 插入期间可能有并发写入
        if !self.is_fresh(&key, started_at) {
            self.entries.remove(&key);
            return false;
        }
        true
    }

    /// 事务内开始写入某区域
    pub fn begin_write(&self, region: &str) {
        self.mark(region, |state| state.writers += 1);
    }

    /// 写入区域的事务已提交或回滚
    pub fn end_write(&self, region: &str) {
        self.mark(region, |state| state.writers = state.writers.saturating_sub(1));
    }

    /// 已提交的写入
    pub fn invalidate(&self, region: &str) {
        self.mark(region, |_| ());
    }

    /// 失效依赖该区域的全部条目
    pub fn evict_region(&self, region: &str) {
        self.entries.retain(|key, _| !key.depends_on(region));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn mark(&self, region: &str, update: impl FnOnce(&mut RegionState)) {
        let now = self.timestamp();
        {
            let mut state = self.regions.entry(region.to_string()).or_default();
            update(&mut *state);
            state.invalidated_at = now;
        }
        self.evict_region(region);
    }

    fn is_fresh(&self, key: &CacheKey, started_at: u64) -> bool {
        self.regions.iter().all(|entry| {
            let state = entry.value();
            !key.depends_on(entry.key()) || (state.writers == 0 && state.invalidated_at < started_at)
        })
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stats", &self.stats())
            .finish()
    }
}
