//! 旁路缓存
//!
//! 读：先查缓存，用数据自身的更新时间（而不是存储的 TTL）判断是否新鲜，
//! 新鲜则直接返回；缺失或过期时调用刷新函数，成功后写回缓存。
//! 写缓存失败只记录日志，不影响读取结果。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::store::CacheStore;
use crate::error::{CacheError, QuoteError};
use crate::models::{PairedQuote, Quote, TimestampSource};
use crate::services::stock::beijing_now;

/// 一类缓存数据的读写策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// 数据更新时间距今不超过该时长视为新鲜
    pub freshness_window: Duration,
    /// 写入存储时的过期时间
    pub ttl: Duration,
}

impl CachePolicy {
    pub const fn new(freshness_window: Duration, ttl: Duration) -> Self {
        Self { freshness_window, ttl }
    }
}

/// 新鲜度判断规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FreshnessRules {
    /// 集合要求每个元素都新鲜；默认只看第一个元素
    pub all_elements: bool,
    /// 使用抓取时刻作为更新时间的行情视为不新鲜
    pub require_vendor_timestamp: bool,
}

/// 带更新时间、可以判断新鲜度的缓存数据
pub trait Freshness {
    fn is_fresh(&self, window: Duration, now: DateTime<FixedOffset>, rules: FreshnessRules) -> bool;

    /// 是否值得写入缓存
    fn is_cacheable(&self) -> bool {
        true
    }
}

fn within_window(update_time: DateTime<FixedOffset>, window: Duration, now: DateTime<FixedOffset>) -> bool {
    let age = now.signed_duration_since(update_time);
    match chrono::Duration::from_std(window) {
        Ok(window) => age < window,
        Err(_) => true,
    }
}

impl Freshness for Quote {
    fn is_fresh(&self, window: Duration, now: DateTime<FixedOffset>, rules: FreshnessRules) -> bool {
        if rules.require_vendor_timestamp && self.timestamp_source != TimestampSource::Vendor {
            return false;
        }
        within_window(self.update_time, window, now)
    }
}

impl Freshness for PairedQuote {
    /// 以 A 股的更新时间为准；严格模式下 A 股时间不可信时改看 H 股
    fn is_fresh(&self, window: Duration, now: DateTime<FixedOffset>, rules: FreshnessRules) -> bool {
        let leg = if rules.require_vendor_timestamp && self.a_quote.timestamp_source != TimestampSource::Vendor {
            &self.h_quote
        } else {
            &self.a_quote
        };
        leg.is_fresh(window, now, rules)
    }
}

impl<T: Freshness> Freshness for Vec<T> {
    /// 默认只检查第一个元素，其余元素可能已经过期（已知的近似处理）
    fn is_fresh(&self, window: Duration, now: DateTime<FixedOffset>, rules: FreshnessRules) -> bool {
        if rules.all_elements {
            !self.is_empty() && self.iter().all(|item| item.is_fresh(window, now, rules))
        } else {
            self.first()
                .map(|item| item.is_fresh(window, now, rules))
                .unwrap_or(false)
        }
    }

    fn is_cacheable(&self) -> bool {
        !self.is_empty()
    }
}

/// 旁路缓存层
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    rules: FreshnessRules,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_rules(store, FreshnessRules::default())
    }

    pub fn with_rules(store: Arc<dyn CacheStore>, rules: FreshnessRules) -> Self {
        Self { store, rules }
    }

    /// 读取并反序列化缓存，任何错误都当作未命中
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("读取缓存 {} 失败: {}", key, e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("缓存 {} 反序列化失败: {}", key, e);
                None
            }
        }
    }

    /// 写入缓存，失败只记录日志
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let result = match serde_json::to_vec(value) {
            Ok(bytes) => self.store.set(key, bytes, ttl).await,
            Err(e) => Err(CacheError::from(e)),
        };
        if let Err(e) = result {
            log::warn!("缓存数据到 {} 失败: {}", key, e);
        }
    }

    /// 批量写入缓存，失败只记录日志
    pub async fn put_many<T: Serialize>(&self, entries: Vec<(String, &T)>, ttl: Duration) {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match serde_json::to_vec(value) {
                Ok(bytes) => encoded.push((key, bytes)),
                Err(e) => log::warn!("缓存 {} 序列化失败: {}", key, e),
            }
        }

        let count = encoded.len();
        if let Err(e) = self.store.set_many(encoded, ttl).await {
            log::warn!("批量写入 {} 条缓存失败: {}", count, e);
        }
    }

    /// 旁路读取
    ///
    /// 缓存命中且新鲜时直接返回，不调用 `refresh`；否则调用 `refresh`，
    /// 成功后按 `policy.ttl` 写回。`refresh` 的错误原样返回。
    pub async fn read_through<T, F, Fut>(&self, key: &str, policy: CachePolicy, refresh: F) -> Result<T, QuoteError>
    where
        T: Serialize + DeserializeOwned + Freshness,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QuoteError>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            if cached.is_fresh(policy.freshness_window, beijing_now(), self.rules) {
                log::debug!("缓存命中: {}", key);
                return Ok(cached);
            }
            log::debug!("缓存已过期: {}", key);
        }

        let value = refresh().await?;
        if value.is_cacheable() {
            self.put(key, &value, policy.ttl).await;
        }
        Ok(value)
    }

    /// 删除单个键
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).await
    }

    /// 尽力删除一批键，单个键的删除失败只记录日志
    pub async fn invalidate_many(&self, keys: &[String]) {
        let results = futures::future::join_all(keys.iter().map(|key| self.store.delete(key))).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            log::warn!("清除缓存时 {} 个键删除失败，已忽略", failed);
        }
    }
}
