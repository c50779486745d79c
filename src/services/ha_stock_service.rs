//! H-A 股票对服务
//!
//! 组合目录库、行情服务和旁路缓存：
//! - 全量列表与按名称查询走旁路缓存
//! - 实时接口绕过缓存
//! - 刷新、强制刷新与缓存清理

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::CacheConfig;
use crate::error::{QuoteError, Result};
use crate::models::{PairedQuote, StockPair};
use crate::services::cache::{CacheAside, CachePolicy};
use crate::services::catalog::PairCatalog;
use crate::services::quote_service::QuoteService;
use crate::services::stock::FetchMode;

/// 全量缓存键
pub const ALL_PAIRS_KEY: &str = "ha_stocks:all";

/// 单个股票对的缓存键
pub fn pair_key(stock_name: &str) -> String {
    format!("ha_stock:{}", stock_name)
}

/// 各类缓存策略
#[derive(Debug, Clone, Copy)]
pub struct HaCachePolicies {
    pub all_pairs: CachePolicy,
    pub single_pair: CachePolicy,
    /// 主动刷新后写入的过期时间
    pub refresh_ttl: Duration,
}

impl From<&CacheConfig> for HaCachePolicies {
    fn from(config: &CacheConfig) -> Self {
        Self {
            all_pairs: CachePolicy::new(
                Duration::from_secs(config.all_pairs_freshness_secs),
                Duration::from_secs(config.all_pairs_ttl_secs),
            ),
            single_pair: CachePolicy::new(
                Duration::from_secs(config.single_pair_freshness_secs),
                Duration::from_secs(config.single_pair_ttl_secs),
            ),
            refresh_ttl: Duration::from_secs(config.force_refresh_ttl_secs),
        }
    }
}

pub struct HaStockService {
    catalog: Arc<dyn PairCatalog>,
    quotes: Arc<QuoteService>,
    cache: CacheAside,
    policies: HaCachePolicies,
}

impl HaStockService {
    pub fn new(
        catalog: Arc<dyn PairCatalog>,
        quotes: Arc<QuoteService>,
        cache: CacheAside,
        policies: HaCachePolicies,
    ) -> Self {
        Self {
            catalog,
            quotes,
            cache,
            policies,
        }
    }

    /// 目录中的全部股票对，不含行情
    pub async fn list_pairs(&self) -> Result<Vec<StockPair>> {
        Ok(self.catalog.list_pairs().await?)
    }

    /// 按名称查找股票对，不含行情
    pub async fn find_pair(&self, name: &str) -> Result<StockPair> {
        Ok(self.catalog.find_pair_by_name(name).await?)
    }

    /// 获取全部股票对行情（优先读缓存）
    pub async fn all_paired_quotes(&self, cancel: &CancellationToken) -> Result<Vec<PairedQuote>> {
        self.cache
            .read_through(ALL_PAIRS_KEY, self.policies.all_pairs, move || {
                self.fetch_all(FetchMode::Standard, cancel)
            })
            .await
    }

    /// 按名称获取股票对行情（优先读缓存）
    pub async fn paired_quote_by_name(&self, name: &str, cancel: &CancellationToken) -> Result<PairedQuote> {
        self.cache
            .read_through(&pair_key(name), self.policies.single_pair, move || async move {
                let pair = self.catalog.find_pair_by_name(name).await?;
                self.quotes.get_paired_quote(&pair, FetchMode::Standard, cancel).await
            })
            .await
    }

    /// 获取全部股票对实时行情，不读写缓存
    pub async fn all_paired_quotes_realtime(&self, cancel: &CancellationToken) -> Result<Vec<PairedQuote>> {
        self.fetch_all(FetchMode::RealTime, cancel).await
    }

    /// 按名称获取实时行情，不读写缓存
    pub async fn paired_quote_by_name_realtime(&self, name: &str, cancel: &CancellationToken) -> Result<PairedQuote> {
        let pair = self.catalog.find_pair_by_name(name).await?;
        self.quotes.get_paired_quote(&pair, FetchMode::RealTime, cancel).await
    }

    /// 刷新：经旁路缓存读取全量后，逐个写入单项缓存并重写全量缓存
    pub async fn refresh_all(&self, cancel: &CancellationToken) -> Result<Vec<PairedQuote>> {
        let results = self.all_paired_quotes(cancel).await?;
        self.store_results(&results).await;
        Ok(results)
    }

    /// 强制刷新：忽略缓存重新抓取所有股票对
    ///
    /// 单个股票对失败时跳过，全部失败时返回 [`QuoteError::NoData`]。
    pub async fn force_refresh_all(&self, cancel: &CancellationToken) -> Result<Vec<PairedQuote>> {
        let pairs = self.catalog.list_pairs().await?;
        let results = self.fetch_pairs(&pairs, FetchMode::Standard, cancel).await?;
        if results.is_empty() {
            return Err(QuoteError::NoData);
        }

        log::info!("强制刷新完成: {}/{} 个股票对", results.len(), pairs.len());
        self.store_results(&results).await;
        Ok(results)
    }

    /// 清除单个股票对缓存
    pub async fn clear_cache(&self, name: &str) -> Result<()> {
        self.cache.invalidate(&pair_key(name)).await?;
        Ok(())
    }

    /// 清除全量缓存和所有股票对缓存
    ///
    /// 先删全量键，再按目录逐个删除单项键；单项键删除失败被忽略。
    pub async fn clear_all_cache(&self) -> Result<()> {
        self.cache.invalidate(ALL_PAIRS_KEY).await?;

        let pairs = self.catalog.list_pairs().await?;
        let keys: Vec<String> = pairs.iter().map(|p| pair_key(&p.stock_name)).collect();
        self.cache.invalidate_many(&keys).await;
        Ok(())
    }

    async fn store_results(&self, results: &[PairedQuote]) {
        let entries = results
            .iter()
            .map(|item| (pair_key(&item.stock_name), item))
            .collect();
        self.cache.put_many(entries, self.policies.refresh_ttl).await;
        self.cache.put(ALL_PAIRS_KEY, results, self.policies.refresh_ttl).await;
    }

    async fn fetch_all(&self, mode: FetchMode, cancel: &CancellationToken) -> Result<Vec<PairedQuote>> {
        let pairs = self.catalog.list_pairs().await?;
        let results = self.fetch_pairs(&pairs, mode, cancel).await?;
        if results.is_empty() && !pairs.is_empty() {
            return Err(QuoteError::NoData);
        }
        Ok(results)
    }

    /// 并发抓取多个股票对，失败的跳过，保持目录顺序
    async fn fetch_pairs(
        &self,
        pairs: &[StockPair],
        mode: FetchMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<PairedQuote>> {
        let outcomes = futures::future::join_all(
            pairs
                .iter()
                .map(|pair| self.quotes.get_paired_quote(pair, mode, cancel)),
        )
        .await;

        if cancel.is_cancelled() {
            return Err(QuoteError::Cancelled);
        }

        let mut results = Vec::with_capacity(pairs.len());
        for (pair, outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Ok(paired) => results.push(paired),
                Err(e) => log::warn!("获取股票 {} 数据失败: {}", pair.stock_name, e),
            }
        }
        Ok(results)
    }
}
