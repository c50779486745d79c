//! 行情服务
//!
//! 根据股票代码选择数据源（港股用腾讯，A 股用新浪），转换代码后调用对应数据源。
//! 股票对的 A/H 两条腿并发抓取，任意一条失败则整体失败。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::error::{AggregateFetchError, FetchError, Leg, LegFailure, QuoteError, Result};
use crate::models::{PairedQuote, Quote, Region, StockPair, Vendor};
use crate::services::stock::{code, FetchMode, QuoteSource, SourceRegistry};

/// 地区 -> 数据源，固定业务规则
pub fn select_vendor(region: Region) -> Vendor {
    match region {
        Region::Hk => Vendor::Tencent,
        Region::Sh | Region::Sz => Vendor::Sina,
    }
}

pub struct QuoteService {
    sources: SourceRegistry,
}

impl QuoteService {
    pub fn new(sources: SourceRegistry) -> Self {
        Self { sources }
    }

    fn source(&self, vendor: Vendor) -> std::result::Result<Arc<dyn QuoteSource>, FetchError> {
        self.sources
            .get(vendor)
            .ok_or(FetchError::SourceUnavailable(vendor))
    }

    /// 获取单只股票行情，自动选择数据源
    pub async fn get_quote(&self, raw_code: &str, mode: FetchMode) -> Result<Quote> {
        let stock_code = code::parse(raw_code)?;
        let vendor = select_vendor(stock_code.region);
        let vendor_code = code::render(&stock_code, vendor)?;

        let quote = self.source(vendor)?.fetch_one(&vendor_code, mode).await?;
        Ok(quote)
    }

    /// 从指定数据源获取单只股票行情
    pub async fn get_quote_from(&self, raw_code: &str, vendor: Vendor, mode: FetchMode) -> Result<Quote> {
        let vendor_code = code::convert_for_vendor(raw_code, vendor)?;
        let quote = self.source(vendor)?.fetch_one(&vendor_code, mode).await?;
        Ok(quote)
    }

    /// 批量获取行情
    ///
    /// 按数据源分组，每个数据源一次请求。无效代码以及失败的分组直接跳过。
    pub async fn get_many_quotes(&self, raw_codes: &[String], mode: FetchMode) -> Vec<Quote> {
        let mut groups: HashMap<Vendor, Vec<String>> = HashMap::new();

        for raw_code in raw_codes {
            let converted = code::parse(raw_code).and_then(|stock_code| {
                let vendor = select_vendor(stock_code.region);
                code::render(&stock_code, vendor).map(|c| (vendor, c))
            });
            match converted {
                Ok((vendor, vendor_code)) => groups.entry(vendor).or_default().push(vendor_code),
                Err(e) => log::debug!("跳过无效代码 {}: {}", raw_code, e),
            }
        }

        let mut results = Vec::new();
        // 固定顺序：先新浪后腾讯
        for vendor in [Vendor::Sina, Vendor::Tencent] {
            let Some(codes) = groups.get(&vendor) else {
                continue;
            };
            let source = match self.source(vendor) {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };
            match source.fetch_many(codes, mode).await {
                Ok(quotes) => results.extend(quotes),
                Err(e) => log::warn!("{} 批量获取失败: {}", source.source_name(), e),
            }
        }

        results
    }

    /// 并发获取股票对的 A/H 两条腿
    ///
    /// A 股走新浪，H 股走腾讯。等待两条腿都完成；任意一条失败时返回
    /// 包含所有失败腿的 [`AggregateFetchError`]，不返回部分结果。
    /// `cancel` 被触发时立即中止两条腿并返回 [`QuoteError::Cancelled`]。
    pub async fn get_paired_quote(
        &self,
        pair: &StockPair,
        mode: FetchMode,
        cancel: &CancellationToken,
    ) -> Result<PairedQuote> {
        // 601038.SH -> sh601038
        let a_code = code::convert_for_vendor(&code::convert_dotted_code(&pair.a_stock_code), Vendor::Sina)?;
        let h_code = code::convert_for_vendor(&code::convert_dotted_code(&pair.h_stock_code), Vendor::Tencent)?;

        let a_source = self.source(Vendor::Sina)?;
        let h_source = self.source(Vendor::Tencent)?;

        let a_task = {
            let code = a_code.clone();
            tokio::spawn(async move { a_source.fetch_one(&code, mode).await })
        };
        let h_task = {
            let code = h_code.clone();
            tokio::spawn(async move { h_source.fetch_one(&code, mode).await })
        };
        let a_abort = a_task.abort_handle();
        let h_abort = h_task.abort_handle();

        let (a_result, h_result) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                a_abort.abort();
                h_abort.abort();
                return Err(QuoteError::Cancelled);
            }
            joined = async { tokio::join!(a_task, h_task) } => joined,
        };

        let mut failures = Vec::new();
        let a_quote = collect_leg(Leg::A, a_code, a_result, &mut failures);
        let h_quote = collect_leg(Leg::H, h_code, h_result, &mut failures);

        match (a_quote, h_quote) {
            (Some(a_quote), Some(h_quote)) if failures.is_empty() => Ok(PairedQuote {
                stock_name: pair.stock_name.clone(),
                a_stock_code: pair.a_stock_code.clone(),
                a_quote,
                h_stock_code: pair.h_stock_code.clone(),
                h_quote,
            }),
            _ => {
                let err = AggregateFetchError { failures };
                log::debug!("股票对 {} 失败: {:?}", pair.stock_name, err.failed_legs());
                Err(err.into())
            }
        }
    }
}

fn collect_leg(
    leg: Leg,
    code: String,
    result: std::result::Result<std::result::Result<Quote, FetchError>, JoinError>,
    failures: &mut Vec<LegFailure>,
) -> Option<Quote> {
    let error = match result {
        Ok(Ok(quote)) => return Some(quote),
        Ok(Err(e)) => e,
        Err(e) => FetchError::Task(e.to_string()),
    };
    failures.push(LegFailure { leg, code, error });
    None
}
