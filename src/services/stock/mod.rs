//! 股票行情数据源
//!
//! 新浪（A 股）和腾讯（港股）两个数据源实现同一个 [`QuoteSource`] 接口，
//! 由 [`SourceRegistry`] 在启动时显式组装后交给行情服务使用。

pub mod code;
pub mod sina;
pub mod tencent;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use reqwest::Client;

use crate::config::FeedsConfig;
use crate::error::FetchError;
use crate::models::{Quote, Vendor};

pub use sina::SinaSource;
pub use tencent::TencentSource;

/// 浏览器 UA，两家接口都会拒绝空 UA
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 抓取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// 普通请求
    #[default]
    Standard,
    /// 实时请求：附带防缓存参数和 no-cache 请求头（仅对支持的数据源生效）
    RealTime,
}

/// 行情数据源接口
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// 数据源显示名称
    fn source_name(&self) -> &str;

    /// 获取单只股票，`code` 为已转换的数据源代码
    async fn fetch_one(&self, code: &str, mode: FetchMode) -> Result<Quote, FetchError>;

    /// 批量获取，单条解析失败的记录直接丢弃
    async fn fetch_many(&self, codes: &[String], mode: FetchMode) -> Result<Vec<Quote>, FetchError>;
}

/// 数据源注册表：数据源 -> 实例
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<Vendor, Arc<dyn QuoteSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置创建新浪和腾讯两个数据源
    pub fn from_config(config: &FeedsConfig) -> Result<Self, FetchError> {
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

        let sina_client = Client::builder()
            .timeout(Duration::from_secs(config.sina_timeout_secs))
            .connect_timeout(connect_timeout)
            .build()?;
        let tencent_client = Client::builder()
            .timeout(Duration::from_secs(config.tencent_timeout_secs))
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self::new()
            .with_source(Arc::new(SinaSource::with_base_url(sina_client, &config.sina_base_url)))
            .with_source(Arc::new(TencentSource::with_base_url(
                tencent_client,
                &config.tencent_base_url,
            ))))
    }

    pub fn with_source(mut self, source: Arc<dyn QuoteSource>) -> Self {
        self.sources.insert(source.vendor(), source);
        self
    }

    pub fn get(&self, vendor: Vendor) -> Option<Arc<dyn QuoteSource>> {
        self.sources.get(&vendor).cloned()
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.sources.keys().copied().collect()
    }
}

// ==================== 解析辅助函数 ====================

fn to_fixed(dt: DateTime<chrono_tz::Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&dt.offset().fix())
}

/// 当前北京时间
pub fn beijing_now() -> DateTime<FixedOffset> {
    to_fixed(Utc::now().with_timezone(&Shanghai))
}

/// 把数据源返回的本地时间（北京时间）转换为带时区的时间
pub fn beijing_datetime(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Shanghai.from_local_datetime(&naive).single().map(to_fixed)
}

/// 依次尝试各个日期时间格式，第一个成功的为准
pub fn parse_datetime(value: &str, layouts: &[&str]) -> Option<DateTime<FixedOffset>> {
    layouts
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .and_then(beijing_datetime)
}

/// 只有时分秒的时间，日期取今天
pub fn parse_time_today(value: &str, layout: &str, today: NaiveDate) -> Option<DateTime<FixedOffset>> {
    NaiveTime::parse_from_str(value, layout)
        .ok()
        .and_then(|time| beijing_datetime(today.and_time(time)))
}

pub(crate) fn field_f64(fields: &[&str], idx: usize) -> f64 {
    fields
        .get(idx)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub(crate) fn field_i64(fields: &[&str], idx: usize) -> i64 {
    fields
        .get(idx)
        .and_then(|s| {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|v| v as i64))
        })
        .unwrap_or(0)
}

/// 在候选字段中取第一个能解析为正数的值
pub(crate) fn first_positive(fields: &[&str], candidates: &[usize]) -> Option<f64> {
    candidates.iter().find_map(|&idx| {
        fields
            .get(idx)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| *v > 0.0)
    })
}

pub(crate) fn change_percent(price: f64, prev_close: f64) -> f64 {
    if prev_close != 0.0 {
        (price - prev_close) / prev_close * 100.0
    } else {
        0.0
    }
}

/// 从 `var hq_str_sh601038="..."` / `v_hk00038="..."` 中取出变量名里的代码
pub(crate) fn assigned_code<'a>(line: &'a str, var_prefix: &str) -> Option<&'a str> {
    let (lhs, _) = line.split_once('=')?;
    let lhs = lhs.trim();
    let lhs = lhs.strip_prefix("var ").unwrap_or(lhs).trim();
    lhs.strip_prefix(var_prefix).filter(|code| !code.is_empty())
}

/// 把批量响应按行拆分，并为每行找到对应的请求代码
///
/// 优先使用行内变量名中的代码，取不到时按行号对应请求顺序。
pub(crate) fn pair_lines<'a>(
    body: &'a str,
    codes: &'a [String],
    var_prefix: &str,
) -> Vec<(&'a str, &'a str)> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| {
            assigned_code(line, var_prefix)
                .or_else(|| codes.get(i).map(String::as_str))
                .map(|code| (code, line))
        })
        .collect()
}
