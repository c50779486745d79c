//! 股票数据模型
//!
//! 定义股票代码、行情、A/H 股票对等数据结构

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 市场地区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// 上海证券交易所
    Sh,
    /// 深圳证券交易所
    Sz,
    /// 香港联合交易所
    Hk,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Sh, Region::Sz, Region::Hk];

    /// 从小写地区前缀解析
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sh" => Some(Region::Sh),
            "sz" => Some(Region::Sz),
            "hk" => Some(Region::Hk),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Sh => "sh",
            Region::Sz => "sz",
            Region::Hk => "hk",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 行情数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// 新浪财经（A 股）
    Sina,
    /// 腾讯股票（港股）
    Tencent,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Sina => "sina",
            Vendor::Tencent => "tencent",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解析后的股票代码，如 `sh601038` -> `{ region: Sh, number: "601038" }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockCode {
    pub region: Region,
    pub number: String,
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.region, self.number)
    }
}

/// 行情更新时间的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// 数据源返回的时间
    Vendor,
    /// 数据源未提供可解析的时间，使用抓取时刻
    CaptureTime,
}

/// 标准化的实时行情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// 股票名称
    pub name: String,
    /// 数据源代码（如 sh601038）
    pub code: String,
    /// 当前价格
    pub price: f64,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
    /// 涨跌额
    pub change_value: f64,
    /// 成交量
    pub volume: i64,
    /// 成交额（数据源原始单位）
    pub amount: f64,
    /// 更新时间（北京时间）
    pub update_time: DateTime<FixedOffset>,
    /// 更新时间来源
    pub timestamp_source: TimestampSource,
}

/// H-A 股票对（目录库中的一行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockPair {
    /// 表中为有符号 BIGINT
    pub id: i64,
    /// 股票名称，唯一
    pub stock_name: String,
    /// A 股代码，如 601038.SH
    pub a_stock_code: String,
    /// H 股代码，如 00038.HK
    pub h_stock_code: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// A/H 两条腿都成功获取后的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedQuote {
    pub stock_name: String,
    pub a_stock_code: String,
    pub a_quote: Quote,
    pub h_stock_code: String,
    pub h_quote: Quote,
}

/// 自选股
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchlistEntry {
    pub id: i64,
    /// 自定义名称
    pub custom_name: String,
    /// 股票代码，如 sh601038
    pub custom_code: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// 带实时行情的自选股
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistQuote {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    /// 行情获取失败时为空
    pub quote: Option<Quote>,
}

/// 按名称查询股票对的参数
#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub name: Option<String>,
}

/// 刷新参数，`force` 默认为 true
#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub force: Option<bool>,
}

/// 单只行情查询参数
#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    /// 指定数据源，如 sina / tencent
    pub vendor: Option<String>,
    /// 为 true 时使用实时模式
    #[serde(default)]
    pub realtime: bool,
}

/// 批量行情查询参数，codes 以逗号分隔
#[derive(Debug, Deserialize)]
pub struct QuotesQuery {
    pub codes: String,
}

/// 新增自选股请求
#[derive(Debug, Deserialize)]
pub struct NewWatchlistEntry {
    pub custom_name: String,
    pub custom_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{MySql, Type, TypeInfo};

    fn column_type<T: Type<MySql>>(_: &T) -> String {
        T::type_info().name().to_string()
    }

    #[test]
    fn test_ids_decode_from_signed_bigint() {
        let pair: StockPair = serde_json::from_value(serde_json::json!({
            "id": 9_007_199_254_740_993_i64,
            "stock_name": "一拖股份",
            "a_stock_code": "601038.SH",
            "h_stock_code": "00038.HK",
            "created_at": null,
            "updated_at": null
        }))
        .unwrap();
        assert_eq!(column_type(&pair.id), "BIGINT");

        let entry = WatchlistEntry {
            id: -1,
            custom_name: "一拖股份".to_string(),
            custom_code: "sh601038".to_string(),
            created_at: None,
            updated_at: None,
        };
        assert_eq!(column_type(&entry.id), "BIGINT");
    }
}
