//! 错误类型
//!
//! 代码解析、行情抓取、缓存与目录库的错误分类

use std::fmt;

use thiserror::Error;

use crate::models::{Region, Vendor};

/// 股票代码解析/转换错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("无效的股票代码格式: {0}")]
    Parse(String),

    #[error("不支持的数据源: {0}")]
    UnsupportedVendor(String),

    #[error("数据源 {vendor} 不支持地区 {region}")]
    UnsupportedRegion { region: Region, vendor: Vendor },
}

/// 单个数据源请求错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP状态码错误: {0}")]
    Status(u16),

    #[error("接口返回空数据")]
    EmptyBody,

    #[error("数据格式错误: {0}")]
    Malformed(String),

    #[error("数据源未注册: {0}")]
    SourceUnavailable(Vendor),

    #[error("抓取任务异常退出: {0}")]
    Task(String),
}

/// 股票对中的一条腿
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    A,
    H,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::A => f.write_str("A股"),
            Leg::H => f.write_str("H股"),
        }
    }
}

#[derive(Debug)]
pub struct LegFailure {
    pub leg: Leg,
    pub code: String,
    pub error: FetchError,
}

/// 股票对并发抓取时一条或两条腿失败
#[derive(Debug)]
pub struct AggregateFetchError {
    pub failures: Vec<LegFailure>,
}

impl AggregateFetchError {
    pub fn failed_legs(&self) -> Vec<Leg> {
        self.failures.iter().map(|f| f.leg).collect()
    }
}

impl fmt::Display for AggregateFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "获取股票数据时发生错误: ")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "获取{}({})数据失败: {}", failure.leg, failure.code, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFetchError {}

/// 缓存存储错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("缓存后端错误: {0}")]
    Backend(String),

    #[error("缓存序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// 目录库错误
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("记录不存在: {0}")]
    NotFound(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("未配置数据库")]
    Unavailable,
}

/// 服务层统一错误
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error(transparent)]
    Code(#[from] CodeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Aggregate(#[from] AggregateFetchError),

    #[error("获取股票对失败: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("请求已取消")]
    Cancelled,

    #[error("没有获取到任何股票数据")]
    NoData,
}

pub type Result<T> = std::result::Result<T, QuoteError>;
