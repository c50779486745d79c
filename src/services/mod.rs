//! 业务逻辑服务模块
//!
//! 封装行情获取、缓存和目录库访问

pub mod cache;             // 缓存存储与旁路缓存
pub mod catalog;           // 股票对目录与自选股存储
pub mod ha_stock_service;  // H-A 股票对服务
pub mod quote_service;     // 行情调度
pub mod stock;             // 行情数据源
pub mod watchlist_service; // 自选股服务
