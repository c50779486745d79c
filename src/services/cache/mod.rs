//! 缓存
//!
//! `store` 为键值存储后端，`aside` 在其上实现按数据更新时间判断新鲜度的旁路缓存。

pub mod aside;
pub mod store;

pub use aside::{CacheAside, CachePolicy, Freshness, FreshnessRules};
pub use store::{CacheStore, MemoryCacheStore, RedisCacheStore};
