//! A/H 股行情后端服务
//!
//! 提供 H-A 股票对比价、单只/批量行情和自选股的 RESTful API
//! 数据来源：新浪财经（A 股）、腾讯股票（港股）

mod config;   // 配置
mod error;    // 错误类型
mod handlers; // HTTP 请求处理器
mod models;   // 数据模型定义
mod services; // 业务逻辑服务

use std::env;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, CacheBackend};
use crate::handlers::AppState;
use crate::services::cache::{CacheAside, CacheStore, FreshnessRules, MemoryCacheStore, RedisCacheStore};
use crate::services::catalog::{EmptyCatalog, MySqlCatalog, PairCatalog, WatchlistStore};
use crate::services::ha_stock_service::{HaCachePolicies, HaStockService};
use crate::services::quote_service::QuoteService;
use crate::services::stock::SourceRegistry;
use crate::services::watchlist_service::WatchlistService;

/// 按配置选择缓存后端，Redis 不可用时退回内存缓存
async fn build_cache_store(config: &AppConfig) -> Arc<dyn CacheStore> {
    if config.cache.backend == CacheBackend::Redis {
        match RedisCacheStore::connect(&config.cache.redis_url).await {
            Ok(store) => return Arc::new(store),
            Err(e) => log::warn!("Redis 连接失败，改用内存缓存: {}", e),
        }
    } else {
        log::info!("使用内存缓存");
    }

    let store = MemoryCacheStore::new();
    spawn_memory_sweeper(store.clone());
    Arc::new(store)
}

/// 定期清理内存缓存中过期的条目
fn spawn_memory_sweeper(store: MemoryCacheStore) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            store.clear_expired().await;
            log::debug!("内存缓存清理完成，剩余 {} 条", store.len().await);
        }
    });
}

/// 连接目录库，未配置或连接失败时使用空目录
async fn build_catalog(config: &AppConfig) -> (Arc<dyn PairCatalog>, Arc<dyn WatchlistStore>) {
    if config.database.url.is_empty() {
        log::warn!("未配置数据库，股票对和自选股接口不可用");
        return (Arc::new(EmptyCatalog), Arc::new(EmptyCatalog));
    }

    match MySqlCatalog::connect(&config.database).await {
        Ok(catalog) => {
            let catalog = Arc::new(catalog);
            (catalog.clone(), catalog)
        }
        Err(e) => {
            log::error!("MySQL 连接失败: {}", e);
            (Arc::new(EmptyCatalog), Arc::new(EmptyCatalog))
        }
    }
}

/// 在加载配置前初始化日志，返回是否由 RUST_LOG 指定级别
///
/// 未设置 RUST_LOG 时先按 info 输出，读到配置后再调整。
fn init_logger() -> bool {
    let from_env = env::var_os("RUST_LOG").is_some();
    env_logger::init_from_env(Env::default().default_filter_or("trace"));
    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }
    from_env
}

/// 应用程序入口
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let level_from_env = init_logger();
    let config = AppConfig::load();

    // RUST_LOG 优先于配置文件
    if !level_from_env {
        log::set_max_level(config.log.level_filter());
    }

    log::info!("启动 A/H 股行情服务");

    let sources = SourceRegistry::from_config(&config.feeds)?;
    let quotes = Arc::new(QuoteService::new(sources.clone()));

    let rules = FreshnessRules {
        all_elements: config.cache.strict_freshness,
        require_vendor_timestamp: config.cache.strict_timestamps,
    };
    let cache = CacheAside::with_rules(build_cache_store(&config).await, rules);
    let (pairs, watchlist) = build_catalog(&config).await;

    let shutdown = CancellationToken::new();
    let state = web::Data::new(AppState {
        quotes: quotes.clone(),
        ha_stocks: HaStockService::new(pairs, quotes.clone(), cache, HaCachePolicies::from(&config.cache)),
        watchlist: WatchlistService::new(watchlist, quotes),
        sources,
        shutdown: shutdown.clone(),
    });

    let bind_addr = config.bind_addr();
    log::info!("监听 {}", bind_addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default()) // 请求日志
            .configure(handlers::config) // 配置路由
    });
    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    let result = server.bind(&bind_addr)?.run().await;

    // 中止仍在进行的行情请求
    shutdown.cancel();
    result?;
    Ok(())
}
