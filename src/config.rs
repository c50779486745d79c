//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，`DATABASE_URL` / `REDIS_URL` 环境变量优先

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::services::stock::sina::SINA_QUOTE_API;
use crate::services::stock::tencent::TENCENT_QUOTE_API;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 行情数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_sina_base_url")]
    pub sina_base_url: String,
    #[serde(default = "default_tencent_base_url")]
    pub tencent_base_url: String,
    /// 新浪请求超时（秒）
    #[serde(default = "default_sina_timeout")]
    pub sina_timeout_secs: u64,
    /// 腾讯请求超时（秒）
    #[serde(default = "default_tencent_timeout")]
    pub tencent_timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// 缓存后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// 全量列表新鲜度（秒）
    #[serde(default = "default_all_pairs_freshness")]
    pub all_pairs_freshness_secs: u64,
    #[serde(default = "default_all_pairs_ttl")]
    pub all_pairs_ttl_secs: u64,
    /// 主动刷新写入的过期时间（秒）
    #[serde(default = "default_force_refresh_ttl")]
    pub force_refresh_ttl_secs: u64,
    /// 单个股票对新鲜度（秒）
    #[serde(default = "default_single_pair_freshness")]
    pub single_pair_freshness_secs: u64,
    #[serde(default = "default_single_pair_ttl")]
    pub single_pair_ttl_secs: u64,
    /// 集合要求所有元素都新鲜
    #[serde(default)]
    pub strict_freshness: bool,
    /// 没有数据源时间戳的行情视为过期
    #[serde(default)]
    pub strict_timestamps: bool,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// MySQL 连接串，为空则不连接数据库
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_sina_base_url() -> String { SINA_QUOTE_API.to_string() }
fn default_tencent_base_url() -> String { TENCENT_QUOTE_API.to_string() }
fn default_sina_timeout() -> u64 { 10 }
fn default_tencent_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_cache_backend() -> CacheBackend { CacheBackend::Redis }
fn default_redis_url() -> String { "redis://127.0.0.1:6379/0".to_string() }
fn default_all_pairs_freshness() -> u64 { 120 }
fn default_all_pairs_ttl() -> u64 { 120 }
fn default_force_refresh_ttl() -> u64 { 300 }
fn default_single_pair_freshness() -> u64 { 60 }
fn default_single_pair_ttl() -> u64 { 120 }
fn default_max_connections() -> u32 { 10 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sina_base_url: default_sina_base_url(),
            tencent_base_url: default_tencent_base_url(),
            sina_timeout_secs: default_sina_timeout(),
            tencent_timeout_secs: default_tencent_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            all_pairs_freshness_secs: default_all_pairs_freshness(),
            all_pairs_ttl_secs: default_all_pairs_ttl(),
            force_refresh_ttl_secs: default_force_refresh_ttl(),
            single_pair_freshness_secs: default_single_pair_freshness(),
            single_pair_ttl_secs: default_single_pair_ttl(),
            strict_freshness: false,
            strict_timestamps: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    /// 无法识别的级别按 info 处理
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.trim().parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值，最后应用环境变量
    pub fn load() -> Self {
        let mut config = Self::load_file();
        config.apply_env();
        config
    }

    fn load_file() -> Self {
        Self::load_from(&["config.json", "config/config.json"])
    }

    /// 依次尝试各路径，第一个解析成功的生效
    fn load_from(config_paths: &[&str]) -> Self {
        for &path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        log::info!("从 {} 加载配置成功", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        log::info!("使用默认配置");
        Self::default()
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = env::var("REDIS_URL") {
            self.cache.redis_url = url;
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
