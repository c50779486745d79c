//! 股票目录
//!
//! H-A 股票对存放在 MySQL 的 `stock_pairs` 表，自选股存放在 `custom` 表。
//! 未配置数据库时使用空目录，行情接口仍然可用。

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::CatalogError;
use crate::models::{StockPair, WatchlistEntry};

/// H-A 股票对目录
#[async_trait]
pub trait PairCatalog: Send + Sync {
    async fn list_pairs(&self) -> Result<Vec<StockPair>, CatalogError>;

    /// 按名称精确查找，不存在时返回 [`CatalogError::NotFound`]
    async fn find_pair_by_name(&self, name: &str) -> Result<StockPair, CatalogError>;
}

/// 自选股存储
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn list_entries(&self) -> Result<Vec<WatchlistEntry>, CatalogError>;

    /// 不存在时返回 [`CatalogError::NotFound`]
    async fn find_entry(&self, id: i64) -> Result<WatchlistEntry, CatalogError>;

    async fn create_entry(&self, name: &str, code: &str) -> Result<WatchlistEntry, CatalogError>;

    /// 修改名称和代码，返回更新后的条目
    async fn update_entry(&self, id: i64, name: &str, code: &str) -> Result<WatchlistEntry, CatalogError>;

    async fn delete_entry(&self, id: i64) -> Result<(), CatalogError>;
}

/// MySQL 目录
#[derive(Clone)]
pub struct MySqlCatalog {
    pool: MySqlPool,
}

const SELECT_PAIRS: &str = "SELECT id, stock_name, a_stock_code, h_stock_code, \
     crawl_time AS created_at, updated_at FROM stock_pairs";

const SELECT_ENTRIES: &str = "SELECT id, custom_name, custom_code, \
     crawl_time AS created_at, updated_at FROM custom";

impl MySqlCatalog {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, CatalogError> {
        log::info!("连接 MySQL...");
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        log::info!("MySQL 连接成功");
        Ok(Self { pool })
    }
}

#[async_trait]
impl PairCatalog for MySqlCatalog {
    async fn list_pairs(&self) -> Result<Vec<StockPair>, CatalogError> {
        let sql = format!("{} ORDER BY id", SELECT_PAIRS);
        let pairs = sqlx::query_as::<_, StockPair>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(pairs)
    }

    async fn find_pair_by_name(&self, name: &str) -> Result<StockPair, CatalogError> {
        let sql = format!("{} WHERE stock_name = ? LIMIT 1", SELECT_PAIRS);
        sqlx::query_as::<_, StockPair>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl WatchlistStore for MySqlCatalog {
    async fn list_entries(&self) -> Result<Vec<WatchlistEntry>, CatalogError> {
        let sql = format!("{} ORDER BY id", SELECT_ENTRIES);
        let entries = sqlx::query_as::<_, WatchlistEntry>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn find_entry(&self, id: i64) -> Result<WatchlistEntry, CatalogError> {
        let sql = format!("{} WHERE id = ?", SELECT_ENTRIES);
        sqlx::query_as::<_, WatchlistEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn create_entry(&self, name: &str, code: &str) -> Result<WatchlistEntry, CatalogError> {
        let result = sqlx::query(
            "INSERT INTO custom (custom_name, custom_code, crawl_time, updated_at) VALUES (?, ?, NOW(3), NOW(3))",
        )
        .bind(name)
        .bind(code)
        .execute(&self.pool)
        .await?;

        // id 列为有符号 BIGINT
        self.find_entry(result.last_insert_id() as i64).await
    }

    async fn update_entry(&self, id: i64, name: &str, code: &str) -> Result<WatchlistEntry, CatalogError> {
        sqlx::query("UPDATE custom SET custom_name = ?, custom_code = ?, updated_at = NOW(3) WHERE id = ?")
            .bind(name)
            .bind(code)
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find_entry(id).await
    }

    async fn delete_entry(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM custom WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// 无数据库时的空目录
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

#[async_trait]
impl PairCatalog for EmptyCatalog {
    async fn list_pairs(&self) -> Result<Vec<StockPair>, CatalogError> {
        Ok(Vec::new())
    }

    async fn find_pair_by_name(&self, name: &str) -> Result<StockPair, CatalogError> {
        Err(CatalogError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl WatchlistStore for EmptyCatalog {
    async fn list_entries(&self) -> Result<Vec<WatchlistEntry>, CatalogError> {
        Ok(Vec::new())
    }

    async fn find_entry(&self, id: i64) -> Result<WatchlistEntry, CatalogError> {
        Err(CatalogError::NotFound(id.to_string()))
    }

    async fn create_entry(&self, _name: &str, _code: &str) -> Result<WatchlistEntry, CatalogError> {
        Err(CatalogError::Unavailable)
    }

    async fn update_entry(&self, id: i64, _name: &str, _code: &str) -> Result<WatchlistEntry, CatalogError> {
        Err(CatalogError::NotFound(id.to_string()))
    }

    async fn delete_entry(&self, id: i64) -> Result<(), CatalogError> {
        Err(CatalogError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::RwLock;

    /// 内存目录，测试用
    #[derive(Default)]
    pub struct MemoryCatalog {
        pub pairs: Vec<StockPair>,
        pub entries: RwLock<Vec<WatchlistEntry>>,
        fail_listing: bool,
        next_id: AtomicI64,
    }

    impl MemoryCatalog {
        pub fn with_pairs(pairs: Vec<StockPair>) -> Self {
            Self { pairs, ..Default::default() }
        }

        /// 列出股票对时返回错误
        pub fn failing_listing(mut self) -> Self {
            self.fail_listing = true;
            self
        }
    }

    #[async_trait]
    impl PairCatalog for MemoryCatalog {
        async fn list_pairs(&self) -> Result<Vec<StockPair>, CatalogError> {
            if self.fail_listing {
                return Err(CatalogError::Unavailable);
            }
            Ok(self.pairs.clone())
        }

        async fn find_pair_by_name(&self, name: &str) -> Result<StockPair, CatalogError> {
            self.pairs
                .iter()
                .find(|p| p.stock_name == name)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(name.to_string()))
        }
    }

    #[async_trait]
    impl WatchlistStore for MemoryCatalog {
        async fn list_entries(&self) -> Result<Vec<WatchlistEntry>, CatalogError> {
            Ok(self.entries.read().await.clone())
        }

        async fn find_entry(&self, id: i64) -> Result<WatchlistEntry, CatalogError> {
            self.entries
                .read()
                .await
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))
        }

        async fn create_entry(&self, name: &str, code: &str) -> Result<WatchlistEntry, CatalogError> {
            let entry = WatchlistEntry {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                custom_name: name.to_string(),
                custom_code: code.to_string(),
                created_at: None,
                updated_at: None,
            };
            self.entries.write().await.push(entry.clone());
            Ok(entry)
        }

        async fn update_entry(&self, id: i64, name: &str, code: &str) -> Result<WatchlistEntry, CatalogError> {
            let mut entries = self.entries.write().await;
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
            entry.custom_name = name.to_string();
            entry.custom_code = code.to_string();
            Ok(entry.clone())
        }

        async fn delete_entry(&self, id: i64) -> Result<(), CatalogError> {
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|e| e.id != id);
            if entries.len() == before {
                return Err(CatalogError::NotFound(id.to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let catalog = EmptyCatalog;
        assert!(catalog.list_pairs().await.unwrap().is_empty());
        assert!(matches!(
            catalog.find_pair_by_name("一拖股份").await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.create_entry("一拖股份", "sh601038").await,
            Err(CatalogError::Unavailable)
        ));
        assert!(matches!(catalog.find_entry(1).await, Err(CatalogError::NotFound(_))));
        assert!(matches!(
            catalog.update_entry(1, "一拖股份", "sh601038").await,
            Err(CatalogError::NotFound(_))
        ));
    }
}
