//! 自选股服务
//!
//! 自选股条目存放在目录库，查询时附带实时行情。

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{WatchlistEntry, WatchlistQuote};
use crate::services::catalog::WatchlistStore;
use crate::services::quote_service::QuoteService;
use crate::services::stock::{code, FetchMode};

pub struct WatchlistService {
    store: Arc<dyn WatchlistStore>,
    quotes: Arc<QuoteService>,
}

impl WatchlistService {
    pub fn new(store: Arc<dyn WatchlistStore>, quotes: Arc<QuoteService>) -> Self {
        Self { store, quotes }
    }

    /// 列出全部自选股及其实时行情
    ///
    /// 行情批量获取，单只获取失败时该条目的 `quote` 为空。
    pub async fn list_with_quotes(&self) -> Result<Vec<WatchlistQuote>> {
        let entries = self.store.list_entries().await?;
        let codes: Vec<String> = entries.iter().map(|e| e.custom_code.clone()).collect();

        let mut by_code: HashMap<String, _> = self
            .quotes
            .get_many_quotes(&codes, FetchMode::RealTime)
            .await
            .into_iter()
            .map(|q| (q.code.clone(), q))
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| {
                // 数据源返回的代码已统一为小写
                let quote = by_code.remove(&entry.custom_code.to_lowercase());
                WatchlistQuote { entry, quote }
            })
            .collect())
    }

    /// 单个自选股及其实时行情，行情获取失败时 `quote` 为空
    pub async fn get(&self, id: i64) -> Result<WatchlistQuote> {
        let entry = self.store.find_entry(id).await?;
        let quote = match self.quotes.get_quote(&entry.custom_code, FetchMode::RealTime).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                log::debug!("自选股 {} 行情获取失败: {}", entry.custom_code, e);
                None
            }
        };
        Ok(WatchlistQuote { entry, quote })
    }

    /// 规范化代码并确认能取到行情
    async fn validated_code(&self, raw_code: &str) -> Result<String> {
        let normalized = code::parse(raw_code)?.to_string();
        self.quotes.get_quote(&normalized, FetchMode::Standard).await?;
        Ok(normalized)
    }

    /// 新增自选股，先确认代码能取到行情
    pub async fn create(&self, name: &str, raw_code: &str) -> Result<WatchlistEntry> {
        let normalized = self.validated_code(raw_code).await?;

        let entry = self.store.create_entry(name.trim(), &normalized).await?;
        log::info!("新增自选股 {}({})", entry.custom_name, entry.custom_code);
        Ok(entry)
    }

    /// 修改名称和代码，新代码同样需要能取到行情
    pub async fn update(&self, id: i64, name: &str, raw_code: &str) -> Result<WatchlistEntry> {
        let normalized = self.validated_code(raw_code).await?;

        let entry = self.store.update_entry(id, name.trim(), &normalized).await?;
        log::info!("更新自选股 {}: {}({})", id, entry.custom_name, entry.custom_code);
        Ok(entry)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete_entry(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, QuoteError};
    use crate::models::Vendor;
    use crate::services::catalog::tests::MemoryCatalog;
    use crate::services::quote_service::tests::ScriptedSource;
    use crate::services::stock::SourceRegistry;

    fn service(sina: ScriptedSource) -> (WatchlistService, Arc<MemoryCatalog>) {
        let registry = SourceRegistry::new()
            .with_source(Arc::new(sina))
            .with_source(Arc::new(ScriptedSource::new(Vendor::Tencent)));
        let catalog = Arc::new(MemoryCatalog::default());
        let svc = WatchlistService::new(catalog.clone(), Arc::new(QuoteService::new(registry)));
        (svc, catalog)
    }

    #[tokio::test]
    async fn test_create_normalizes_and_validates() {
        let (svc, catalog) = service(ScriptedSource::new(Vendor::Sina));

        let entry = svc.create(" 一拖股份 ", "SH601038").await.unwrap();
        assert_eq!(entry.custom_name, "一拖股份");
        assert_eq!(entry.custom_code, "sh601038");
        assert_eq!(catalog.list_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_code() {
        let (svc, catalog) = service(ScriptedSource::new(Vendor::Sina).failing("sh600000"));

        assert!(matches!(svc.create("浦发", "601038").await, Err(QuoteError::Code(_))));
        assert!(matches!(svc.create("浦发", "sh600000").await, Err(QuoteError::Fetch(_))));
        assert!(catalog.list_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_attaches_quotes() {
        let (svc, _) = service(ScriptedSource::new(Vendor::Sina).failing("sz000001"));
        svc.create("一拖股份", "sh601038").await.unwrap();
        svc.create("一拖H", "hk00038").await.unwrap();
        svc.store.create_entry("平安银行", "sz000001").await.unwrap();

        let items = svc.list_with_quotes().await.unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].quote.as_ref().map(|q| q.code.as_str()), Some("sh601038"));
        assert_eq!(items[1].quote.as_ref().map(|q| q.code.as_str()), Some("hk00038"));
        assert!(items[2].quote.is_none());
    }

    #[tokio::test]
    async fn test_get_attaches_quote() {
        let (svc, _) = service(ScriptedSource::new(Vendor::Sina).failing("sz000001"));
        let entry = svc.create("一拖股份", "sh601038").await.unwrap();
        let broken = svc.store.create_entry("平安银行", "sz000001").await.unwrap();

        let item = svc.get(entry.id).await.unwrap();
        assert_eq!(item.entry.custom_name, "一拖股份");
        assert_eq!(item.quote.map(|q| q.code), Some("sh601038".to_string()));

        assert!(svc.get(broken.id).await.unwrap().quote.is_none());
        assert!(matches!(
            svc.get(broken.id + 100).await,
            Err(QuoteError::Catalog(CatalogError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_revalidates_code() {
        let (svc, catalog) = service(ScriptedSource::new(Vendor::Sina).failing("sh600000"));
        let entry = svc.create("一拖股份", "sh601038").await.unwrap();

        let updated = svc.update(entry.id, " 一拖H ", "HK00038").await.unwrap();
        assert_eq!(updated.id, entry.id);
        assert_eq!(updated.custom_name, "一拖H");
        assert_eq!(updated.custom_code, "hk00038");

        assert!(matches!(svc.update(entry.id, "浦发", "sh600000").await, Err(QuoteError::Fetch(_))));
        assert!(matches!(svc.update(entry.id, "浦发", "600000").await, Err(QuoteError::Code(_))));
        assert_eq!(catalog.find_entry(entry.id).await.unwrap().custom_code, "hk00038");

        assert!(matches!(
            svc.update(entry.id + 100, "一拖股份", "sh601038").await,
            Err(QuoteError::Catalog(CatalogError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_entry() {
        let (svc, _) = service(ScriptedSource::new(Vendor::Sina));
        let entry = svc.create("一拖股份", "sh601038").await.unwrap();

        svc.delete(entry.id).await.unwrap();
        assert!(matches!(
            svc.delete(entry.id).await,
            Err(QuoteError::Catalog(CatalogError::NotFound(_)))
        ));
    }
}
