pub mod ha_stock;
pub mod health;
pub mod quotes;
pub mod watchlist;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, QuoteError};
use crate::models::ApiResponse;
use crate::services::ha_stock_service::HaStockService;
use crate::services::quote_service::QuoteService;
use crate::services::stock::SourceRegistry;
use crate::services::watchlist_service::WatchlistService;

/// 各处理器共享的服务
pub struct AppState {
    pub quotes: Arc<QuoteService>,
    pub ha_stocks: HaStockService,
    pub watchlist: WatchlistService,
    pub sources: SourceRegistry,
    /// 服务关闭时取消，每个请求使用它的子令牌
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

/// 错误 -> HTTP 状态码
pub fn status_for(err: &QuoteError) -> StatusCode {
    match err {
        QuoteError::Code(_) => StatusCode::BAD_REQUEST,
        QuoteError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
        QuoteError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: QuoteError) -> HttpResponse {
    let status = status_for(&err);
    if status.is_server_error() {
        log::error!("{}", err);
    }
    HttpResponse::build(status).json(ApiResponse::<()>::error(err.to_string()))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(ha_stock::config)
            .configure(quotes::config)
            .configure(watchlist::config),
    );
}
