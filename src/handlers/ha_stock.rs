//! H-A 股票对接口
//!
//! ## API 列表
//! - GET /ha-stocks - 全部股票对（缓存）
//! - GET /ha-stocks/realtime - 全部股票对（实时，不走缓存）
//! - GET /ha-stocks/by-name?name= - 单个股票对（缓存）
//! - GET /ha-stocks/by-name/realtime?name= - 单个股票对（实时）
//! - POST /ha-stocks/refresh[?force=false] - 刷新缓存
//! - DELETE /ha-stocks/cache[?name=] - 清除缓存
//! - GET /pairs - 目录中的股票对（不含行情）
//! - GET /pairs/by-name?name= - 按名称查找股票对（不含行情）

use actix_web::{web, HttpResponse, Result};

use super::{error_response, AppState};
use crate::models::{ApiResponse, PairQuery, RefreshQuery};

fn missing_name() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::error("缺少参数 name".to_string()))
}

fn required_name(query: &PairQuery) -> Option<&str> {
    query.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
}

pub async fn list_pairs(state: web::Data<AppState>) -> Result<HttpResponse> {
    let cancel = state.request_token();
    match state.ha_stocks.all_paired_quotes(&cancel).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn list_pairs_realtime(state: web::Data<AppState>) -> Result<HttpResponse> {
    let cancel = state.request_token();
    match state.ha_stocks.all_paired_quotes_realtime(&cancel).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn get_pair(state: web::Data<AppState>, query: web::Query<PairQuery>) -> Result<HttpResponse> {
    let Some(name) = required_name(&query) else {
        return Ok(missing_name());
    };

    let cancel = state.request_token();
    match state.ha_stocks.paired_quote_by_name(name, &cancel).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn get_pair_realtime(state: web::Data<AppState>, query: web::Query<PairQuery>) -> Result<HttpResponse> {
    let Some(name) = required_name(&query) else {
        return Ok(missing_name());
    };

    let cancel = state.request_token();
    match state.ha_stocks.paired_quote_by_name_realtime(name, &cancel).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(error_response(e)),
    }
}

/// 强制刷新先清空缓存；`force=false` 时走普通刷新
pub async fn refresh(state: web::Data<AppState>, query: web::Query<RefreshQuery>) -> Result<HttpResponse> {
    let cancel = state.request_token();

    let result = if query.force.unwrap_or(true) {
        match state.ha_stocks.clear_all_cache().await {
            Ok(()) => state.ha_stocks.force_refresh_all(&cancel).await,
            Err(e) => Err(e),
        }
    } else {
        state.ha_stocks.refresh_all(&cancel).await
    };

    match result {
        Ok(data) => {
            let message = format!("已刷新 {} 个股票对", data.len());
            Ok(HttpResponse::Ok().json(ApiResponse::with_message(data, &message)))
        }
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn clear_cache(state: web::Data<AppState>, query: web::Query<PairQuery>) -> Result<HttpResponse> {
    let result = match required_name(&query) {
        Some(name) => state.ha_stocks.clear_cache(name).await,
        None => state.ha_stocks.clear_all_cache().await,
    };

    match result {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::with_message((), "缓存已清除"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn catalog_pairs(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.ha_stocks.list_pairs().await {
        Ok(pairs) => Ok(HttpResponse::Ok().json(ApiResponse::success(pairs))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn catalog_pair(state: web::Data<AppState>, query: web::Query<PairQuery>) -> Result<HttpResponse> {
    let Some(name) = required_name(&query) else {
        return Ok(missing_name());
    };

    match state.ha_stocks.find_pair(name).await {
        Ok(pair) => Ok(HttpResponse::Ok().json(ApiResponse::success(pair))),
        Err(e) => Ok(error_response(e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pairs")
            .route("", web::get().to(catalog_pairs))
            .route("/by-name", web::get().to(catalog_pair)),
    );
    cfg.service(
        web::scope("/ha-stocks")
            .route("", web::get().to(list_pairs))
            .route("/realtime", web::get().to(list_pairs_realtime))
            .route("/by-name", web::get().to(get_pair))
            .route("/by-name/realtime", web::get().to(get_pair_realtime))
            .route("/refresh", web::post().to(refresh))
            .route("/cache", web::delete().to(clear_cache)),
    );
}
