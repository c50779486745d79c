//! 单只/批量行情接口
//!
//! - GET /quotes?codes=sh601038,hk00038 - 批量行情，无效或失败的代码跳过
//! - GET /quotes/{code}[?vendor=tencent&realtime=true] - 单只行情
//! - GET /quotes/{code}/check - 校验代码格式
//! - GET /vendors - 数据源及支持的地区

use actix_web::{web, HttpResponse, Result};

use super::{error_response, AppState};
use crate::error::QuoteError;
use crate::models::{ApiResponse, CodeCheck, QuoteQuery, QuotesQuery, Vendor, VendorInfo};
use crate::services::stock::{code, FetchMode};

fn fetch_mode(realtime: bool) -> FetchMode {
    if realtime {
        FetchMode::RealTime
    } else {
        FetchMode::Standard
    }
}

pub async fn get_quote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<QuoteQuery>,
) -> Result<HttpResponse> {
    let raw_code = path.into_inner();
    let mode = fetch_mode(query.realtime);

    let result = match query.vendor.as_deref() {
        Some(name) => match code::vendor_by_name(name) {
            Ok(vendor) => state.quotes.get_quote_from(&raw_code, vendor, mode).await,
            Err(e) => Err(QuoteError::from(e)),
        },
        None => state.quotes.get_quote(&raw_code, mode).await,
    };

    match result {
        Ok(quote) => Ok(HttpResponse::Ok().json(ApiResponse::success(quote))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn get_quotes(state: web::Data<AppState>, query: web::Query<QuotesQuery>) -> Result<HttpResponse> {
    let codes: Vec<String> = query
        .codes
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();

    let quotes = state.quotes.get_many_quotes(&codes, FetchMode::Standard).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(quotes)))
}

pub async fn check_code(path: web::Path<String>) -> Result<HttpResponse> {
    let code = path.into_inner();
    let valid = code::is_valid(&code);
    Ok(HttpResponse::Ok().json(ApiResponse::success(CodeCheck { code, valid })))
}

pub async fn list_vendors(state: web::Data<AppState>) -> Result<HttpResponse> {
    let vendors: Vec<VendorInfo> = [Vendor::Sina, Vendor::Tencent]
        .into_iter()
        .filter(|vendor| state.sources.get(*vendor).is_some())
        .map(|vendor| VendorInfo {
            vendor,
            regions: code::supported_regions(vendor),
        })
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(vendors)))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/vendors", web::get().to(list_vendors)).service(
        web::scope("/quotes")
            .route("", web::get().to(get_quotes))
            .route("/{code}", web::get().to(get_quote))
            .route("/{code}/check", web::get().to(check_code)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::test_state;
    use crate::models::Quote;
    use crate::services::quote_service::tests::ScriptedSource;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_quote_routes() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Vec::new(), ScriptedSource::new(Vendor::Sina)))
                .configure(crate::handlers::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/quotes/HK00038").to_request();
        let body: ApiResponse<Quote> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.data.map(|q| q.code), Some("hk00038".to_string()));

        let req = test::TestRequest::get()
            .uri("/api/v1/quotes/hk00038?vendor=tencent&realtime=true")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri("/api/v1/quotes/601038").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::get().uri("/api/v1/quotes/sh601038?vendor=eastmoney").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::get()
            .uri("/api/v1/quotes?codes=sh601038,bad,hk00038")
            .to_request();
        let body: ApiResponse<Vec<Quote>> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.data.map(|q| q.len()), Some(2));
    }

    #[actix_web::test]
    async fn test_check_and_vendors() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Vec::new(), ScriptedSource::new(Vendor::Sina)))
                .configure(crate::handlers::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/quotes/sz000001/check").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["valid"], true);

        let req = test::TestRequest::get().uri("/api/v1/vendors").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["vendor"], "sina");
        assert_eq!(body["data"][1]["regions"], serde_json::json!(["sh", "sz", "hk"]));
    }
}
