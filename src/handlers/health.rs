use actix_web::{web, HttpResponse, Result};

use super::AppState;
use crate::models::ApiResponse;

/// 健康检查，附带已注册的数据源
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut vendors: Vec<&str> = state.sources.vendors().iter().map(|v| v.as_str()).collect();
    vendors.sort_unstable();
    let response = ApiResponse::with_message(vendors, "Service is healthy");
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
