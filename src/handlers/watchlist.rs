//! 自选股接口
//!
//! - GET /watchlist - 自选股及实时行情
//! - POST /watchlist - 新增自选股
//! - GET /watchlist/{id} - 单个自选股及实时行情
//! - PUT /watchlist/{id} - 修改名称和代码
//! - DELETE /watchlist/{id} - 删除自选股

use actix_web::{web, HttpResponse, Result};

use super::{error_response, AppState};
use crate::models::{ApiResponse, NewWatchlistEntry};

pub async fn list_entries(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.watchlist.list_with_quotes().await {
        Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(items))),
        Err(e) => Ok(error_response(e)),
    }
}

fn empty_name() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::error("名称不能为空".to_string()))
}

pub async fn get_entry(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    match state.watchlist.get(path.into_inner()).await {
        Ok(item) => Ok(HttpResponse::Ok().json(ApiResponse::success(item))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn create_entry(
    state: web::Data<AppState>,
    body: web::Json<NewWatchlistEntry>,
) -> Result<HttpResponse> {
    if body.custom_name.trim().is_empty() {
        return Ok(empty_name());
    }

    match state.watchlist.create(&body.custom_name, &body.custom_code).await {
        Ok(entry) => Ok(HttpResponse::Created().json(ApiResponse::success(entry))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn update_entry(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<NewWatchlistEntry>,
) -> Result<HttpResponse> {
    if body.custom_name.trim().is_empty() {
        return Ok(empty_name());
    }

    match state
        .watchlist
        .update(path.into_inner(), &body.custom_name, &body.custom_code)
        .await
    {
        Ok(entry) => Ok(HttpResponse::Ok().json(ApiResponse::with_message(entry, "更新成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub async fn delete_entry(state: web::Data<AppState>, path: web::Path<i64>) -> Result<HttpResponse> {
    match state.watchlist.delete(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::with_message((), "删除成功"))),
        Err(e) => Ok(error_response(e)),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/watchlist")
            .route("", web::get().to(list_entries))
            .route("", web::post().to(create_entry))
            .route("/{id}", web::get().to(get_entry))
            .route("/{id}", web::put().to(update_entry))
            .route("/{id}", web::delete().to(delete_entry)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::test_state;
    use crate::models::{Vendor, WatchlistEntry};
    use crate::services::quote_service::tests::ScriptedSource;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_watchlist_lifecycle() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Vec::new(), ScriptedSource::new(Vendor::Sina)))
                .configure(crate::handlers::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/watchlist")
            .set_json(serde_json::json!({ "custom_name": "一拖股份", "custom_code": "sh601038" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: ApiResponse<WatchlistEntry> = test::read_body_json(resp).await;
        let id = body.data.map(|e| e.id).unwrap();

        let req = test::TestRequest::get().uri("/api/v1/watchlist").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["custom_code"], "sh601038");
        assert_eq!(body["data"][0]["quote"]["code"], "sh601038");

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/watchlist/{}", id))
            .set_json(serde_json::json!({ "custom_name": "一拖H", "custom_code": "hk00038" }))
            .to_request();
        let body: ApiResponse<WatchlistEntry> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.data.map(|e| e.custom_code), Some("hk00038".to_string()));

        let req = test::TestRequest::get().uri(&format!("/api/v1/watchlist/{}", id)).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["custom_name"], "一拖H");
        assert_eq!(body["data"]["quote"]["code"], "hk00038");

        let req = test::TestRequest::delete().uri(&format!("/api/v1/watchlist/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get().uri(&format!("/api/v1/watchlist/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/watchlist/{}", id))
            .set_json(serde_json::json!({ "custom_name": "一拖股份", "custom_code": "sh601038" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);

        let req = test::TestRequest::delete().uri(&format!("/api/v1/watchlist/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn test_create_rejects_bad_input() {
        let app = test::init_service(
            App::new()
                .app_data(test_state(Vec::new(), ScriptedSource::new(Vendor::Sina)))
                .configure(crate::handlers::config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/watchlist")
            .set_json(serde_json::json!({ "custom_name": "", "custom_code": "sh601038" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::post()
            .uri("/api/v1/watchlist")
            .set_json(serde_json::json!({ "custom_name": "坏代码", "custom_code": "601038" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::put()
            .uri("/api/v1/watchlist/1")
            .set_json(serde_json::json!({ "custom_name": " ", "custom_code": "sh601038" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::get().uri("/api/v1/watchlist/abc").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }
}
