use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
};
use chrono::Utc;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "time": Utc::now().to_rfc3339(),
        "store": services.store_kind,
    }))
}

pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "partforge",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn not_found(method: Method, uri: Uri) -> axum::response::Response {
    errors::json_error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        format!("no route for {method} {}", uri.path()),
    )
}
