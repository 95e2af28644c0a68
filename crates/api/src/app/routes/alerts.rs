use std::sync::Arc;

use axum::{Json, Router, extract::Extension, response::IntoResponse, routing::post};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/low-stock/scan", post(scan_low_stock))
}

/// Run one low-stock scan now, outside the periodic schedule.
pub async fn scan_low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.scanner.scan().await {
        Ok(outcome) => Json(serde_json::json!({
            "ok": true,
            "changed": outcome.changed,
            "count": outcome.count,
            "notified": outcome.notified,
            "notify_error": outcome.notify_error,
        }))
        .into_response(),
        Err(e) => errors::scan_error_to_response(e),
    }
}
