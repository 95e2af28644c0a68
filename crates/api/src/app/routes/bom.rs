use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    response::IntoResponse,
    routing::get,
};
use serde_json::Value as JsonValue;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:parent_code", get(get_bom).put(replace_bom))
}

pub async fn replace_bom(
    Extension(services): Extension<Arc<AppServices>>,
    Path(parent_code): Path<String>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> axum::response::Response {
    let parent_code = match dto::path_code(&parent_code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let components = match dto::json_body(body)
        .and_then(|b| dto::bom_components(&b).map_err(errors::domain_error_to_response))
    {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.boms.replace_bom(&parent_code, &components).await {
        Ok(count) => Json(serde_json::json!({
            "parent_code": parent_code,
            "count": count,
        }))
        .into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn get_bom(
    Extension(services): Extension<Arc<AppServices>>,
    Path(parent_code): Path<String>,
) -> axum::response::Response {
    let parent_code = match dto::path_code(&parent_code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.boms.get_bom(&parent_code).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
