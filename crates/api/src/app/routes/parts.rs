use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_parts).post(create_part))
        .route("/:code", get(get_part).patch(update_part))
}

pub async fn create_part(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreatePartRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let new_part = match body.into_new_part() {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.parts.create(new_part).await {
        Ok(part) => (StatusCode::CREATED, Json(part)).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn list_parts(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ListPartsQuery>, QueryRejection>,
) -> axum::response::Response {
    let query = match dto::query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let below_min = match query.below_min() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.parts.list(below_min).await {
        Ok(parts) => Json(parts).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn get_part(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    let code = match dto::path_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.parts.get(&code).await {
        Ok(part) => Json(part).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}

pub async fn update_part(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
    body: Result<Json<dto::UpdatePartRequest>, JsonRejection>,
) -> axum::response::Response {
    let code = match dto::path_code(&code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let patch = match dto::json_body(body).and_then(|b| {
        b.into_patch().map_err(errors::domain_error_to_response)
    }) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.parts.update(&code, patch).await {
        Ok(part) => Json(part).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
