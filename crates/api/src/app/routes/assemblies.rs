use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    response::IntoResponse,
    routing::post,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:parent_code/build", post(build_assembly))
}

pub async fn build_assembly(
    Extension(services): Extension<Arc<AppServices>>,
    Path(parent_code): Path<String>,
    body: Result<Json<dto::BuildRequest>, JsonRejection>,
) -> axum::response::Response {
    let parent_code = match dto::path_code(&parent_code) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let quantity = match dto::json_body(body)
        .and_then(|b| b.quantity().map_err(errors::domain_error_to_response))
    {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.builds.build(&parent_code, quantity).await {
        Ok(parent) => Json(parent).into_response(),
        Err(e) => errors::inventory_error_to_response(e),
    }
}
