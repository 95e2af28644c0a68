use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use partforge_core::DomainError;
use partforge_infra::alerts::ScanError;
use partforge_infra::services::InventoryError;

pub fn inventory_error_to_response(err: InventoryError) -> axum::response::Response {
    let code = err.code();
    let message = err.to_string();
    match err {
        InventoryError::Validation { field, .. } => {
            json_error_with(StatusCode::BAD_REQUEST, code, message, json!({ "field": field }))
        }
        InventoryError::NoBomDefined { parent_code } => json_error_with(
            StatusCode::BAD_REQUEST,
            code,
            message,
            json!({ "parent_code": parent_code }),
        ),
        InventoryError::TransactionTooLarge { limit, actual } => json_error_with(
            StatusCode::BAD_REQUEST,
            code,
            message,
            json!({ "limit": limit, "actual": actual }),
        ),
        InventoryError::InsufficientStock { missing } => {
            json_error_with(StatusCode::CONFLICT, code, message, json!({ "missing": missing }))
        }
        InventoryError::BuildConflict { parent_code } => json_error_with(
            StatusCode::CONFLICT,
            code,
            message,
            json!({ "parent_code": parent_code }),
        ),
        InventoryError::UpdateConflict { code: part_code } => {
            json_error_with(StatusCode::CONFLICT, code, message, json!({ "code": part_code }))
        }
        InventoryError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, code, message),
        InventoryError::AlreadyExists { .. } => json_error(StatusCode::CONFLICT, code, message),
        InventoryError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    inventory_error_to_response(err.into())
}

pub fn scan_error_to_response(err: ScanError) -> axum::response::Response {
    tracing::error!(error = %err, "low-stock scan failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Error body with extra structured fields merged next to `error` and `message`.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    extra: serde_json::Value,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), serde_json::Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    (status, axum::Json(body)).into_response()
}
