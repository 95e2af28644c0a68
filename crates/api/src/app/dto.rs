use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use partforge_core::{DomainError, DomainResult, PartCode, coerce};
use partforge_inventory::{BomLineInput, NewPart, PartPatch};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------
//
// Numeric fields stay raw JSON so `3`, `3.0` and `"3"` are all accepted and
// anything else is reported against the exact field.

#[derive(Debug, Deserialize)]
pub struct CreatePartRequest {
    #[serde(default)]
    pub code: JsonValue,
    #[serde(default)]
    pub name: JsonValue,
    #[serde(default)]
    pub quantity: JsonValue,
    #[serde(default)]
    pub min_quantity: JsonValue,
}

impl CreatePartRequest {
    pub fn into_new_part(self) -> DomainResult<NewPart> {
        let code = PartCode::new(coerce::required_str("code", &self.code)?)?;
        let name = coerce::required_str("name", &self.name)?;
        NewPart::new(
            code,
            name,
            coerce::optional_int("quantity", &self.quantity)?,
            coerce::optional_int("min_quantity", &self.min_quantity)?,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePartRequest {
    #[serde(default)]
    pub quantity_delta: JsonValue,
    #[serde(default)]
    pub quantity: JsonValue,
    #[serde(default)]
    pub min_quantity: JsonValue,
}

impl UpdatePartRequest {
    pub fn into_patch(self) -> DomainResult<PartPatch> {
        PartPatch::new(
            coerce::optional_int("quantity_delta", &self.quantity_delta)?,
            coerce::optional_int("quantity", &self.quantity)?,
            coerce::optional_int("min_quantity", &self.min_quantity)?,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub quantity: JsonValue,
}

impl BuildRequest {
    pub fn quantity(&self) -> DomainResult<i64> {
        coerce::int("quantity", &self.quantity)
    }
}

/// Component list for `PUT /bom/{parent_code}`.
///
/// Accepts either a bare array or `{"components": [...]}`.
pub fn bom_components(body: &JsonValue) -> DomainResult<Vec<BomLineInput>> {
    let list = match body {
        JsonValue::Array(items) => items,
        JsonValue::Object(map) => match map.get("components") {
            Some(JsonValue::Array(items)) => items,
            _ => return Err(DomainError::validation("components", "must be a list")),
        },
        _ => return Err(DomainError::validation("components", "must be a list")),
    };
    Ok(list.iter().map(BomLineInput::from_json).collect())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPartsQuery {
    pub below_min: Option<String>,
}

impl ListPartsQuery {
    pub fn below_min(&self) -> DomainResult<Option<bool>> {
        match self.below_min.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(Some(true)),
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(Some(false)),
            Some(_) => Err(DomainError::validation("below_min", "must be true or false")),
        }
    }
}

// -------------------------
// Extractor helpers
// -------------------------

pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(v)| v).map_err(|e| {
        errors::json_error_with(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            e.body_text(),
            serde_json::json!({ "field": "body" }),
        )
    })
}

pub fn query<T>(q: Result<Query<T>, QueryRejection>) -> Result<T, axum::response::Response> {
    q.map(|Query(v)| v).map_err(|e| {
        errors::json_error_with(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            e.body_text(),
            serde_json::json!({ "field": "query" }),
        )
    })
}

pub fn path_code(raw: &str) -> Result<PartCode, axum::response::Response> {
    PartCode::new(raw).map_err(errors::domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: JsonValue) -> DomainResult<NewPart> {
        serde_json::from_value::<CreatePartRequest>(body).unwrap().into_new_part()
    }

    #[test]
    fn create_request_coerces_numbers() {
        let part = create(json!({"code": " BRACKET ", "name": "Bracket", "quantity": "5", "min_quantity": 10.0}))
            .unwrap();
        assert_eq!(part.code().as_str(), "BRACKET");
    }

    #[test]
    fn create_request_names_bad_fields() {
        assert_eq!(create(json!({"name": "x"})).unwrap_err().field(), "code");
        assert_eq!(create(json!({"code": "A"})).unwrap_err().field(), "name");
        assert_eq!(
            create(json!({"code": "A", "name": "x", "quantity": "lots"})).unwrap_err().field(),
            "quantity"
        );
        assert_eq!(
            create(json!({"code": "A", "name": "x", "min_quantity": -1})).unwrap_err().field(),
            "min_quantity"
        );
    }

    #[test]
    fn bom_body_shapes() {
        let lines = bom_components(&json!([{"component_code": "A", "units_per_parent": 1}])).unwrap();
        assert_eq!(lines.len(), 1);
        let lines = bom_components(&json!({"components": []})).unwrap();
        assert!(lines.is_empty());
        assert_eq!(bom_components(&json!("nope")).unwrap_err().field(), "components");
    }

    #[test]
    fn below_min_parsing() {
        let q = |v: Option<&str>| ListPartsQuery {
            below_min: v.map(str::to_string),
        };
        assert_eq!(q(None).below_min().unwrap(), None);
        assert_eq!(q(Some("TRUE")).below_min().unwrap(), Some(true));
        assert_eq!(q(Some("0")).below_min().unwrap(), Some(false));
        assert!(q(Some("maybe")).below_min().is_err());
    }
}
