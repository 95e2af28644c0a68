//! Bill-of-materials rows and their validation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use partforge_core::{DomainError, DomainResult, PartCode, coerce};

/// One stored BOM row: `units_per_parent` of `component_code` per unit of `parent_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomEntry {
    pub parent_code: PartCode,
    pub component_code: PartCode,
    pub units_per_parent: i64,
}

/// A validated component line, not yet bound to a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BomLine {
    pub component_code: PartCode,
    pub units_per_parent: i64,
}

impl BomLine {
    pub fn into_entry(self, parent_code: &PartCode) -> BomEntry {
        BomEntry {
            parent_code: parent_code.clone(),
            component_code: self.component_code,
            units_per_parent: self.units_per_parent,
        }
    }
}

/// Unvalidated component line as supplied by a caller.
///
/// Values are kept as raw JSON so that `"2"`, `2.0` and `2` are all accepted
/// and anything else is reported against the exact field.
#[derive(Debug, Clone, PartialEq)]
pub struct BomLineInput {
    pub component_code: JsonValue,
    pub units_per_parent: JsonValue,
}

impl BomLineInput {
    pub fn new(component_code: impl Into<String>, units_per_parent: i64) -> Self {
        Self {
            component_code: JsonValue::String(component_code.into()),
            units_per_parent: JsonValue::from(units_per_parent),
        }
    }

    /// Read a line from an arbitrary JSON value; non-objects yield empty fields.
    pub fn from_json(value: &JsonValue) -> Self {
        let field = |name: &str| value.get(name).cloned().unwrap_or(JsonValue::Null);
        Self {
            component_code: field("component_code"),
            units_per_parent: field("units_per_parent"),
        }
    }
}

/// Validate a full component list for `parent_code`.
///
/// Runs before any store mutation. Rejects an empty list, blank or non-string
/// component codes, non-integer or non-positive `units_per_parent`, a component
/// equal to its parent, and a component listed twice.
pub fn validate_components(
    parent_code: &PartCode,
    inputs: &[BomLineInput],
) -> DomainResult<Vec<BomLine>> {
    if inputs.is_empty() {
        return Err(DomainError::validation(
            "components",
            "must contain at least one component",
        ));
    }

    let mut seen = BTreeSet::new();
    let mut lines = Vec::with_capacity(inputs.len());

    for (idx, input) in inputs.iter().enumerate() {
        let code_field = format!("components[{idx}].component_code");
        let units_field = format!("components[{idx}].units_per_parent");

        let raw_code = coerce::required_str(&code_field, &input.component_code)?;
        let component_code = PartCode::for_field(&code_field, raw_code)?;
        let units = coerce::positive(&units_field, coerce::int(&units_field, &input.units_per_parent)?)?;

        if &component_code == parent_code {
            return Err(DomainError::validation(
                code_field,
                "a part cannot be a component of itself",
            ));
        }
        if !seen.insert(component_code.clone()) {
            return Err(DomainError::validation(
                code_field,
                format!("duplicate component {component_code}"),
            ));
        }

        lines.push(BomLine {
            component_code,
            units_per_parent: units,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chair() -> PartCode {
        PartCode::new("CHAIR").unwrap()
    }

    #[test]
    fn valid_list_keeps_order() {
        let lines = validate_components(
            &chair(),
            &[BomLineInput::new("SCREW-10MM", 8), BomLineInput::new("BRACKET", 2)],
        )
        .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].component_code.as_str(), "SCREW-10MM");
        assert_eq!(lines[1].units_per_parent, 2);
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = validate_components(&chair(), &[]).unwrap_err();
        assert_eq!(err.field(), "components");
    }

    #[test]
    fn coercible_units_are_accepted() {
        let inputs = vec![
            BomLineInput::from_json(&json!({"component_code": "A", "units_per_parent": "3"})),
            BomLineInput::from_json(&json!({"component_code": "B", "units_per_parent": 2.0})),
        ];
        let lines = validate_components(&chair(), &inputs).unwrap();
        assert_eq!(lines[0].units_per_parent, 3);
        assert_eq!(lines[1].units_per_parent, 2);
    }

    #[test]
    fn offending_field_is_named() {
        let cases = [
            (json!({"component_code": "A", "units_per_parent": 0}), "components[1].units_per_parent"),
            (json!({"component_code": "A", "units_per_parent": 1.5}), "components[1].units_per_parent"),
            (json!({"component_code": "A"}), "components[1].units_per_parent"),
            (json!({"component_code": "", "units_per_parent": 1}), "components[1].component_code"),
            (json!({"component_code": 42, "units_per_parent": 1}), "components[1].component_code"),
            (json!("not an object"), "components[1].component_code"),
        ];

        for (bad, field) in cases {
            let inputs = vec![BomLineInput::new("OK", 1), BomLineInput::from_json(&bad)];
            let err = validate_components(&chair(), &inputs).unwrap_err();
            assert_eq!(err.field(), field, "input {bad}");
        }
    }

    #[test]
    fn self_reference_and_duplicates_are_rejected() {
        let err = validate_components(&chair(), &[BomLineInput::new("CHAIR", 1)]).unwrap_err();
        assert_eq!(err.field(), "components[0].component_code");

        let err = validate_components(
            &chair(),
            &[BomLineInput::new("A", 1), BomLineInput::new("A", 2)],
        )
        .unwrap_err();
        assert_eq!(err.field(), "components[1].component_code");
    }

    #[test]
    fn lines_bind_to_parent() {
        let line = BomLine {
            component_code: PartCode::new("A").unwrap(),
            units_per_parent: 4,
        };
        let entry = line.into_entry(&chair());
        assert_eq!(entry.parent_code, chair());
        assert_eq!(entry.units_per_parent, 4);
    }
}
