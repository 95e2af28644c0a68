//! Coercion of loosely-typed request values into validated domain values.
//!
//! Quantities arrive from JSON bodies that may carry `3`, `3.0` or `"3"` for the
//! same integer. All of those are accepted; fractional values, booleans,
//! objects and unparsable strings are rejected with a `Validation` error naming
//! the field.

use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// Coerce a required integer field.
pub fn int(field: &str, value: &Value) -> DomainResult<i64> {
    match value {
        Value::Null => Err(DomainError::validation(field, "is required")),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if n.as_u64().is_some() {
                return Err(DomainError::validation(field, "is out of range"));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => {
                    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
                        Err(DomainError::validation(field, "is out of range"))
                    } else {
                        Ok(f as i64)
                    }
                }
                _ => Err(DomainError::validation(field, "must be an integer")),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| DomainError::validation(field, "must be an integer")),
        _ => Err(DomainError::validation(field, "must be an integer")),
    }
}

/// Coerce an optional integer field (`null` / absent means `None`).
pub fn optional_int(field: &str, value: &Value) -> DomainResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        other => int(field, other).map(Some),
    }
}

/// Require a strictly positive integer.
pub fn positive(field: &str, value: i64) -> DomainResult<i64> {
    if value <= 0 {
        return Err(DomainError::validation(field, "must be a positive integer"));
    }
    Ok(value)
}

/// Require a non-negative integer.
pub fn non_negative(field: &str, value: i64) -> DomainResult<i64> {
    if value < 0 {
        return Err(DomainError::validation(field, "must not be negative"));
    }
    Ok(value)
}

/// Coerce a required, non-blank string field.
pub fn required_str(field: &str, value: &Value) -> DomainResult<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::String(_) => Err(DomainError::validation(field, "must be a non-empty string")),
        Value::Null => Err(DomainError::validation(field, "is required")),
        _ => Err(DomainError::validation(field, "must be a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_integer_shapes() {
        assert_eq!(int("q", &json!(3)).unwrap(), 3);
        assert_eq!(int("q", &json!(-7)).unwrap(), -7);
        assert_eq!(int("q", &json!(3.0)).unwrap(), 3);
        assert_eq!(int("q", &json!(" 12 ")).unwrap(), 12);
    }

    #[test]
    fn rejects_fractions_and_non_numbers() {
        for v in [json!(2.5), json!("2.5"), json!(true), json!({"n": 1}), json!([1])] {
            let err = int("units_per_parent", &v).unwrap_err();
            assert_eq!(err.field(), "units_per_parent");
        }
    }

    #[test]
    fn rejects_values_outside_i64() {
        assert!(int("q", &json!(u64::MAX)).is_err());
        assert!(int("q", &json!(1e300)).is_err());
    }

    #[test]
    fn null_is_missing() {
        assert!(int("q", &Value::Null).is_err());
        assert_eq!(optional_int("q", &Value::Null).unwrap(), None);
        assert_eq!(optional_int("q", &json!("4")).unwrap(), Some(4));
    }

    #[test]
    fn sign_checks() {
        assert!(positive("quantity", 0).is_err());
        assert_eq!(positive("quantity", 1).unwrap(), 1);
        assert!(non_negative("min_quantity", -1).is_err());
        assert_eq!(non_negative("min_quantity", 0).unwrap(), 0);
    }

    #[test]
    fn strings_are_trimmed_and_required() {
        assert_eq!(required_str("name", &json!(" Chair ")).unwrap(), "Chair");
        assert!(required_str("name", &json!("  ")).is_err());
        assert!(required_str("name", &json!(5)).is_err());
        assert!(required_str("name", &Value::Null).is_err());
    }
}
