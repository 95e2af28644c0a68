//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a stocked part (e.g. `SCREW-10MM`).
///
/// Codes are trimmed on construction and must be non-empty. Ordering is plain
/// lexicographic ordering of the code string, which is what low-stock
/// signatures are built from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartCode(String);

impl PartCode {
    /// Parse a code, reporting failures against the `code` field.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        Self::for_field("code", raw)
    }

    /// Parse a code, reporting failures against `field`.
    pub fn for_field(field: &str, raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation(field, "must be a non-empty string"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PartCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for PartCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PartCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartCode> for String {
    fn from(value: PartCode) -> Self {
        value.0
    }
}
