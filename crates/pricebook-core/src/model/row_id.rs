use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefixes that mark a row id as session-local (never persisted).
pub const TEMPORARY_PREFIXES: [&str; 2] = ["temp-", "new-"];

/// Prefix used for ids assigned by the store.
pub const PERSISTED_PREFIX: &str = "PI-";

/// Identity of a price line item.
///
/// Rows created during an edit session carry a temporary id until save
/// swaps it for a store-assigned one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    /// Wrap an existing id string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Fresh temporary id for the `n`th row created in a session.
    #[must_use]
    pub fn temporary(n: u64) -> Self {
        Self(format!("temp-{n}"))
    }

    /// Store-assigned id for sequence number `seq`.
    #[must_use]
    pub fn persisted(seq: u64) -> Self {
        Self(format!("{PERSISTED_PREFIX}{seq:06}"))
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        TEMPORARY_PREFIXES.iter().any(|p| self.0.starts_with(p))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::RowId;

    #[test]
    fn temporary_prefixes_are_recognized() {
        assert!(RowId::temporary(3).is_temporary());
        assert!(RowId::new("new-abc").is_temporary());
        assert!(!RowId::persisted(12).is_temporary());
        assert!(!RowId::new("temp").is_temporary());
    }

    #[test]
    fn persisted_ids_are_zero_padded() {
        assert_eq!(RowId::persisted(42).as_str(), "PI-000042");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&RowId::new("PI-000001")).unwrap();
        assert_eq!(json, "\"PI-000001\"");
    }
}
