use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of one character record.
///
/// Restricted to ASCII alphanumerics and `_` so that the `-{id}` suffix used
/// for scoped storage keys can always be split off unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub const PREFIX: &'static str = "char_";

    /// Parse and validate an id.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("entity id cannot be empty"));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(DomainError::invalid_id(format!(
                "entity id '{}' contains unsupported character '{}'",
                trimmed, bad
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generate a fresh id of the form `char_<uuid>`.
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{base}-{id}`, the storage key of an entity-scoped value.
    pub fn scoped_key(&self, base: &str) -> String {
        format!("{}-{}", base, self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_ids() {
        let id = EntityId::new("char_1").unwrap();
        assert_eq!(id.as_str(), "char_1");
        assert_eq!(id.scoped_key("hope"), "hope-char_1");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(EntityId::new("  abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn rejects_dashes_and_empty() {
        assert!(EntityId::new("").is_err());
        assert!(EntityId::new("char-1").is_err());
        assert!(EntityId::new("a b").is_err());
    }

    #[test]
    fn generated_ids_are_valid_and_distinct() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(EntityId::PREFIX));
        assert!(EntityId::new(a.as_str()).is_ok());
    }

    #[test]
    fn serde_validates() {
        let id: EntityId = serde_json::from_str("\"char_9\"").unwrap();
        assert_eq!(id.as_str(), "char_9");
        assert!(serde_json::from_str::<EntityId>("\"bad-id\"").is_err());
    }
}
