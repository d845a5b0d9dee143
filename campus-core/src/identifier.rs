// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of an aggregate, unique within its collection.
///
/// Identifiers are stable for the lifetime of the referenced entity and carry no meaning beyond
/// equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

/// Convenience conversion for literals.
///
/// Panics on an empty string, use [`Identifier::new`] for untrusted input.
impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value).expect("identifier literal must not be empty")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier can not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::{Identifier, IdentifierError};

    #[test]
    fn rejects_empty_identifiers() {
        assert_eq!(Identifier::new(""), Err(IdentifierError::Empty));
        assert_eq!("".parse::<Identifier>(), Err(IdentifierError::Empty));
        assert!(serde_json::from_str::<Identifier>("\"\"").is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Identifier::from("assoc-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"assoc-42\"");
        assert_eq!(
            serde_json::from_str::<Identifier>("\"assoc-42\"").unwrap(),
            id
        );
        assert_eq!(id.to_string(), "assoc-42");
    }
}
