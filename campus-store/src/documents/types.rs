// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use campus_core::{DocRef, Identifier};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Field name under which the document identifier is exposed when decoding aggregates.
const ID_FIELD: &str = "id";

/// Raw fields of a document.
pub type Fields = serde_json::Map<String, Value>;

/// Optimistic concurrency token of a document.
///
/// Starts at `1` when a document is created and increases with every accepted write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Version = Version(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a document at the time it was read.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub doc: DocRef,
    pub version: Version,
    pub fields: Fields,
}

impl Snapshot {
    /// Returns the identifier list stored under `field`.
    ///
    /// A missing field or `null` is treated as an empty list.
    pub fn ids(&self, field: &str) -> Result<Vec<Identifier>, FieldError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|_| FieldError::InvalidList {
                    doc: self.doc.clone(),
                    field: field.to_owned(),
                })
            }
        }
    }

    /// Returns the counter stored under `field`.
    ///
    /// A missing field or `null` counts as zero. Negative or fractional numbers are rejected.
    pub fn count(&self, field: &str) -> Result<u64, FieldError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(0),
            Some(value) => value.as_u64().ok_or_else(|| FieldError::InvalidCount {
                doc: self.doc.clone(),
                field: field.to_owned(),
            }),
        }
    }

    /// Like [`count`](Snapshot::count), but reads negative integers as zero.
    ///
    /// The flag is `true` when the stored value was negative. Values which are no integers at all
    /// are still rejected.
    pub fn clamped_count(&self, field: &str) -> Result<(u64, bool), FieldError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok((0, false)),
            Some(value) => match (value.as_u64(), value.as_i64()) {
                (Some(count), _) => Ok((count, false)),
                (None, Some(_)) => Ok((0, true)),
                (None, None) => Err(FieldError::InvalidCount {
                    doc: self.doc.clone(),
                    field: field.to_owned(),
                }),
            },
        }
    }

    /// Decodes the document into an aggregate, exposing the document id as `id` field.
    pub fn decode<T>(&self) -> Result<T, FieldError>
    where
        T: DeserializeOwned,
    {
        let mut fields = self.fields.clone();
        fields.insert(ID_FIELD.to_owned(), Value::String(self.doc.id.to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(|err| FieldError::Decode {
            doc: self.doc.clone(),
            reason: err.to_string(),
        })
    }
}

/// Conditional change to one document.
///
/// The given fields are merged into the document, fields not mentioned stay untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Write {
    pub doc: DocRef,
    pub expected: Version,
    pub fields: Fields,
}

impl Write {
    pub fn new(doc: DocRef, expected: Version) -> Self {
        Self {
            doc,
            expected,
            fields: Fields::new(),
        }
    }

    pub fn set_ids(mut self, field: &str, ids: &[Identifier]) -> Self {
        let value = ids
            .iter()
            .map(|id| Value::String(id.to_string()))
            .collect();
        self.fields.insert(field.to_owned(), Value::Array(value));
        self
    }

    pub fn set_count(mut self, field: &str, count: u64) -> Self {
        self.fields.insert(field.to_owned(), Value::from(count));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Document fields which do not have the expected shape.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field '{field}' of {doc} is not a list of identifiers")]
    InvalidList { doc: DocRef, field: String },

    #[error("field '{field}' of {doc} is not a non-negative integer")]
    InvalidCount { doc: DocRef, field: String },

    #[error("could not decode {doc}: {reason}")]
    Decode { doc: DocRef, reason: String },
}
