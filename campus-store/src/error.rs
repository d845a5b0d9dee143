// SPDX-License-Identifier: MIT OR Apache-2.0

use campus_core::DocRef;
use thiserror::Error;

use crate::Version;

/// Errors surfaced by a document store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Store could not be reached or gave up on the request, usually transient.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// Document changed since it was read.
    #[error("conflicting write on {doc}: expected version {expected}, found {actual}")]
    Conflict {
        doc: DocRef,
        expected: Version,
        actual: Version,
    },

    #[error("document {0} does not exist")]
    NotFound(DocRef),
}

impl StoreError {
    /// Returns `true` if repeating the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict { .. })
    }
}
