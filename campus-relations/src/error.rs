// SPDX-License-Identifier: MIT OR Apache-2.0

use campus_core::DocRef;
use campus_store::{FieldError, ResolveError, StoreError};
use thiserror::Error;

use crate::Edge;

/// Errors surfaced by relationship toggles.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelationError {
    /// Connectivity check failed, nothing was written.
    #[error("device is offline")]
    Offline,

    /// Another toggle for the same pair has not completed yet, this call was rejected.
    #[error("toggle of {0} is already in flight")]
    InFlight(Edge),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    /// Concurrent writes on the same documents kept winning over this toggle.
    #[error("gave up after {attempts} conflicting attempts")]
    Contention { attempts: usize },

    #[error("{0} does not exist")]
    NotFound(DocRef),

    /// One document was written and reverting it failed. The stored relationship needs a
    /// reconciliation read on next load, retrying the toggle does not help.
    #[error("relationship {edge} was left inconsistent: {reason}")]
    Inconsistent { edge: Edge, reason: String },

    #[error(transparent)]
    Malformed(#[from] FieldError),

    /// Runtime shut down before the toggle completed.
    #[error("toggle was aborted before it completed")]
    Aborted,
}

/// Discriminant of [`RelationError`], useful for presentation layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Offline,
    InFlight,
    StoreUnavailable,
    Contention,
    NotFound,
    Inconsistent,
    Malformed,
    Aborted,
}

impl RelationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelationError::Offline => ErrorKind::Offline,
            RelationError::InFlight(_) => ErrorKind::InFlight,
            RelationError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            RelationError::Contention { .. } => ErrorKind::Contention,
            RelationError::NotFound(_) => ErrorKind::NotFound,
            RelationError::Inconsistent { .. } => ErrorKind::Inconsistent,
            RelationError::Malformed(_) => ErrorKind::Malformed,
            RelationError::Aborted => ErrorKind::Aborted,
        }
    }

    /// Returns `true` if the user may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelationError::StoreUnavailable(_)
                | RelationError::Contention { .. }
                | RelationError::Aborted
        )
    }

    /// Message to show to the user, specific to the kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Offline => "You are offline. Check your connection and try again.",
            ErrorKind::InFlight => "Still saving your last change.",
            ErrorKind::StoreUnavailable | ErrorKind::Aborted => {
                "Could not reach the server. Please try again."
            }
            ErrorKind::Contention => "Many people are doing this right now. Try again shortly.",
            ErrorKind::NotFound => "This item no longer exists.",
            ErrorKind::Inconsistent | ErrorKind::Malformed => {
                "Something went wrong. Refresh to see the latest state."
            }
        }
    }
}

impl From<StoreError> for RelationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => RelationError::StoreUnavailable(reason),
            StoreError::Conflict { .. } => RelationError::Contention { attempts: 1 },
            StoreError::NotFound(doc) => RelationError::NotFound(doc),
        }
    }
}

/// Reference list could not be resolved. The list itself is left untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("could not resolve references in '{collection}': {source}")]
pub struct ReferenceError {
    pub collection: String,
    #[source]
    pub source: ResolveError,
}
