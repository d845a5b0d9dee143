// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Identifier;

/// Collection holding user documents.
pub const USERS: &str = "users";

/// Collection holding association documents.
pub const ASSOCIATIONS: &str = "associations";

/// Collection holding event documents.
pub const EVENTS: &str = "events";

/// Address of a single document in the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocRef {
    pub collection: String,
    pub id: Identifier,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: Identifier) -> Self {
        Self {
            collection: collection.into(),
            id,
        }
    }

    pub fn user(id: Identifier) -> Self {
        Self::new(USERS, id)
    }

    pub fn association(id: Identifier) -> Self {
        Self::new(ASSOCIATIONS, id)
    }

    pub fn event(id: Identifier) -> Self {
        Self::new(EVENTS, id)
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
