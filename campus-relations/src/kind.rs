// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use campus_core::entities::{
    FOLLOWED_ASSOCIATIONS, FOLLOWER_COUNT, JOINED_ASSOCIATIONS, MEMBER_COUNT, MEMBERS,
    SAVE_COUNT, SAVED_EVENTS,
};
use campus_core::{ASSOCIATIONS, DocRef, EVENTS, Identifier, USERS};

/// Directed existence relationship between a subject and a target aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub subject: Identifier,
    pub target: Identifier,
}

impl Edge {
    pub fn new(subject: Identifier, target: Identifier) -> Self {
        Self { subject, target }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.subject, self.target)
    }
}

/// Describes which fields of which documents represent one kind of relationship.
///
/// The subject holds the list of targets it is linked to, the target holds a denormalized
/// counter of its subjects and optionally a reverse list of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationshipKind {
    pub name: String,
    pub subject_collection: String,
    pub subject_field: String,
    pub target_collection: String,
    pub counter_field: String,
    pub reverse_field: Option<String>,
}

impl RelationshipKind {
    /// Users following associations.
    pub fn follow() -> Self {
        Self {
            name: "follow".into(),
            subject_collection: USERS.into(),
            subject_field: FOLLOWED_ASSOCIATIONS.into(),
            target_collection: ASSOCIATIONS.into(),
            counter_field: FOLLOWER_COUNT.into(),
            reverse_field: None,
        }
    }

    /// Users being members of associations. Associations keep a reverse member list.
    pub fn join() -> Self {
        Self {
            name: "join".into(),
            subject_collection: USERS.into(),
            subject_field: JOINED_ASSOCIATIONS.into(),
            target_collection: ASSOCIATIONS.into(),
            counter_field: MEMBER_COUNT.into(),
            reverse_field: Some(MEMBERS.into()),
        }
    }

    /// Users saving events.
    pub fn save() -> Self {
        Self {
            name: "save".into(),
            subject_collection: USERS.into(),
            subject_field: SAVED_EVENTS.into(),
            target_collection: EVENTS.into(),
            counter_field: SAVE_COUNT.into(),
            reverse_field: None,
        }
    }

    pub fn with_reverse_field(mut self, field: Option<&str>) -> Self {
        self.reverse_field = field.map(str::to_owned);
        self
    }

    pub fn subject_ref(&self, id: &Identifier) -> DocRef {
        DocRef::new(self.subject_collection.clone(), id.clone())
    }

    pub fn target_ref(&self, id: &Identifier) -> DocRef {
        DocRef::new(self.target_collection.clone(), id.clone())
    }
}
