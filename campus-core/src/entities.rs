// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregates as they are laid out in their documents.
//!
//! Relationship lists only ever hold identifiers. Counters like `followerCount` are denormalized
//! copies of the size of a reverse relationship and must not be edited directly, they are
//! maintained by the relationship protocol in `campus-relations`.
use serde::{Deserialize, Serialize};

use crate::Identifier;

/// Field on a user listing the associations they follow.
pub const FOLLOWED_ASSOCIATIONS: &str = "followedAssociations";

/// Field on a user listing the associations they are a member of.
pub const JOINED_ASSOCIATIONS: &str = "joinedAssociations";

/// Field on a user listing the events they saved.
pub const SAVED_EVENTS: &str = "savedEvents";

/// Denormalized number of followers on an association.
pub const FOLLOWER_COUNT: &str = "followerCount";

/// Denormalized number of members on an association.
pub const MEMBER_COUNT: &str = "memberCount";

/// Reverse member list on an association.
pub const MEMBERS: &str = "members";

/// Denormalized number of users who saved an event.
pub const SAVE_COUNT: &str = "saveCount";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Identifier,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub followed_associations: Vec<Identifier>,
    #[serde(default)]
    pub joined_associations: Vec<Identifier>,
    #[serde(default)]
    pub saved_events: Vec<Identifier>,
}

impl User {
    pub fn new(id: Identifier, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            followed_associations: Vec::new(),
            joined_associations: Vec::new(),
            saved_events: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    pub id: Identifier,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub members: Vec<Identifier>,
}

impl Association {
    pub fn new(id: Identifier, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            follower_count: 0,
            member_count: 0,
            members: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Identifier,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub organisers: Vec<Identifier>,
    #[serde(default)]
    pub save_count: u64,
}

impl Event {
    pub fn new(id: Identifier, title: &str) -> Self {
        Self {
            id,
            title: title.to_owned(),
            organisers: Vec::new(),
            save_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Association, FOLLOWER_COUNT, User};

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let association: Association =
            serde_json::from_value(json!({ "id": "a1", "name": "Chess Club" })).unwrap();
        assert_eq!(association.follower_count, 0);
        assert!(association.members.is_empty());

        let user: User = serde_json::from_value(json!({ "id": "u1" })).unwrap();
        assert!(user.followed_associations.is_empty());
    }

    #[test]
    fn field_names_match_constants() {
        let mut association = Association::new("a1".into(), "Chess Club");
        association.follower_count = 5;
        let value = serde_json::to_value(&association).unwrap();
        assert_eq!(value[FOLLOWER_COUNT], json!(5));
    }
}
