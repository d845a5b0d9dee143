// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optimistic, device-local view on one kind of relationship.
mod handle;
mod relationship;
mod state;

pub use handle::{RelationEvent, RelationEvents, ToggleHandle};
pub use relationship::RelationshipFacade;
