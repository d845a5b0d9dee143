// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relationships between independently stored campus aggregates.
//!
//! Users follow and join associations and save events. Each such relationship is stored twice:
//! as an identifier on a list of the subject (the user) and as a denormalized counter, plus
//! optionally a reverse member list, on the target. Both documents are written by one logical
//! operation and have to stay consistent while many devices toggle the same targets
//! concurrently.
//!
//! The crate is layered, leaves first:
//!
//! - [`ReferenceList`] holds identifiers of related entities and resolves them lazily, in one
//!   batch, through a [`ReferenceResolver`](campus_store::ReferenceResolver). Membership checks
//!   never fetch.
//! - [`RelationshipCounter`] is the non-negative denormalized count on the target.
//! - [`ConcurrentRelationshipRepository`] runs the dual-document toggle against a
//!   [`DocumentStore`](campus_store::DocumentStore), retrying on conflicting writes from other
//!   devices up to a configured bound. Toggles are idempotent: they ensure an edge exists or is
//!   absent.
//! - [`RelationshipFacade`] flips local state optimistically, allows at most one toggle per pair
//!   in flight and reverts on failure. [`Relations`] bundles facades for follows, joins and
//!   saves.
//!
//! ## Example
//!
//! ```
//! use campus_core::entities::FOLLOWER_COUNT;
//! use campus_core::{DocRef, Identifier};
//! use campus_relations::{ConnectivityFlag, Relations};
//! use campus_store::{DocumentStore, Fields, MemoryStore};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! store.insert(&DocRef::user("u1".into()), Fields::new()).await?;
//! let mut association = Fields::new();
//! association.insert(FOLLOWER_COUNT.into(), json!(5));
//! store.insert(&DocRef::association("a1".into()), association).await?;
//!
//! let relations = Relations::builder().build(store, ConnectivityFlag::default());
//! let (user, club) = (Identifier::from("u1"), Identifier::from("a1"));
//!
//! tokio::task::LocalSet::new()
//!     .run_until(async {
//!         let handle = relations.toggle_follow(&user, &club)?;
//!         // Visible right away, before the store confirmed it.
//!         assert!(relations.follows().is_linked(&user, &club));
//!
//!         let outcome = handle.await?;
//!         assert_eq!(outcome.counter().value(), 6);
//!         Ok::<_, campus_relations::RelationError>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
mod config;
mod connectivity;
mod counter;
mod defaults;
mod error;
pub mod facade;
mod kind;
pub mod reference_list;
mod relations;
pub mod repository;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::{CommitMode, RelationsConfig};
pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use counter::RelationshipCounter;
pub use defaults::{DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_ATTEMPTS};
pub use error::{ErrorKind, ReferenceError, RelationError};
pub use facade::{RelationEvent, RelationEvents, RelationshipFacade, ToggleHandle};
pub use kind::{Edge, RelationshipKind};
pub use reference_list::{ListEvent, ListEvents, ReferenceList, Resolution};
pub use relations::{Relations, RelationsBuilder};
pub use repository::{ConcurrentRelationshipRepository, EdgeState, ToggleOutcome};
