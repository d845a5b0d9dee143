// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces and implementations of the document store backing the campus association app.
//!
//! The store is treated as a capability: aggregates are read as versioned [`Snapshot`]s and
//! changed through conditional [`Write`]s. Every document carries a [`Version`] which is bumped
//! on each accepted write, a write prepared against an outdated version is rejected with
//! [`StoreError::Conflict`]. This optimistic concurrency token is the only serialization point
//! between devices editing the same documents.
//!
//! Two write modes are offered by [`DocumentStore`]:
//!
//! - `write` applies a single conditional write, atomic for exactly one document.
//! - `commit` applies several conditional writes all-or-nothing. All preconditions are checked
//!   before the first write lands.
//!
//! Entities only point at each other by identifier. A [`ReferenceResolver`] fetches the entities
//! behind a batch of identifiers in one call, [`StoreResolver`] implements it on top of any
//! document store.
//!
//! An in-memory implementation is provided in the form of a [`MemoryStore`], gated by the
//! `memory` feature flag and enabled by default.
pub mod documents;
mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod resolver;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use documents::{DocumentStore, FieldError, Fields, Snapshot, Version, Write};
pub use error::StoreError;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use resolver::{ReferenceResolver, ResolveError, StoreResolver};
