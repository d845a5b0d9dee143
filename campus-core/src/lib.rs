// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data types shared by the campus association app.
//!
//! Aggregates (users, associations and events) live in their own documents and only ever point
//! at each other by [`Identifier`]. A [`DocRef`] addresses one such document inside a named
//! collection. The aggregate structs in [`entities`] mirror the stored field layout, including the
//! denormalized counters which are kept in sync by `campus-relations`.
mod document;
pub mod entities;
mod identifier;

pub use document::{ASSOCIATIONS, DocRef, EVENTS, USERS};
pub use entities::{Association, Event, User};
pub use identifier::{Identifier, IdentifierError};
