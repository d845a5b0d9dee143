// SPDX-License-Identifier: MIT OR Apache-2.0

use campus_core::{DocRef, Identifier};

use crate::StoreError;
use crate::documents::{Fields, Snapshot, Version, Write};

/// Interface for reading and conditionally writing versioned documents.
///
/// Implementations must bump the [`Version`] of a document on every accepted write and reject
/// writes prepared against any other version than the current one. This is the only guarantee
/// higher layers rely on to detect concurrent edits from other devices.
pub trait DocumentStore {
    /// Reads the current state of a document.
    ///
    /// Returns `None` if the document does not exist.
    fn read(&self, doc: &DocRef) -> impl Future<Output = Result<Option<Snapshot>, StoreError>>;

    /// Reads a batch of documents from one collection in a single round-trip.
    ///
    /// Identifiers which do not exist are absent from the result, this is not an error. The order
    /// of the returned snapshots is unspecified.
    fn read_many(
        &self,
        collection: &str,
        ids: &[Identifier],
    ) -> impl Future<Output = Result<Vec<Snapshot>, StoreError>>;

    /// Creates a document with the given fields.
    ///
    /// Returns `true` when the document was created, or `false` when it already existed and no
    /// insertion occurred.
    fn insert(&self, doc: &DocRef, fields: Fields)
    -> impl Future<Output = Result<bool, StoreError>>;

    /// Merges the fields of a single write into its document if the document is still at the
    /// expected version.
    ///
    /// Returns the new version of the document.
    fn write(&self, write: Write) -> impl Future<Output = Result<Version, StoreError>>;

    /// Applies all writes atomically.
    ///
    /// Every precondition is checked before the first write is applied. If any document is
    /// missing or was changed since it was read, nothing is written.
    fn commit(&self, writes: Vec<Write>) -> impl Future<Output = Result<(), StoreError>>;

    /// Deletes a document.
    ///
    /// Returns `true` when the removal occurred and `false` when the document was not found.
    fn delete(&self, doc: &DocRef) -> impl Future<Output = Result<bool, StoreError>>;
}
