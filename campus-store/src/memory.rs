// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::documents::DocumentMemoryStore;

/// In-memory document store.
///
/// Nothing is persisted, documents are gone when the process ends. Meant for development and
/// tests.
///
/// Cloned instances share the same underlying documents, which allows simulating several devices
/// talking to the same backend from within one thread.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub(crate) documents: DocumentMemoryStore,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Trait implementations are in the regarding modules, see for example `documents`.
