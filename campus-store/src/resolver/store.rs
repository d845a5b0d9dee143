// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use campus_core::Identifier;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::DocumentStore;
use crate::resolver::{ReferenceResolver, ResolveError};

/// Resolves references by batch-reading documents from a [`DocumentStore`] and decoding them into
/// aggregates.
#[derive(Clone, Debug)]
pub struct StoreResolver<S> {
    store: S,
}

impl<S> StoreResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, T> ReferenceResolver<T> for StoreResolver<S>
where
    S: DocumentStore,
    T: DeserializeOwned,
{
    async fn fetch_batch(
        &self,
        collection: &str,
        ids: &[Identifier],
    ) -> Result<HashMap<Identifier, T>, ResolveError> {
        let snapshots = self.store.read_many(collection, ids).await?;
        trace!(
            collection,
            requested = ids.len(),
            found = snapshots.len(),
            "resolved batch"
        );

        let mut result = HashMap::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let entity = snapshot.decode()?;
            result.insert(snapshot.doc.id, entity);
        }
        Ok(result)
    }
}
