// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use campus_core::Identifier;
use thiserror::Error;

use crate::{FieldError, StoreError};

/// Capability to fetch the entities behind a batch of identifiers.
///
/// Resolvers are supplied per entity type. A batch is fetched in one call to avoid issuing a
/// separate request per referenced entity.
pub trait ReferenceResolver<T> {
    /// Fetches all entities of `collection` with the given identifiers.
    ///
    /// Identifiers which could not be found are simply absent from the returned map, a partial
    /// result is not an error.
    fn fetch_batch(
        &self,
        collection: &str,
        ids: &[Identifier],
    ) -> impl Future<Output = Result<HashMap<Identifier, T>, ResolveError>>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Decode(#[from] FieldError),
}
