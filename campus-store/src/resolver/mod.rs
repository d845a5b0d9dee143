// SPDX-License-Identifier: MIT OR Apache-2.0

mod store;
mod traits;

pub use store::StoreResolver;
pub use traits::{ReferenceResolver, ResolveError};
