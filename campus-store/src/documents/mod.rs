// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(feature = "memory")]
mod memory;
#[cfg(test)]
mod tests;
mod traits;
mod types;

#[cfg(feature = "memory")]
pub use memory::DocumentMemoryStore;
pub use traits::DocumentStore;
pub use types::{FieldError, Fields, Snapshot, Version, Write};
