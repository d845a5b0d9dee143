// SPDX-License-Identifier: MIT OR Apache-2.0

mod outcome;
mod protocol;

pub use outcome::{EdgeState, ToggleOutcome};
pub use protocol::ConcurrentRelationshipRepository;
