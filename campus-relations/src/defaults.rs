// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default values used for relationship configuration.

/// Number of attempts of a dual-document toggle before giving up with a contention error.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Buffer size of observer channels. Slow observers miss events beyond this and should re-read
/// the current state.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
