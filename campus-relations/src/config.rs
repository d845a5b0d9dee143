// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::defaults::{DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_ATTEMPTS};

/// How the two documents of a relationship are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Both documents are written in one atomic multi-document commit. A failed commit never
    /// leaves partial state behind.
    #[default]
    Transactional,

    /// For stores which are only atomic per document: the target is written first, then the
    /// subject. If the subject write fails the target change is reverted with a compensating
    /// write, and if that fails as well the relationship is reported as inconsistent.
    Sequential,
}

#[derive(Clone, Debug)]
pub struct RelationsConfig {
    /// Upper bound of attempts for one toggle, including the first one. Never less than one.
    pub max_attempts: usize,
    pub commit_mode: CommitMode,
    pub event_capacity: usize,
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            commit_mode: CommitMode::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl RelationsConfig {
    pub(crate) fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }
}
