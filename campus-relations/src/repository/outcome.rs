// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::RelationshipCounter;

/// Stored state of a relationship after a toggle settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeState {
    pub linked: bool,
    pub counter: RelationshipCounter,
    /// Number of attempts it took, starting at one.
    pub attempts: usize,
}

/// Successful result of a toggle.
///
/// Failures, including a relationship which was left inconsistent, are reported as
/// [`RelationError`](crate::RelationError).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Both documents were written.
    Committed(EdgeState),

    /// Both documents were written, but on the way at least one half-finished attempt had to be
    /// reverted with a compensating write.
    CommittedWithCompensation {
        state: EdgeState,
        compensations: usize,
    },

    /// Stored state already matched the requested one, nothing was written.
    Unchanged(EdgeState),
}

impl ToggleOutcome {
    pub fn state(&self) -> &EdgeState {
        match self {
            ToggleOutcome::Committed(state) => state,
            ToggleOutcome::CommittedWithCompensation { state, .. } => state,
            ToggleOutcome::Unchanged(state) => state,
        }
    }

    pub fn linked(&self) -> bool {
        self.state().linked
    }

    pub fn counter(&self) -> RelationshipCounter {
        self.state().counter
    }

    pub fn is_committed(&self) -> bool {
        !matches!(self, ToggleOutcome::Unchanged(_))
    }
}
