// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// Denormalized count of subjects linked to a target.
///
/// The value is hydrated from storage and afterwards only changed by the relationship protocol.
/// It never goes below zero: removing a link from a counter which already drifted to zero keeps
/// it at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipCounter(u64);

impl RelationshipCounter {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Counter after toggling a relationship which was `currently_linked` before.
    pub(crate) fn after_toggle(self, currently_linked: bool) -> Self {
        if currently_linked {
            Self(self.0.saturating_sub(1))
        } else {
            Self(self.0.saturating_add(1))
        }
    }
}

impl fmt::Display for RelationshipCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
