// SPDX-License-Identifier: MIT OR Apache-2.0

mod list;
#[cfg(test)]
mod tests;

pub use list::{ListEvent, ListEvents, PendingResolution, ReferenceList, Removed, Resolution};
