// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::Cell;
use std::rc::Rc;

/// Synchronous check telling whether the device can currently reach the store.
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

/// Probe for environments without a notion of being offline.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Shared flag updated by the platform's network callbacks.
///
/// Clones observe the same flag.
#[derive(Clone, Debug)]
pub struct ConnectivityFlag(Rc<Cell<bool>>);

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self(Rc::new(Cell::new(online)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.set(online);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.0.get()
    }
}
