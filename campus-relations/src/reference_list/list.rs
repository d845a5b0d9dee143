// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};

use campus_core::Identifier;
use campus_store::ReferenceResolver;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

use crate::ReferenceError;
use crate::defaults::DEFAULT_EVENT_CAPACITY;

/// Change notification of a [`ReferenceList`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListEvent {
    Added(Identifier),
    Removed(Identifier),
    /// A resolve pass finished. `missing` counts ids the resolver did not find.
    Resolved { resolved: usize, missing: usize },
}

/// Stream of [`ListEvent`]s for presentation layers.
pub type ListEvents = BroadcastStream<ListEvent>;

/// How much of a list has been resolved into entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Unresolved,
    PartiallyResolved,
    Resolved,
}

/// Identifiers waiting to be fetched, see [`ReferenceList::pending`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingResolution {
    pub ids: Vec<Identifier>,
    generation: u64,
}

/// Entry taken out of a list, can be put back in place with [`ReferenceList::restore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Removed<T> {
    pub id: Identifier,
    pub position: usize,
    pub entity: Option<T>,
}

/// Ordered set of identifiers pointing into one collection, with a lazily filled cache of the
/// entities behind them.
///
/// Identifiers are the source of truth for membership. Entities are only fetched when the list
/// is read through [`observe`](ReferenceList::observe), never on construction, and all
/// identifiers missing from the cache are fetched together in a single batch. Reads after that
/// are served from the cache until the list is mutated again.
///
/// Membership checks with [`contains`](ReferenceList::contains) never fetch anything.
///
/// ```text
///            add                 observe            add
/// Unresolved ----> Unresolved -----------> Resolved ----> PartiallyResolved
///                                  |
///                                  | (resolver did not find some ids)
///                                  v
///                           PartiallyResolved
/// ```
#[derive(Debug)]
pub struct ReferenceList<T> {
    collection: String,
    ids: Vec<Identifier>,
    index: HashSet<Identifier>,
    resolved: HashMap<Identifier, T>,
    /// Set when ids were added since the last resolve pass.
    stale: bool,
    /// Bumped on every addition, guards against concurrent additions while a batch is fetched.
    generation: u64,
    events: broadcast::Sender<ListEvent>,
}

impl<T> ReferenceList<T> {
    pub fn new(collection: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            collection: collection.into(),
            ids: Vec::new(),
            index: HashSet::new(),
            resolved: HashMap::new(),
            stale: false,
            generation: 0,
            events,
        }
    }

    /// Creates a list from stored identifiers without resolving any of them.
    ///
    /// Duplicates are dropped, the first occurrence determines the position.
    pub fn from_ids(
        collection: impl Into<String>,
        ids: impl IntoIterator<Item = Identifier>,
    ) -> Self {
        let mut list = Self::new(collection);
        for id in ids {
            if list.index.insert(id.clone()) {
                list.ids.push(id);
            }
        }
        list.stale = !list.ids.is_empty();
        list
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn ids(&self) -> &[Identifier] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `true` if the identifier is part of the list, independent of resolution state.
    pub fn contains(&self, id: &Identifier) -> bool {
        self.index.contains(id)
    }

    pub fn position(&self, id: &Identifier) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.ids.iter().position(|item| item == id)
    }

    /// Appends an identifier.
    ///
    /// Returns `false` if it was already part of the list, in this case nothing changes.
    pub fn add(&mut self, id: Identifier) -> bool {
        if !self.index.insert(id.clone()) {
            return false;
        }
        self.ids.push(id.clone());
        self.mark_stale();
        self.notify(ListEvent::Added(id));
        true
    }

    /// Removes an identifier together with its cached entity.
    ///
    /// Returns `false` if it was not part of the list.
    pub fn remove(&mut self, id: &Identifier) -> bool {
        self.take(id).is_some()
    }

    /// Removes an identifier and hands out what was stored for it.
    pub fn take(&mut self, id: &Identifier) -> Option<Removed<T>> {
        let position = self.position(id)?;
        let id = self.ids.remove(position);
        self.index.remove(&id);
        let entity = self.resolved.remove(&id);
        self.notify(ListEvent::Removed(id.clone()));
        Some(Removed {
            id,
            position,
            entity,
        })
    }

    /// Puts a previously taken entry back at its former position.
    ///
    /// Returns `false` if the identifier was added again in the meantime.
    pub fn restore(&mut self, removed: Removed<T>) -> bool {
        let Removed {
            id,
            position,
            entity,
        } = removed;
        if !self.index.insert(id.clone()) {
            return false;
        }
        self.ids.insert(position.min(self.ids.len()), id.clone());
        match entity {
            Some(entity) => {
                self.resolved.insert(id.clone(), entity);
            }
            None => self.mark_stale(),
        }
        self.notify(ListEvent::Added(id));
        true
    }

    /// Replaces all identifiers, keeping cached entities of those which stay.
    pub fn reset(&mut self, ids: impl IntoIterator<Item = Identifier>) {
        let mut next = Vec::new();
        let mut index = HashSet::new();
        for id in ids {
            if index.insert(id.clone()) {
                next.push(id);
            }
        }

        let removed: Vec<Identifier> = self
            .ids
            .iter()
            .filter(|id| !index.contains(*id))
            .cloned()
            .collect();
        let added: Vec<Identifier> = next
            .iter()
            .filter(|id| !self.index.contains(*id))
            .cloned()
            .collect();

        self.resolved.retain(|id, _| index.contains(id));
        self.ids = next;
        self.index = index;
        if !added.is_empty() {
            self.mark_stale();
        }

        for id in removed {
            self.notify(ListEvent::Removed(id));
        }
        for id in added {
            self.notify(ListEvent::Added(id));
        }
    }

    pub fn resolution(&self) -> Resolution {
        if self.resolved.len() == self.ids.len() {
            Resolution::Resolved
        } else if self.resolved.is_empty() {
            Resolution::Unresolved
        } else {
            Resolution::PartiallyResolved
        }
    }

    /// Identifiers without a cached entity, in list order.
    pub fn unresolved(&self) -> Vec<Identifier> {
        self.ids
            .iter()
            .filter(|id| !self.resolved.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Returns the cached entity of an identifier, without fetching.
    pub fn get(&self, id: &Identifier) -> Option<&T> {
        self.resolved.get(id)
    }

    /// Returns the currently cached entities in list order, without fetching.
    pub fn cached(&self) -> impl Iterator<Item = &T> {
        self.ids.iter().filter_map(|id| self.resolved.get(id))
    }

    /// Returns the identifiers a resolve pass needs to fetch, or `None` if the cache is fresh.
    ///
    /// Together with [`absorb`](ReferenceList::absorb) this splits a resolve pass in two, for
    /// callers which can not hold on to the list while the batch is fetched.
    pub fn pending(&self) -> Option<PendingResolution> {
        if !self.stale {
            return None;
        }
        let ids = self.unresolved();
        if ids.is_empty() {
            return None;
        }
        Some(PendingResolution {
            ids,
            generation: self.generation,
        })
    }

    /// Stores the result of a resolve pass.
    ///
    /// Entities of identifiers which were removed in the meantime are dropped. Requested ids the
    /// resolver did not find stay unresolved and are not asked for again until the next addition.
    pub fn absorb(&mut self, pending: PendingResolution, mut fetched: HashMap<Identifier, T>) {
        let mut resolved = 0;
        let mut missing = 0;
        for id in &pending.ids {
            if !self.index.contains(id) {
                continue;
            }
            match fetched.remove(id) {
                Some(entity) => {
                    self.resolved.insert(id.clone(), entity);
                    resolved += 1;
                }
                None => missing += 1,
            }
        }

        if self.generation == pending.generation {
            self.stale = false;
        }

        trace!(
            collection = %self.collection,
            resolved,
            missing,
            "absorbed resolved references"
        );
        self.notify(ListEvent::Resolved { resolved, missing });
    }

    /// Returns the resolved entities in list order, fetching all unresolved identifiers in one
    /// batch first if the list changed since the last pass.
    ///
    /// A failing resolver leaves identifiers and cache untouched, the next call tries again.
    pub async fn observe<R>(&mut self, resolver: &R) -> Result<Vec<T>, ReferenceError>
    where
        R: ReferenceResolver<T>,
        T: Clone,
    {
        if let Some(pending) = self.pending() {
            let fetched = resolver
                .fetch_batch(&self.collection, &pending.ids)
                .await
                .map_err(|source| {
                    debug!(collection = %self.collection, %source, "resolving references failed");
                    ReferenceError {
                        collection: self.collection.clone(),
                        source,
                    }
                })?;
            self.absorb(pending, fetched);
        }

        Ok(self.cached().cloned().collect())
    }

    /// Subscribes to changes of this list.
    pub fn subscribe(&self) -> ListEvents {
        BroadcastStream::new(self.events.subscribe())
    }

    fn mark_stale(&mut self) {
        self.stale = true;
        self.generation += 1;
    }

    fn notify(&self, event: ListEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}
