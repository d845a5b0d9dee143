// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use campus_core::{Identifier, USERS, User};
use campus_store::{DocumentStore, ReferenceResolver};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::facade::handle::{RelationEvent, RelationEvents, ToggleHandle};
use crate::facade::state::{LocalState, Rollback};
use crate::reference_list::{ListEvents, PendingResolution, ReferenceList};
use crate::repository::{ConcurrentRelationshipRepository, ToggleOutcome};
use crate::{
    Connectivity, Edge, ReferenceError, RelationError, RelationshipCounter, RelationshipKind,
};

/// Optimistic front of a [`ConcurrentRelationshipRepository`] for one kind of relationship.
///
/// A toggle flips the locally known membership and counter right away, so a tap is reflected
/// instantly. The store is written in the background and local state is then replaced by what
/// the store confirmed, or reverted to its pre-toggle values if the toggle failed.
///
/// All state is owned by the single cooperative context the facade lives on. Toggles run as tasks
/// spawned with [`tokio::task::spawn_local`], so the facade must be used from within a
/// [`tokio::task::LocalSet`]. Clones share state.
///
/// `T` is the entity type of the targets, subjects are always users.
pub struct RelationshipFacade<S, C, T> {
    inner: Rc<Inner<S, C, T>>,
}

struct Inner<S, C, T> {
    repository: ConcurrentRelationshipRepository<S>,
    connectivity: C,
    state: RefCell<LocalState<T>>,
    events: broadcast::Sender<RelationEvent>,
}

impl<S, C, T> Clone for RelationshipFacade<S, C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, C, T> RelationshipFacade<S, C, T> {
    pub fn new(repository: ConcurrentRelationshipRepository<S>, connectivity: C) -> Self {
        let (events, _) = broadcast::channel(repository.config().event_capacity.max(1));
        Self {
            inner: Rc::new(Inner {
                repository,
                connectivity,
                state: RefCell::new(LocalState::default()),
                events,
            }),
        }
    }

    pub fn kind(&self) -> &RelationshipKind {
        self.inner.repository.kind()
    }

    pub fn repository(&self) -> &ConcurrentRelationshipRepository<S> {
        &self.inner.repository
    }

    /// Returns `true` if `subject` is linked to `target` as far as this device knows, including
    /// toggles which are still pending. Never touches the store.
    pub fn is_linked(&self, subject: &Identifier, target: &Identifier) -> bool {
        self.inner
            .state
            .borrow()
            .is_linked(&Edge::new(subject.clone(), target.clone()))
    }

    /// Locally known counter of a target, `None` if the target was never loaded or toggled.
    pub fn counter(&self, target: &Identifier) -> Option<RelationshipCounter> {
        self.inner
            .state
            .borrow()
            .targets
            .get(target)
            .map(|state| state.counter)
    }

    /// Returns `true` while a toggle of this pair is in flight.
    pub fn is_pending(&self, subject: &Identifier, target: &Identifier) -> bool {
        self.inner
            .state
            .borrow()
            .in_flight
            .contains_key(&Edge::new(subject.clone(), target.clone()))
    }

    /// Identifiers of the targets `subject` is linked to, in list order.
    pub fn target_ids(&self, subject: &Identifier) -> Vec<Identifier> {
        self.inner
            .state
            .borrow()
            .subjects
            .get(subject)
            .map(|list| list.ids().to_vec())
            .unwrap_or_default()
    }

    /// Identifiers on the reverse member list of `target`, if one was loaded.
    pub fn member_ids(&self, target: &Identifier) -> Option<Vec<Identifier>> {
        self.inner
            .state
            .borrow()
            .targets
            .get(target)
            .and_then(|state| state.members.as_ref())
            .map(|list| list.ids().to_vec())
    }

    /// Sets the relationships of a subject from an already loaded aggregate, without any I/O.
    pub fn hydrate_subject(
        &self,
        subject: &Identifier,
        targets: impl IntoIterator<Item = Identifier>,
    ) {
        let collection = &self.kind().target_collection;
        self.inner
            .state
            .borrow_mut()
            .hydrate_subject(subject, targets, collection);
    }

    /// Sets counter and reverse member list of a target from an already loaded aggregate.
    ///
    /// `members` is ignored for kinds without reverse list.
    pub fn hydrate_target(
        &self,
        target: &Identifier,
        counter: RelationshipCounter,
        members: Option<Vec<Identifier>>,
    ) {
        let members = members.filter(|_| self.kind().reverse_field.is_some());
        self.inner
            .state
            .borrow_mut()
            .hydrate_target(target, counter, members);
    }

    /// Subscribes to toggle progress of this facade.
    pub fn subscribe(&self) -> RelationEvents {
        RelationEvents::new(self.inner.events.subscribe())
    }

    /// Subscribes to changes of the target list of `subject`.
    pub fn subscribe_targets(&self, subject: &Identifier) -> ListEvents {
        let collection = &self.kind().target_collection;
        self.inner
            .state
            .borrow_mut()
            .subjects
            .entry(subject.clone())
            .or_insert_with(|| ReferenceList::new(collection))
            .subscribe()
    }
}

impl<S, C, T> RelationshipFacade<S, C, T>
where
    S: DocumentStore + 'static,
    C: Connectivity + 'static,
    T: 'static,
{
    /// Toggles the relationship between `subject` and `target`.
    ///
    /// Fails right away with [`RelationError::Offline`] when the device is offline and with
    /// [`RelationError::InFlight`] while a toggle of the same pair has not completed. Nothing is
    /// changed in both cases. Otherwise local state is flipped and the returned handle resolves
    /// once the store settled the toggle. A target flagged by [`needs_reconcile`] is reconciled
    /// before the toggle is written.
    ///
    /// [`needs_reconcile`]: RelationshipFacade::needs_reconcile
    ///
    /// # Panics
    ///
    /// Panics when called outside of a [`tokio::task::LocalSet`].
    pub fn toggle(
        &self,
        subject: &Identifier,
        target: &Identifier,
    ) -> Result<ToggleHandle, RelationError> {
        let edge = Edge::new(subject.clone(), target.clone());
        let kind = self.kind();

        if !self.inner.connectivity.is_online() {
            debug!(kind = %kind.name, %edge, "rejected toggle while offline");
            return Err(RelationError::Offline);
        }

        let (linked, rollback) = {
            let mut state = self.inner.state.borrow_mut();
            if state.in_flight.contains_key(&edge) {
                debug!(kind = %kind.name, %edge, "rejected toggle, pair already in flight");
                return Err(RelationError::InFlight(edge));
            }
            let linked = !state.is_linked(&edge);
            let rollback = state.apply(&edge, linked, &kind.target_collection);
            state.in_flight.insert(edge.clone(), linked);
            (linked, rollback)
        };

        debug!(kind = %kind.name, %edge, linked, "applied optimistic toggle");
        self.inner.notify(RelationEvent::Pending {
            edge: edge.clone(),
            linked,
        });

        let inner = self.inner.clone();
        let task_edge = edge.clone();
        let task = tokio::task::spawn_local(async move {
            let result = inner.write_toggle(&task_edge, linked).await;
            inner.complete(task_edge, rollback, &result);
            result
        });

        Ok(ToggleHandle::new(edge, task))
    }

    /// Toggles the relationship and reports the result through callbacks instead of a handle.
    ///
    /// Callbacks run on the local context. Rejections (offline, in flight) are reported through
    /// `on_failure` before this returns.
    pub fn toggle_with<F, E>(
        &self,
        subject: &Identifier,
        target: &Identifier,
        on_success: F,
        on_failure: E,
    ) where
        F: FnOnce(ToggleOutcome) + 'static,
        E: FnOnce(RelationError) + 'static,
    {
        match self.toggle(subject, target) {
            Ok(handle) => {
                tokio::task::spawn_local(async move {
                    match handle.await {
                        Ok(outcome) => on_success(outcome),
                        Err(err) => on_failure(err),
                    }
                });
            }
            Err(err) => on_failure(err),
        }
    }

    /// Loads the relationships of a subject from the store.
    pub async fn load_subject(&self, subject: &Identifier) -> Result<(), RelationError> {
        let ids = self.inner.repository.subject_targets(subject).await?;
        let collection = &self.kind().target_collection;
        self.inner
            .state
            .borrow_mut()
            .hydrate_subject(subject, ids, collection);
        Ok(())
    }

    /// Loads counter and reverse member list of a target from the store.
    ///
    /// Targets left inconsistent by an earlier toggle are reconciled first.
    pub async fn load_target(
        &self,
        target: &Identifier,
    ) -> Result<RelationshipCounter, RelationError> {
        self.inner.reconcile_flagged(target).await?;

        let (counter, members) = self.inner.repository.target_state(target).await?;
        self.inner
            .state
            .borrow_mut()
            .hydrate_target(target, counter, members);
        Ok(counter)
    }

    /// Returns `true` if the target is waiting for a reconciliation read.
    pub fn needs_reconcile(&self, target: &Identifier) -> bool {
        self.inner.state.borrow().needs_reconcile.contains(target)
    }

    /// Resolves the targets `subject` is linked to.
    ///
    /// Only identifiers added since the last pass are fetched, in one batch.
    pub async fn targets<R>(
        &self,
        subject: &Identifier,
        resolver: &R,
    ) -> Result<Vec<T>, ReferenceError>
    where
        R: ReferenceResolver<T>,
        T: Clone,
    {
        let pending = self
            .inner
            .state
            .borrow()
            .subjects
            .get(subject)
            .and_then(ReferenceList::pending);

        if let Some(pending) = pending {
            let fetched = fetch(resolver, &self.kind().target_collection, &pending).await?;
            if let Some(list) = self.inner.state.borrow_mut().subjects.get_mut(subject) {
                list.absorb(pending, fetched);
            }
        }

        Ok(self
            .inner
            .state
            .borrow()
            .subjects
            .get(subject)
            .map(|list| list.cached().cloned().collect())
            .unwrap_or_default())
    }

    /// Resolves the reverse member list of `target`. Empty if none was loaded.
    pub async fn members<R>(
        &self,
        target: &Identifier,
        resolver: &R,
    ) -> Result<Vec<User>, ReferenceError>
    where
        R: ReferenceResolver<User>,
    {
        let pending = self
            .inner
            .state
            .borrow()
            .targets
            .get(target)
            .and_then(|state| state.members.as_ref())
            .and_then(ReferenceList::pending);

        if let Some(pending) = pending {
            let fetched = fetch(resolver, USERS, &pending).await?;
            let mut state = self.inner.state.borrow_mut();
            if let Some(list) = state
                .targets
                .get_mut(target)
                .and_then(|state| state.members.as_mut())
            {
                list.absorb(pending, fetched);
            }
        }

        Ok(self
            .inner
            .state
            .borrow()
            .targets
            .get(target)
            .and_then(|state| state.members.as_ref())
            .map(|list| list.cached().cloned().collect())
            .unwrap_or_default())
    }
}

impl<S, C, T> Inner<S, C, T>
where
    S: DocumentStore,
{
    /// Reconciles `target` if an earlier toggle left it inconsistent.
    async fn reconcile_flagged(&self, target: &Identifier) -> Result<(), RelationError> {
        let flagged = self.state.borrow().needs_reconcile.contains(target);
        if !flagged {
            return Ok(());
        }

        let counter = self.repository.reconcile(target).await?;
        debug!(
            kind = %self.repository.kind().name,
            %target,
            %counter,
            "reconciled inconsistent target"
        );
        self.state.borrow_mut().needs_reconcile.remove(target);
        Ok(())
    }

    async fn write_toggle(
        &self,
        edge: &Edge,
        linked: bool,
    ) -> Result<ToggleOutcome, RelationError> {
        self.reconcile_flagged(&edge.target).await?;
        self.repository
            .toggle_relationship(&edge.subject, &edge.target, !linked)
            .await
    }
}

impl<S, C, T> Inner<S, C, T> {
    fn complete(
        &self,
        edge: Edge,
        rollback: Rollback<T>,
        result: &Result<ToggleOutcome, RelationError>,
    ) {
        let kind = self.repository.kind();
        let event = {
            let mut state = self.state.borrow_mut();
            state.in_flight.remove(&edge);
            match result {
                Ok(outcome) => {
                    state.settle(&edge, outcome, &kind.target_collection);
                    RelationEvent::Settled {
                        edge,
                        linked: outcome.linked(),
                        counter: outcome.counter(),
                    }
                }
                Err(err) => {
                    state.revert(&edge, rollback);
                    if let RelationError::Inconsistent { .. } = err {
                        warn!(kind = %kind.name, %edge, "target needs reconciliation");
                        state.needs_reconcile.insert(edge.target.clone());
                    } else {
                        debug!(kind = %kind.name, %edge, %err, "reverted optimistic toggle");
                    }
                    RelationEvent::Reverted {
                        edge,
                        error: err.clone(),
                    }
                }
            }
        };
        self.notify(event);
    }

    fn notify(&self, event: RelationEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

async fn fetch<E, R>(
    resolver: &R,
    collection: &str,
    pending: &PendingResolution,
) -> Result<HashMap<Identifier, E>, ReferenceError>
where
    R: ReferenceResolver<E>,
{
    resolver
        .fetch_batch(collection, &pending.ids)
        .await
        .map_err(|source| {
            debug!(collection, %source, "resolving references failed");
            ReferenceError {
                collection: collection.to_owned(),
                source,
            }
        })
}
