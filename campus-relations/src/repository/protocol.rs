// SPDX-License-Identifier: MIT OR Apache-2.0

use campus_core::Identifier;
use campus_store::{DocumentStore, FieldError, Snapshot, StoreError, Write};
use tracing::{debug, trace, warn};

use crate::config::{CommitMode, RelationsConfig};
use crate::repository::{EdgeState, ToggleOutcome};
use crate::{Edge, RelationError, RelationshipCounter, RelationshipKind};

/// Outcome of a single failed attempt.
enum AttemptError {
    /// Transient failure, the attempt can be repeated from the start.
    Retry(StoreError),

    /// Repeating will not help.
    Fail(RelationError),
}

impl From<StoreError> for AttemptError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            AttemptError::Retry(err)
        } else {
            AttemptError::Fail(err.into())
        }
    }
}

impl From<FieldError> for AttemptError {
    fn from(err: FieldError) -> Self {
        AttemptError::Fail(RelationError::Malformed(err))
    }
}

enum Applied {
    Committed(RelationshipCounter),
    Unchanged(RelationshipCounter),
}

enum Step {
    Unchanged(RelationshipCounter),
    Write(Plan),
}

/// Writes of one attempt, prepared against the versions which were read.
struct Plan {
    target: Write,
    subject: Write,
    counter: RelationshipCounter,
    /// The counter does not move when it is clamped at zero.
    counter_moved: bool,
    reverse_changed: bool,
}

/// Maintains both sides of a relationship: the list on the subject and the counter (plus
/// optional reverse list) on the target.
///
/// Every toggle reads both documents, prepares conditional writes against the versions it saw and
/// commits them. If another device wrote to either document in between, the store rejects the
/// commit and the whole read-modify-write is repeated on fresh state, up to the configured number
/// of attempts. The store is the only serialization point, no local locks are taken.
///
/// Toggles are idempotent: they ensure an edge exists or is absent rather than flipping it. A
/// toggle which finds the stored state already matching reports
/// [`ToggleOutcome::Unchanged`] without writing.
///
/// How the two documents are written depends on [`CommitMode`]:
///
/// - `Transactional`: one atomic `commit` of both writes. Failures never leave partial state.
/// - `Sequential`: target first, then subject, each atomic on its own. When the subject write
///   fails the target change is reverted by a compensating write (retried like a regular
///   attempt). Only if reverting fails as well, [`RelationError::Inconsistent`] is returned.
#[derive(Clone, Debug)]
pub struct ConcurrentRelationshipRepository<S> {
    store: S,
    kind: RelationshipKind,
    config: RelationsConfig,
}

impl<S> ConcurrentRelationshipRepository<S> {
    pub fn new(store: S, kind: RelationshipKind, config: RelationsConfig) -> Self {
        Self {
            store,
            kind,
            config,
        }
    }

    pub fn kind(&self) -> &RelationshipKind {
        &self.kind
    }

    pub fn config(&self) -> &RelationsConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> ConcurrentRelationshipRepository<S>
where
    S: DocumentStore,
{
    /// Toggles the relationship between `subject` and `target`.
    ///
    /// `currently_linked` is the caller's last known state and determines the requested state:
    /// linked if it was not linked, and the other way around.
    pub async fn toggle_relationship(
        &self,
        subject: &Identifier,
        target: &Identifier,
        currently_linked: bool,
    ) -> Result<ToggleOutcome, RelationError> {
        self.ensure(subject, target, !currently_linked).await
    }

    /// Makes sure the relationship between `subject` and `target` exists (`linked`) or is absent.
    pub async fn ensure(
        &self,
        subject: &Identifier,
        target: &Identifier,
        linked: bool,
    ) -> Result<ToggleOutcome, RelationError> {
        let edge = Edge::new(subject.clone(), target.clone());
        let mut compensations = 0;

        let result = match self.config.commit_mode {
            CommitMode::Transactional => {
                self.with_retries(async || self.attempt_transactional(&edge, linked).await)
                    .await
            }
            CommitMode::Sequential => {
                self.with_retries(async || {
                    self.attempt_sequential(&edge, linked, &mut compensations)
                        .await
                })
                .await
            }
        };

        let (applied, attempts) = result.inspect_err(|err| {
            debug!(kind = %self.kind.name, %edge, linked, %err, "toggle failed");
        })?;

        let outcome = match applied {
            Applied::Unchanged(counter) => ToggleOutcome::Unchanged(EdgeState {
                linked,
                counter,
                attempts,
            }),
            Applied::Committed(counter) => {
                let state = EdgeState {
                    linked,
                    counter,
                    attempts,
                };
                if compensations > 0 {
                    ToggleOutcome::CommittedWithCompensation {
                        state,
                        compensations,
                    }
                } else {
                    ToggleOutcome::Committed(state)
                }
            }
        };

        debug!(
            kind = %self.kind.name,
            %edge,
            linked,
            counter = %outcome.counter(),
            attempts,
            "toggle settled"
        );

        Ok(outcome)
    }

    /// Re-establishes the counter of a target from its reverse member list.
    ///
    /// This is the reconciliation read after a relationship was reported as inconsistent. Kinds
    /// without reverse list can not be recounted and the stored counter is returned as is.
    pub async fn reconcile(
        &self,
        target: &Identifier,
    ) -> Result<RelationshipCounter, RelationError> {
        let (counter, _) = self
            .with_retries(async || self.attempt_reconcile(target).await)
            .await?;
        Ok(counter)
    }

    /// Reads the identifiers a subject is linked to.
    pub async fn subject_targets(
        &self,
        subject: &Identifier,
    ) -> Result<Vec<Identifier>, RelationError> {
        let doc = self.kind.subject_ref(subject);
        let snapshot = self
            .store
            .read(&doc)
            .await?
            .ok_or_else(|| RelationError::NotFound(doc.clone()))?;
        Ok(snapshot.ids(&self.kind.subject_field)?)
    }

    /// Reads the counter of a target and its reverse member list, if the kind keeps one.
    pub async fn target_state(
        &self,
        target: &Identifier,
    ) -> Result<(RelationshipCounter, Option<Vec<Identifier>>), RelationError> {
        let doc = self.kind.target_ref(target);
        let snapshot = self
            .store
            .read(&doc)
            .await?
            .ok_or_else(|| RelationError::NotFound(doc.clone()))?;
        let counter = self.stored_counter(&snapshot)?;
        let members = match &self.kind.reverse_field {
            Some(field) => Some(snapshot.ids(field)?),
            None => None,
        };
        Ok((counter, members))
    }

    /// Runs an attempt until it succeeds, fails for good or the attempt bound is reached.
    ///
    /// Returns the result together with the number of attempts it took.
    async fn with_retries<T>(
        &self,
        mut attempt: impl AsyncFnMut() -> Result<T, AttemptError>,
    ) -> Result<(T, usize), RelationError> {
        let max_attempts = self.config.attempts();
        let mut last_error = None;

        for number in 1..=max_attempts {
            match attempt().await {
                Ok(value) => return Ok((value, number)),
                Err(AttemptError::Fail(err)) => return Err(err),
                Err(AttemptError::Retry(err)) => {
                    trace!(attempt = number, max_attempts, %err, "attempt failed");
                    last_error = Some(err);
                }
            }
        }

        Err(match last_error {
            Some(StoreError::Unavailable(reason)) => RelationError::StoreUnavailable(reason),
            _ => RelationError::Contention {
                attempts: max_attempts,
            },
        })
    }

    async fn read_edge(&self, edge: &Edge) -> Result<(Snapshot, Snapshot), AttemptError> {
        let subject_ref = self.kind.subject_ref(&edge.subject);
        let target_ref = self.kind.target_ref(&edge.target);
        let subject = self
            .store
            .read(&subject_ref)
            .await?
            .ok_or_else(|| StoreError::NotFound(subject_ref.clone()))?;
        let target = self
            .store
            .read(&target_ref)
            .await?
            .ok_or_else(|| StoreError::NotFound(target_ref.clone()))?;
        Ok((subject, target))
    }

    /// Reads the counter of a target, a negative stored value counts as zero.
    fn stored_counter(&self, target: &Snapshot) -> Result<RelationshipCounter, FieldError> {
        let (value, clamped) = target.clamped_count(&self.kind.counter_field)?;
        if clamped {
            warn!(
                kind = %self.kind.name,
                target = %target.doc,
                field = %self.kind.counter_field,
                "negative counter in store, reading it as zero"
            );
        }
        Ok(RelationshipCounter::new(value))
    }

    fn prepare(
        &self,
        edge: &Edge,
        subject: &Snapshot,
        target: &Snapshot,
        linked: bool,
    ) -> Result<Step, FieldError> {
        let mut targets = subject.ids(&self.kind.subject_field)?;
        let counter = self.stored_counter(target)?;
        let members = match &self.kind.reverse_field {
            Some(field) => Some(target.ids(field)?),
            None => None,
        };

        // With a reverse list both sides have to agree before nothing is left to do.
        let subject_matches = targets.contains(&edge.target) == linked;
        let reverse_matches = members
            .as_ref()
            .is_none_or(|members| members.contains(&edge.subject) == linked);
        if subject_matches && reverse_matches {
            return Ok(Step::Unchanged(counter));
        }

        set_membership(&mut targets, &edge.target, linked);
        let mut target_write = Write::new(target.doc.clone(), target.version);
        let mut reverse_changed = false;

        let next = match (&self.kind.reverse_field, members) {
            (Some(field), Some(mut members)) => {
                // The member list is the source of truth, a subject which is already listed is
                // not counted twice.
                reverse_changed = set_membership(&mut members, &edge.subject, linked);
                target_write = target_write.set_ids(field, &members);
                RelationshipCounter::new(members.len() as u64)
            }
            _ => {
                let next = counter.after_toggle(!linked);
                if next == counter {
                    warn!(
                        kind = %self.kind.name,
                        %edge,
                        "counter already at zero while removing a link, keeping it at zero"
                    );
                }
                next
            }
        };
        target_write = target_write.set_count(&self.kind.counter_field, next.value());

        Ok(Step::Write(Plan {
            target: target_write,
            subject: Write::new(subject.doc.clone(), subject.version)
                .set_ids(&self.kind.subject_field, &targets),
            counter: next,
            counter_moved: next != counter,
            reverse_changed,
        }))
    }

    async fn attempt_transactional(
        &self,
        edge: &Edge,
        linked: bool,
    ) -> Result<Applied, AttemptError> {
        let (subject, target) = self.read_edge(edge).await?;
        let plan = match self.prepare(edge, &subject, &target, linked)? {
            Step::Unchanged(counter) => return Ok(Applied::Unchanged(counter)),
            Step::Write(plan) => plan,
        };

        self.store.commit(vec![plan.target, plan.subject]).await?;
        Ok(Applied::Committed(plan.counter))
    }

    async fn attempt_sequential(
        &self,
        edge: &Edge,
        linked: bool,
        compensations: &mut usize,
    ) -> Result<Applied, AttemptError> {
        let (subject, target) = self.read_edge(edge).await?;
        let plan = match self.prepare(edge, &subject, &target, linked)? {
            Step::Unchanged(counter) => return Ok(Applied::Unchanged(counter)),
            Step::Write(plan) => plan,
        };

        // Nothing was written yet if this fails.
        self.store.write(plan.target).await?;

        if let Err(err) = self.store.write(plan.subject).await {
            warn!(kind = %self.kind.name, %edge, %err, "subject write failed, reverting target");
            self.compensate(edge, linked, plan.counter_moved, plan.reverse_changed)
                .await
                .map_err(|compensation_err| {
                    AttemptError::Fail(RelationError::Inconsistent {
                        edge: edge.clone(),
                        reason: format!("{err}, reverting target failed: {compensation_err}"),
                    })
                })?;
            *compensations += 1;
            return Err(err.into());
        }

        Ok(Applied::Committed(plan.counter))
    }

    async fn compensate(
        &self,
        edge: &Edge,
        linked: bool,
        counter_moved: bool,
        reverse_changed: bool,
    ) -> Result<(), RelationError> {
        if !counter_moved && !reverse_changed {
            return Ok(());
        }

        let (_, attempts) = self
            .with_retries(async || {
                self.attempt_compensation(edge, linked, counter_moved, reverse_changed)
                    .await
            })
            .await?;
        debug!(kind = %self.kind.name, %edge, attempts, "reverted target");
        Ok(())
    }

    /// Applies the inverse of the target change on fresh state, other devices might have written
    /// to the target since.
    async fn attempt_compensation(
        &self,
        edge: &Edge,
        linked: bool,
        counter_moved: bool,
        reverse_changed: bool,
    ) -> Result<(), AttemptError> {
        let doc = self.kind.target_ref(&edge.target);
        let Some(target) = self.store.read(&doc).await? else {
            // Target is gone, nothing left to revert.
            return Ok(());
        };

        let mut write = Write::new(doc, target.version);
        match &self.kind.reverse_field {
            Some(field) => {
                let mut members = target.ids(field)?;
                if reverse_changed {
                    set_membership(&mut members, &edge.subject, !linked);
                    write = write.set_ids(field, &members);
                }
                write = write.set_count(&self.kind.counter_field, members.len() as u64);
            }
            None if counter_moved => {
                let counter = self.stored_counter(&target)?;
                let reverted = counter.after_toggle(linked);
                write = write.set_count(&self.kind.counter_field, reverted.value());
            }
            None => return Ok(()),
        }

        match self.store.write(write).await {
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn attempt_reconcile(
        &self,
        target: &Identifier,
    ) -> Result<RelationshipCounter, AttemptError> {
        let doc = self.kind.target_ref(target);
        let snapshot = self
            .store
            .read(&doc)
            .await?
            .ok_or_else(|| StoreError::NotFound(doc.clone()))?;
        let (stored, clamped) = snapshot.clamped_count(&self.kind.counter_field)?;

        let repaired = match &self.kind.reverse_field {
            Some(field) => snapshot.ids(field)?.len() as u64,
            None => stored,
        };
        if repaired == stored && !clamped {
            return Ok(RelationshipCounter::new(stored));
        }

        warn!(
            kind = %self.kind.name,
            target = %doc,
            stored,
            clamped,
            repaired,
            "counter drifted, repairing"
        );
        self.store
            .write(Write::new(doc, snapshot.version).set_count(&self.kind.counter_field, repaired))
            .await?;
        Ok(RelationshipCounter::new(repaired))
    }
}

/// Adds or removes `id`, returns `true` if the list changed.
fn set_membership(list: &mut Vec<Identifier>, id: &Identifier, linked: bool) -> bool {
    let present = list.contains(id);
    if linked && !present {
        list.push(id.clone());
        true
    } else if !linked && present {
        list.retain(|item| item != id);
        true
    } else {
        false
    }
}
