// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};

use campus_core::{Identifier, USERS, User};

use crate::reference_list::{ReferenceList, Removed};
use crate::repository::ToggleOutcome;
use crate::{Edge, RelationshipCounter};

pub(crate) struct TargetState {
    pub counter: RelationshipCounter,
    /// Only present for kinds keeping a reverse member list on the target.
    pub members: Option<ReferenceList<User>>,
}

/// Relationship state as currently known on this device, including optimistic changes.
pub(crate) struct LocalState<T> {
    pub subjects: HashMap<Identifier, ReferenceList<T>>,
    pub targets: HashMap<Identifier, TargetState>,
    /// Toggles sent to the store and not completed yet, with the state they request.
    pub in_flight: HashMap<Edge, bool>,
    /// Targets left inconsistent by a failed toggle, reconciled on their next load.
    pub needs_reconcile: HashSet<Identifier>,
}

impl<T> Default for LocalState<T> {
    fn default() -> Self {
        Self {
            subjects: HashMap::new(),
            targets: HashMap::new(),
            in_flight: HashMap::new(),
            needs_reconcile: HashSet::new(),
        }
    }
}

/// Reverts one optimistic change to a reference list.
pub(crate) enum Undo<T> {
    Nothing,
    Remove(Identifier),
    Restore(Removed<T>),
}

impl<T> Undo<T> {
    fn apply(list: &mut ReferenceList<T>, id: &Identifier, linked: bool) -> Self {
        if linked {
            if list.add(id.clone()) {
                Undo::Remove(id.clone())
            } else {
                Undo::Nothing
            }
        } else {
            list.take(id).map_or(Undo::Nothing, Undo::Restore)
        }
    }

    fn revert(self, list: &mut ReferenceList<T>) {
        match self {
            Undo::Nothing => (),
            Undo::Remove(id) => {
                list.remove(&id);
            }
            Undo::Restore(removed) => {
                list.restore(removed);
            }
        }
    }
}

pub(crate) struct Rollback<T> {
    linked: bool,
    subject: Undo<T>,
    /// Counter before and after the optimistic change.
    counter: Option<(RelationshipCounter, RelationshipCounter)>,
    members: Undo<User>,
}

impl<T> LocalState<T> {
    pub fn is_linked(&self, edge: &Edge) -> bool {
        self.subjects
            .get(&edge.subject)
            .is_some_and(|list| list.contains(&edge.target))
    }

    /// Flips local state towards `linked` and records how to undo it.
    pub fn apply(&mut self, edge: &Edge, linked: bool, collection: &str) -> Rollback<T> {
        let list = self
            .subjects
            .entry(edge.subject.clone())
            .or_insert_with(|| ReferenceList::new(collection));
        let subject = Undo::apply(list, &edge.target, linked);

        let (counter, members) = match self.targets.get_mut(&edge.target) {
            Some(target) => {
                let before = target.counter;
                target.counter = before.after_toggle(!linked);
                let members = match &mut target.members {
                    Some(members) => Undo::apply(members, &edge.subject, linked),
                    None => Undo::Nothing,
                };
                (Some((before, target.counter)), members)
            }
            None => (None, Undo::Nothing),
        };

        Rollback {
            linked,
            subject,
            counter,
            members,
        }
    }

    /// Replaces local state of the edge with what the store confirmed.
    pub fn settle(&mut self, edge: &Edge, outcome: &ToggleOutcome, collection: &str) {
        let linked = outcome.linked();
        let list = self
            .subjects
            .entry(edge.subject.clone())
            .or_insert_with(|| ReferenceList::new(collection));
        set_membership(list, &edge.target, linked);

        let target = self
            .targets
            .entry(edge.target.clone())
            .or_insert_with(|| TargetState {
                counter: outcome.counter(),
                members: None,
            });
        target.counter = outcome.counter();
        if let Some(members) = &mut target.members {
            set_membership(members, &edge.subject, linked);
        }
    }

    pub fn revert(&mut self, edge: &Edge, rollback: Rollback<T>) {
        let Rollback {
            linked,
            subject,
            counter,
            members,
        } = rollback;

        if let Some(list) = self.subjects.get_mut(&edge.subject) {
            subject.revert(list);
        }

        let Some(target) = self.targets.get_mut(&edge.target) else {
            return;
        };
        if let Some((before, after)) = counter {
            // Other toggles on the same target might have settled in the meantime, in that case
            // only the own change is taken back.
            target.counter = if target.counter == after {
                before
            } else if before != after {
                target.counter.after_toggle(linked)
            } else {
                target.counter
            };
        }
        if let Some(list) = &mut target.members {
            members.revert(list);
        }
    }

    pub fn hydrate_subject(
        &mut self,
        subject: &Identifier,
        ids: impl IntoIterator<Item = Identifier>,
        collection: &str,
    ) {
        let list = self
            .subjects
            .entry(subject.clone())
            .or_insert_with(|| ReferenceList::new(collection));
        list.reset(ids);

        // Keep optimistic changes which are still waiting for the store.
        for (edge, linked) in &self.in_flight {
            if &edge.subject == subject {
                set_membership(list, &edge.target, *linked);
            }
        }
    }

    pub fn hydrate_target(
        &mut self,
        target: &Identifier,
        counter: RelationshipCounter,
        members: Option<Vec<Identifier>>,
    ) {
        let state = self
            .targets
            .entry(target.clone())
            .or_insert_with(|| TargetState {
                counter,
                members: None,
            });
        state.counter = counter;
        if let Some(ids) = members {
            state
                .members
                .get_or_insert_with(|| ReferenceList::new(USERS))
                .reset(ids);
        }

        for (edge, linked) in &self.in_flight {
            if &edge.target != target {
                continue;
            }
            state.counter = state.counter.after_toggle(!linked);
            if let Some(members) = &mut state.members {
                set_membership(members, &edge.subject, *linked);
            }
        }
    }
}

fn set_membership<T>(list: &mut ReferenceList<T>, id: &Identifier, linked: bool) {
    if linked {
        list.add(id.clone());
    } else {
        list.remove(id);
    }
}
