// SPDX-License-Identifier: MIT OR Apache-2.0

use campus_core::{Association, Event, Identifier};
use campus_store::DocumentStore;

use crate::config::{CommitMode, RelationsConfig};
use crate::facade::{RelationshipFacade, ToggleHandle};
use crate::repository::{ConcurrentRelationshipRepository, ToggleOutcome};
use crate::{Connectivity, RelationError, RelationshipKind};

/// Follow, join and save relationships of one device, sharing store, connectivity check and
/// configuration.
pub struct Relations<S, C> {
    follows: RelationshipFacade<S, C, Association>,
    joins: RelationshipFacade<S, C, Association>,
    saves: RelationshipFacade<S, C, Event>,
}

impl Relations<(), ()> {
    /// Entry point for configuring relationships, store and connectivity are given to
    /// [`RelationsBuilder::build`].
    pub fn builder() -> RelationsBuilder {
        RelationsBuilder::new()
    }
}

impl<S, C> Relations<S, C> {
    /// Users following associations.
    pub fn follows(&self) -> &RelationshipFacade<S, C, Association> {
        &self.follows
    }

    /// Users being members of associations.
    pub fn joins(&self) -> &RelationshipFacade<S, C, Association> {
        &self.joins
    }

    /// Users saving events.
    pub fn saves(&self) -> &RelationshipFacade<S, C, Event> {
        &self.saves
    }
}

impl<S, C> Relations<S, C>
where
    S: DocumentStore + 'static,
    C: Connectivity + 'static,
{
    pub fn toggle_follow(
        &self,
        user: &Identifier,
        association: &Identifier,
    ) -> Result<ToggleHandle, RelationError> {
        self.follows.toggle(user, association)
    }

    pub fn toggle_follow_with(
        &self,
        user: &Identifier,
        association: &Identifier,
        on_success: impl FnOnce(ToggleOutcome) + 'static,
        on_failure: impl FnOnce(RelationError) + 'static,
    ) {
        self.follows
            .toggle_with(user, association, on_success, on_failure);
    }

    pub fn toggle_join(
        &self,
        user: &Identifier,
        association: &Identifier,
    ) -> Result<ToggleHandle, RelationError> {
        self.joins.toggle(user, association)
    }

    pub fn toggle_join_with(
        &self,
        user: &Identifier,
        association: &Identifier,
        on_success: impl FnOnce(ToggleOutcome) + 'static,
        on_failure: impl FnOnce(RelationError) + 'static,
    ) {
        self.joins
            .toggle_with(user, association, on_success, on_failure);
    }

    pub fn toggle_save(
        &self,
        user: &Identifier,
        event: &Identifier,
    ) -> Result<ToggleHandle, RelationError> {
        self.saves.toggle(user, event)
    }

    pub fn toggle_save_with(
        &self,
        user: &Identifier,
        event: &Identifier,
        on_success: impl FnOnce(ToggleOutcome) + 'static,
        on_failure: impl FnOnce(RelationError) + 'static,
    ) {
        self.saves.toggle_with(user, event, on_success, on_failure);
    }
}

#[derive(Clone, Debug)]
pub struct RelationsBuilder {
    config: RelationsConfig,
    follow: RelationshipKind,
    join: RelationshipKind,
    save: RelationshipKind,
}

impl Default for RelationsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationsBuilder {
    pub fn new() -> Self {
        Self {
            config: RelationsConfig::default(),
            follow: RelationshipKind::follow(),
            join: RelationshipKind::join(),
            save: RelationshipKind::save(),
        }
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.config.max_attempts = max_attempts;
        self
    }

    pub fn commit_mode(mut self, mode: CommitMode) -> Self {
        self.config.commit_mode = mode;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Overrides the fields used for follows, for example to keep a reverse follower list.
    pub fn follow_kind(mut self, kind: RelationshipKind) -> Self {
        self.follow = kind;
        self
    }

    pub fn join_kind(mut self, kind: RelationshipKind) -> Self {
        self.join = kind;
        self
    }

    pub fn save_kind(mut self, kind: RelationshipKind) -> Self {
        self.save = kind;
        self
    }

    pub fn build<S, C>(self, store: S, connectivity: C) -> Relations<S, C>
    where
        S: Clone,
        C: Clone,
    {
        let repository = |kind| {
            ConcurrentRelationshipRepository::new(store.clone(), kind, self.config.clone())
        };
        Relations {
            follows: RelationshipFacade::new(repository(self.follow), connectivity.clone()),
            joins: RelationshipFacade::new(repository(self.join), connectivity.clone()),
            saves: RelationshipFacade::new(repository(self.save), connectivity),
        }
    }
}

#[cfg(test)]
mod tests {
    use campus_core::entities::{MEMBER_COUNT, SAVE_COUNT, SAVED_EVENTS};
    use campus_core::{DocRef, Event, Identifier};
    use campus_store::{DocumentStore, MemoryStore};
    use tokio::task::LocalSet;

    use crate::test_utils::{association, seed_association, seed_event, seed_user, user};
    use crate::{AlwaysOnline, CommitMode, Relations, RelationsBuilder, RelationshipKind};

    #[tokio::test]
    async fn toggles_all_kinds() {
        let store = MemoryStore::new();
        seed_user(&store, &user("u1")).await;
        seed_association(&store, &association("a1", 5)).await;
        seed_event(&store, &Event::new("e1".into(), "Welcome party")).await;

        let relations = Relations::builder()
            .commit_mode(CommitMode::Sequential)
            .build(store.clone(), AlwaysOnline);
        let (u1, a1, e1) = (
            Identifier::from("u1"),
            Identifier::from("a1"),
            Identifier::from("e1"),
        );

        LocalSet::new()
            .run_until(async {
                let follow = relations.toggle_follow(&u1, &a1).unwrap().await.unwrap();
                assert_eq!(follow.counter().value(), 6);
                let join = relations.toggle_join(&u1, &a1).unwrap().await.unwrap();
                assert_eq!(join.counter().value(), 1);
                let save = relations.toggle_save(&u1, &e1).unwrap().await.unwrap();
                assert_eq!(save.counter().value(), 1);

                // Kinds do not see each other.
                assert!(relations.follows().is_linked(&u1, &a1));
                assert!(relations.joins().is_linked(&u1, &a1));
                assert!(!relations.saves().is_linked(&u1, &a1));
            })
            .await;

        let target = store.read(&DocRef::association(a1)).await.unwrap().unwrap();
        assert_eq!(target.count(MEMBER_COUNT).unwrap(), 1);
        let event = store.read(&DocRef::event(e1.clone())).await.unwrap().unwrap();
        assert_eq!(event.count(SAVE_COUNT).unwrap(), 1);
        let subject = store.read(&DocRef::user(u1)).await.unwrap().unwrap();
        assert_eq!(subject.ids(SAVED_EVENTS).unwrap(), vec![e1]);
    }

    #[test]
    fn builder_overrides_kinds() {
        let relations = Relations::builder()
            .max_attempts(5)
            .follow_kind(RelationshipKind::follow().with_reverse_field(Some("followers")))
            .build(MemoryStore::new(), AlwaysOnline);

        let follows = relations.follows().repository();
        assert_eq!(follows.config().max_attempts, 5);
        assert_eq!(follows.kind().reverse_field.as_deref(), Some("followers"));
        assert_eq!(relations.joins().kind(), &RelationshipKind::join());
    }

    #[tokio::test]
    async fn builder_entry_points_agree() {
        let store = MemoryStore::new();
        seed_user(&store, &user("u1")).await;
        seed_association(&store, &association("a1", 0)).await;

        let from_relations = Relations::builder().build(store.clone(), AlwaysOnline);
        let from_builder = RelationsBuilder::new().build(store.clone(), AlwaysOnline);
        assert_eq!(
            from_relations.follows().repository().config().max_attempts,
            from_builder.follows().repository().config().max_attempts
        );
        assert_eq!(from_relations.saves().kind(), from_builder.saves().kind());

        let (u1, a1) = (Identifier::from("u1"), Identifier::from("a1"));
        LocalSet::new()
            .run_until(async {
                let outcome = from_relations.toggle_follow(&u1, &a1).unwrap().await.unwrap();
                assert_eq!(outcome.counter().value(), 1);
            })
            .await;
    }
}
