// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_matches::assert_matches;
use campus_core::{ASSOCIATIONS, Association, Identifier};
use campus_store::{MemoryStore, ResolveError, StoreError, StoreResolver};
use futures_util::StreamExt;

use crate::reference_list::{ListEvent, ReferenceList, Resolution};
use crate::test_utils::{CountingResolver, association, ids, seed_association};

async fn seeded_resolver(count: usize) -> CountingResolver<StoreResolver<MemoryStore>> {
    let store = MemoryStore::new();
    for n in 0..count {
        seed_association(&store, &association(&format!("a{n}"), n as u64)).await;
    }
    CountingResolver::new(StoreResolver::new(store))
}

fn literal_ids(count: usize) -> Vec<Identifier> {
    (0..count).map(|n| Identifier::from(format!("a{n}").as_str())).collect()
}

#[tokio::test]
async fn resolves_lazily_in_one_batch() {
    let resolver = seeded_resolver(50).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, literal_ids(50));

    // Construction and membership checks never fetch.
    assert!(list.contains(&Identifier::from("a7")));
    assert!(!list.contains(&Identifier::from("a99")));
    assert_eq!(list.resolution(), Resolution::Unresolved);
    assert_eq!(resolver.fetches(), 0);

    // First read issues exactly one batch for all ids.
    let associations = list.observe(&resolver).await.unwrap();
    assert_eq!(resolver.fetches(), 1);
    assert_eq!(resolver.batches()[0].len(), 50);
    assert_eq!(associations.len(), 50);
    assert_eq!(associations[0].id, Identifier::from("a0"));
    assert_eq!(associations[49].follower_count, 49);
    assert_eq!(list.resolution(), Resolution::Resolved);

    // Reads before the next mutation are served from the cache.
    list.observe(&resolver).await.unwrap();
    assert_eq!(resolver.fetches(), 1);
}

#[tokio::test]
async fn additions_only_fetch_new_ids() {
    let resolver = seeded_resolver(3).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0", "a1"]));
    list.observe(&resolver).await.unwrap();

    assert!(list.add(Identifier::from("a2")));
    // Adding an existing id is a no-op.
    assert!(!list.add(Identifier::from("a0")));
    assert_eq!(list.len(), 3);
    assert_eq!(list.resolution(), Resolution::PartiallyResolved);

    let associations = list.observe(&resolver).await.unwrap();
    assert_eq!(resolver.fetches(), 2);
    assert_eq!(resolver.batches()[1], ids(&["a2"]));
    assert_eq!(
        associations.iter().map(|a| a.id.clone()).collect::<Vec<_>>(),
        ids(&["a0", "a1", "a2"])
    );
}

#[tokio::test]
async fn removal_drops_cached_entity() {
    let resolver = seeded_resolver(3).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0", "a1", "a2"]));
    list.observe(&resolver).await.unwrap();

    assert!(list.remove(&Identifier::from("a1")));
    assert!(!list.remove(&Identifier::from("a1")));
    assert!(!list.contains(&Identifier::from("a1")));
    assert_eq!(list.get(&Identifier::from("a1")), None);

    // Removing needs no fetch.
    let associations = list.observe(&resolver).await.unwrap();
    assert_eq!(associations.len(), 2);
    assert_eq!(resolver.fetches(), 1);
}

#[tokio::test]
async fn failed_resolution_keeps_ids() {
    let resolver = seeded_resolver(2).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0", "a1"]));

    resolver.fail_next(1);
    let result = list.observe(&resolver).await;
    let outage = StoreError::Unavailable("injected resolver outage".into());
    assert_matches!(
        result,
        Err(err) if err.source == ResolveError::Store(outage)
    );

    // Nothing got forgotten and nothing is cached.
    assert_eq!(list.ids(), ids(&["a0", "a1"]).as_slice());
    assert_eq!(list.resolution(), Resolution::Unresolved);

    // Next read tries again.
    let associations = list.observe(&resolver).await.unwrap();
    assert_eq!(associations.len(), 2);
    assert_eq!(resolver.fetches(), 2);
}

#[tokio::test]
async fn missing_entities_stay_unresolved() {
    let resolver = seeded_resolver(1).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0", "deleted"]));

    let associations = list.observe(&resolver).await.unwrap();
    assert_eq!(associations.len(), 1);
    assert!(list.contains(&Identifier::from("deleted")));
    assert_eq!(list.unresolved(), ids(&["deleted"]));
    assert_eq!(list.resolution(), Resolution::PartiallyResolved);

    // Not asked for again until the list changes.
    list.observe(&resolver).await.unwrap();
    assert_eq!(resolver.fetches(), 1);
}

#[tokio::test]
async fn take_and_restore_keep_order() {
    let resolver = seeded_resolver(3).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0", "a1", "a2"]));
    list.observe(&resolver).await.unwrap();

    let removed = list.take(&Identifier::from("a1")).unwrap();
    assert_eq!(removed.position, 1);
    assert!(removed.entity.is_some());
    assert_eq!(list.ids(), ids(&["a0", "a2"]).as_slice());

    assert!(list.restore(removed));
    assert_eq!(list.ids(), ids(&["a0", "a1", "a2"]).as_slice());
    // Entity came back with it, no fetch required.
    assert_eq!(list.resolution(), Resolution::Resolved);
    list.observe(&resolver).await.unwrap();
    assert_eq!(resolver.fetches(), 1);
}

#[tokio::test]
async fn reset_keeps_cache_of_remaining_ids() {
    let resolver = seeded_resolver(3).await;
    let mut list: ReferenceList<Association> =
        ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0", "a1"]));
    list.observe(&resolver).await.unwrap();

    list.reset(ids(&["a1", "a2", "a1"]));
    assert_eq!(list.ids(), ids(&["a1", "a2"]).as_slice());
    assert!(list.get(&Identifier::from("a1")).is_some());
    assert!(list.get(&Identifier::from("a0")).is_none());

    list.observe(&resolver).await.unwrap();
    assert_eq!(resolver.batches()[1], ids(&["a2"]));
}

#[tokio::test]
async fn additions_during_fetch_are_resolved_later() {
    let resolver = seeded_resolver(2).await;
    let mut list: ReferenceList<Association> = ReferenceList::from_ids(ASSOCIATIONS, ids(&["a0"]));

    let pending = list.pending().unwrap();
    list.add(Identifier::from("a1"));
    list.absorb(pending, Default::default());

    // "a1" was added after the batch was requested and must still be fetched.
    assert!(list.pending().is_some());
    list.observe(&resolver).await.unwrap();
    assert_eq!(list.resolution(), Resolution::Resolved);
}

#[tokio::test]
async fn subscribers_see_changes() {
    let resolver = seeded_resolver(1).await;
    let mut list: ReferenceList<Association> = ReferenceList::new(ASSOCIATIONS);
    let mut events = list.subscribe();

    list.add(Identifier::from("a0"));
    list.observe(&resolver).await.unwrap();
    list.remove(&Identifier::from("a0"));

    assert_eq!(
        events.next().await.unwrap().unwrap(),
        ListEvent::Added(Identifier::from("a0"))
    );
    assert_eq!(
        events.next().await.unwrap().unwrap(),
        ListEvent::Resolved {
            resolved: 1,
            missing: 0
        }
    );
    assert_eq!(
        events.next().await.unwrap().unwrap(),
        ListEvent::Removed(Identifier::from("a0"))
    );
}
