// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_matches::assert_matches;
use campus_core::entities::{FOLLOWER_COUNT, MEMBERS};
use campus_core::{Association, DocRef, Identifier};
use serde_json::json;

use crate::documents::{DocumentStore, FieldError, Fields, Version, Write};
use crate::{MemoryStore, StoreError};

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn insert_read_delete_documents() {
    let store = MemoryStore::new();
    let doc = DocRef::association("a1".into());

    // Insert
    // ~~~~~~

    assert!(
        store
            .insert(&doc, fields(json!({ "name": "Chess Club" })))
            .await
            .unwrap()
    );
    // Re-inserting the same document returns false.
    assert!(
        !store
            .insert(&doc, fields(json!({ "name": "Go Club" })))
            .await
            .unwrap()
    );

    // Read
    // ~~~~

    let snapshot = store.read(&doc).await.unwrap().unwrap();
    assert_eq!(snapshot.version, Version::INITIAL);
    assert_eq!(snapshot.fields["name"], json!("Chess Club"));
    assert_eq!(
        store
            .read(&DocRef::association("a2".into()))
            .await
            .unwrap(),
        None
    );

    // Delete
    // ~~~~~~

    assert!(store.delete(&doc).await.unwrap());
    // Deleting the same document again returns false.
    assert!(!store.delete(&doc).await.unwrap());
}

#[tokio::test]
async fn conditional_write_bumps_version() {
    let store = MemoryStore::new();
    let doc = DocRef::association("a1".into());
    store
        .insert(&doc, fields(json!({ "name": "Chess Club", FOLLOWER_COUNT: 5 })))
        .await
        .unwrap();

    let version = store
        .write(Write::new(doc.clone(), Version::INITIAL).set_count(FOLLOWER_COUNT, 6))
        .await
        .unwrap();
    assert_eq!(version, Version::new(2));

    let snapshot = store.read(&doc).await.unwrap().unwrap();
    assert_eq!(snapshot.count(FOLLOWER_COUNT), Ok(6));
    // Fields not mentioned in the write are kept.
    assert_eq!(snapshot.fields["name"], json!("Chess Club"));

    // Writing against the outdated version is rejected.
    let result = store
        .write(Write::new(doc.clone(), Version::INITIAL).set_count(FOLLOWER_COUNT, 7))
        .await;
    assert_matches!(
        result,
        Err(StoreError::Conflict { expected, actual, .. })
            if expected == Version::INITIAL && actual == Version::new(2)
    );

    // Writing to a missing document fails.
    let result = store
        .write(Write::new(
            DocRef::association("missing".into()),
            Version::INITIAL,
        ))
        .await;
    assert_matches!(result, Err(StoreError::NotFound(_)));
}

#[tokio::test]
async fn commit_is_all_or_nothing() {
    let store = MemoryStore::new();
    let user = DocRef::user("u1".into());
    let association = DocRef::association("a1".into());
    store.insert(&user, Fields::new()).await.unwrap();
    store.insert(&association, Fields::new()).await.unwrap();

    // Another device changes the association in the meantime.
    store
        .write(Write::new(association.clone(), Version::INITIAL).set_count(FOLLOWER_COUNT, 1))
        .await
        .unwrap();

    let followed = [Identifier::from("a1")];
    let result = store
        .commit(vec![
            Write::new(user.clone(), Version::INITIAL).set_ids("followedAssociations", &followed),
            Write::new(association.clone(), Version::INITIAL).set_count(FOLLOWER_COUNT, 1),
        ])
        .await;
    assert_matches!(result, Err(StoreError::Conflict { doc, .. }) if doc == association);

    // The user document was not touched.
    let snapshot = store.read(&user).await.unwrap().unwrap();
    assert_eq!(snapshot.version, Version::INITIAL);
    assert!(snapshot.ids("followedAssociations").unwrap().is_empty());

    store
        .commit(vec![
            Write::new(user.clone(), Version::INITIAL).set_ids("followedAssociations", &followed),
            Write::new(association.clone(), Version::new(2)).set_count(FOLLOWER_COUNT, 2),
        ])
        .await
        .unwrap();

    let snapshot = store.read(&user).await.unwrap().unwrap();
    assert_eq!(
        snapshot.ids("followedAssociations").unwrap(),
        vec![Identifier::from("a1")]
    );
    let snapshot = store.read(&association).await.unwrap().unwrap();
    assert_eq!(snapshot.count(FOLLOWER_COUNT), Ok(2));
    assert_eq!(snapshot.version, Version::new(3));
}

#[tokio::test]
async fn commit_to_missing_document_fails() {
    let store = MemoryStore::new();
    let user = DocRef::user("u1".into());
    store.insert(&user, Fields::new()).await.unwrap();

    let followed = [Identifier::from("a1")];
    let result = store
        .commit(vec![
            Write::new(user.clone(), Version::INITIAL).set_ids("followedAssociations", &followed),
            Write::new(DocRef::association("a1".into()), Version::INITIAL)
                .set_count(FOLLOWER_COUNT, 1),
        ])
        .await;
    assert_matches!(result, Err(StoreError::NotFound(doc)) if doc.id.as_str() == "a1");

    // Document removed by another device between read and write.
    store.delete(&user).await.unwrap();
    let result = store
        .write(
            Write::new(user.clone(), Version::INITIAL).set_ids("followedAssociations", &followed),
        )
        .await;
    assert_matches!(result, Err(StoreError::NotFound(doc)) if doc == user);
    assert!(store.read(&user).await.unwrap().is_none());
}

#[tokio::test]
async fn read_many_skips_missing_documents() {
    let store = MemoryStore::new();
    store
        .insert(&DocRef::association("a1".into()), Fields::new())
        .await
        .unwrap();
    store
        .insert(&DocRef::association("a3".into()), Fields::new())
        .await
        .unwrap();

    let mut ids: Vec<Identifier> = store
        .read_many(
            "associations",
            &[
                Identifier::from("a1"),
                Identifier::from("a2"),
                Identifier::from("a3"),
            ],
        )
        .await
        .unwrap()
        .into_iter()
        .map(|snapshot| snapshot.doc.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![Identifier::from("a1"), Identifier::from("a3")]);
}

#[tokio::test]
async fn typed_field_access() {
    let store = MemoryStore::new();
    let doc = DocRef::association("a1".into());
    store
        .insert(
            &doc,
            fields(json!({
                "name": "Chess Club",
                FOLLOWER_COUNT: -1,
                MEMBERS: ["u1", "u2"],
            })),
        )
        .await
        .unwrap();

    let snapshot = store.read(&doc).await.unwrap().unwrap();
    assert_eq!(
        snapshot.ids(MEMBERS).unwrap(),
        vec![Identifier::from("u1"), Identifier::from("u2")]
    );
    assert_eq!(snapshot.count("memberCount"), Ok(0));
    assert_matches!(
        snapshot.count(FOLLOWER_COUNT),
        Err(FieldError::InvalidCount { .. })
    );
    assert_eq!(snapshot.clamped_count(FOLLOWER_COUNT), Ok((0, true)));
    assert_eq!(snapshot.clamped_count("memberCount"), Ok((0, false)));
    assert_matches!(
        snapshot.clamped_count("name"),
        Err(FieldError::InvalidCount { .. })
    );
    assert_matches!(snapshot.ids("name"), Err(FieldError::InvalidList { .. }));
    assert_matches!(
        snapshot.decode::<Association>(),
        Err(FieldError::Decode { .. })
    );
}
