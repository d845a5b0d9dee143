// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use campus_core::{Association, DocRef, Event, Identifier, User};
use campus_store::{DocumentStore, Fields, ReferenceResolver, ResolveError, StoreError};
use serde::Serialize;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Resolver wrapper recording every batch it was asked for.
#[derive(Clone, Debug)]
pub struct CountingResolver<R> {
    inner: R,
    batches: Rc<RefCell<Vec<Vec<Identifier>>>>,
    failures: Rc<Cell<usize>>,
}

impl<R> CountingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            batches: Rc::default(),
            failures: Rc::default(),
        }
    }

    /// Lets the next `count` fetches fail as if the store was unreachable.
    pub fn fail_next(&self, count: usize) {
        self.failures.set(count);
    }

    /// Number of `fetch_batch` calls so far, including failed ones.
    pub fn fetches(&self) -> usize {
        self.batches.borrow().len()
    }

    /// Identifiers requested by each call.
    pub fn batches(&self) -> Vec<Vec<Identifier>> {
        self.batches.borrow().clone()
    }
}

impl<R, T> ReferenceResolver<T> for CountingResolver<R>
where
    R: ReferenceResolver<T>,
{
    async fn fetch_batch(
        &self,
        collection: &str,
        ids: &[Identifier],
    ) -> Result<HashMap<Identifier, T>, ResolveError> {
        self.batches.borrow_mut().push(ids.to_vec());
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(StoreError::Unavailable("injected resolver outage".into()).into());
        }
        self.inner.fetch_batch(collection, ids).await
    }
}

fn to_fields<E: Serialize>(entity: &E) -> Fields {
    let mut fields = match serde_json::to_value(entity) {
        Ok(serde_json::Value::Object(fields)) => fields,
        _ => panic!("aggregates serialize into objects"),
    };
    fields.remove("id");
    fields
}

pub async fn seed_user<S: DocumentStore>(store: &S, user: &User) {
    store
        .insert(&DocRef::user(user.id.clone()), to_fields(user))
        .await
        .expect("seeding user");
}

pub async fn seed_association<S: DocumentStore>(store: &S, association: &Association) {
    store
        .insert(
            &DocRef::association(association.id.clone()),
            to_fields(association),
        )
        .await
        .expect("seeding association");
}

pub async fn seed_event<S: DocumentStore>(store: &S, event: &Event) {
    store
        .insert(&DocRef::event(event.id.clone()), to_fields(event))
        .await
        .expect("seeding event");
}

/// Association with the given follower count and nothing else set.
pub fn association(id: &str, follower_count: u64) -> Association {
    let mut association = Association::new(id.into(), &format!("Association {id}"));
    association.follower_count = follower_count;
    association
}

pub fn user(id: &str) -> User {
    User::new(id.into(), &format!("User {id}"))
}

pub fn ids(values: &[&str]) -> Vec<Identifier> {
    values.iter().map(|value| Identifier::from(*value)).collect()
}
