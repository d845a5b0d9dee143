// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrapper with scripted failures, to exercise conflict and outage handling in higher
//! layers.
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use campus_core::{DocRef, Identifier};
use tracing::debug;

use crate::{DocumentStore, Fields, MemoryStore, Snapshot, StoreError, Version, Write};

/// Failure injected in place of, or right before, a store call.
#[derive(Clone, Debug)]
pub enum Fault {
    /// Fail as if the document changed since it was read, without changing anything.
    Conflict,

    /// Fail as if the store could not be reached.
    Unavailable,

    /// Fail as if the document was deleted.
    NotFound,

    /// Merge the given fields into the document before the call runs, as if another device
    /// committed in between. The call itself then proceeds against the changed state.
    Interleave(DocRef, Fields),
}

/// Wraps a [`MemoryStore`] and injects scripted faults.
///
/// Mutations (`write` and `commit`) and reads (`read` and `read_many`) each consume one entry of
/// their script per call. `None` entries let the call pass untouched, which allows targeting for
/// example "the second write only". Seeding calls (`insert`, `delete`) are never faulted.
///
/// Clones share script and counters.
#[derive(Clone, Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    mutation_faults: Rc<RefCell<VecDeque<Option<Fault>>>>,
    read_faults: Rc<RefCell<VecDeque<Option<Fault>>>>,
    reads: Rc<Cell<usize>>,
    batch_reads: Rc<Cell<usize>>,
    mutations: Rc<Cell<usize>>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Returns the wrapped store, bypassing all faults.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Appends faults for the next mutations.
    pub fn script_mutations(&self, faults: impl IntoIterator<Item = Option<Fault>>) {
        self.mutation_faults.borrow_mut().extend(faults);
    }

    /// Appends faults for the next reads.
    pub fn script_reads(&self, faults: impl IntoIterator<Item = Option<Fault>>) {
        self.read_faults.borrow_mut().extend(faults);
    }

    /// Number of single document reads.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of batch reads.
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.get()
    }

    /// Number of attempted `write` and `commit` calls, including faulted ones.
    pub fn mutations(&self) -> usize {
        self.mutations.get()
    }

    async fn inject(
        &self,
        script: &RefCell<VecDeque<Option<Fault>>>,
        doc: Option<&DocRef>,
    ) -> Result<(), StoreError> {
        let fault = script.borrow_mut().pop_front().flatten();
        let Some(fault) = fault else {
            return Ok(());
        };
        debug!(?fault, "inject store fault");

        match fault {
            Fault::Conflict => {
                let doc = doc.cloned().ok_or_else(|| {
                    StoreError::Unavailable("conflict injected without a document".into())
                })?;
                let actual = match self.inner.read(&doc).await? {
                    Some(snapshot) => snapshot.version,
                    None => Version::default(),
                };
                Err(StoreError::Conflict {
                    doc,
                    expected: actual,
                    actual,
                })
            }
            Fault::Unavailable => Err(StoreError::Unavailable("injected outage".into())),
            Fault::NotFound => Err(StoreError::NotFound(doc.cloned().ok_or_else(|| {
                StoreError::Unavailable("not found injected without a document".into())
            })?)),
            Fault::Interleave(doc, fields) => {
                let current = self
                    .inner
                    .read(&doc)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(doc.clone()))?;
                self.inner
                    .write(Write {
                        doc,
                        expected: current.version,
                        fields,
                    })
                    .await?;
                Ok(())
            }
        }
    }
}

impl DocumentStore for FaultyStore {
    async fn read(&self, doc: &DocRef) -> Result<Option<Snapshot>, StoreError> {
        self.reads.set(self.reads.get() + 1);
        self.inject(&self.read_faults, Some(doc)).await?;
        self.inner.read(doc).await
    }

    async fn read_many(
        &self,
        collection: &str,
        ids: &[Identifier],
    ) -> Result<Vec<Snapshot>, StoreError> {
        self.batch_reads.set(self.batch_reads.get() + 1);
        self.inject(&self.read_faults, None).await?;
        self.inner.read_many(collection, ids).await
    }

    async fn insert(&self, doc: &DocRef, fields: Fields) -> Result<bool, StoreError> {
        self.inner.insert(doc, fields).await
    }

    async fn write(&self, write: Write) -> Result<Version, StoreError> {
        self.mutations.set(self.mutations.get() + 1);
        self.inject(&self.mutation_faults, Some(&write.doc)).await?;
        self.inner.write(write).await
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.mutations.set(self.mutations.get() + 1);
        self.inject(&self.mutation_faults, writes.first().map(|write| &write.doc))
            .await?;
        self.inner.commit(writes).await
    }

    async fn delete(&self, doc: &DocRef) -> Result<bool, StoreError> {
        self.inner.delete(doc).await
    }
}
