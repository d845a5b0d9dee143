// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use campus_core::{DocRef, Identifier};
use tracing::trace;

use crate::StoreError;
use crate::documents::{DocumentStore, Fields, Snapshot, Version, Write};
use crate::memory::MemoryStore;

#[derive(Clone, Debug)]
struct StoredDocument {
    version: Version,
    fields: Fields,
}

#[derive(Clone, Debug, Default)]
pub struct DocumentMemoryStore {
    documents: Rc<RefCell<BTreeMap<DocRef, StoredDocument>>>,
}

impl DocumentMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_precondition(
    documents: &BTreeMap<DocRef, StoredDocument>,
    write: &Write,
) -> Result<(), StoreError> {
    let stored = documents
        .get(&write.doc)
        .ok_or_else(|| StoreError::NotFound(write.doc.clone()))?;
    if stored.version != write.expected {
        return Err(StoreError::Conflict {
            doc: write.doc.clone(),
            expected: write.expected,
            actual: stored.version,
        });
    }
    Ok(())
}

fn apply(
    documents: &mut BTreeMap<DocRef, StoredDocument>,
    write: Write,
) -> Result<Version, StoreError> {
    let stored = documents
        .get_mut(&write.doc)
        .ok_or_else(|| StoreError::NotFound(write.doc.clone()))?;
    stored.fields.extend(write.fields);
    stored.version = stored.version.next();
    Ok(stored.version)
}

impl DocumentStore for MemoryStore {
    async fn read(&self, doc: &DocRef) -> Result<Option<Snapshot>, StoreError> {
        let documents = self.documents.documents.borrow();
        Ok(documents.get(doc).map(|stored| Snapshot {
            doc: doc.clone(),
            version: stored.version,
            fields: stored.fields.clone(),
        }))
    }

    async fn read_many(
        &self,
        collection: &str,
        ids: &[Identifier],
    ) -> Result<Vec<Snapshot>, StoreError> {
        let documents = self.documents.documents.borrow();
        let result = ids
            .iter()
            .filter_map(|id| {
                let doc = DocRef::new(collection, id.clone());
                documents.get(&doc).map(|stored| Snapshot {
                    doc,
                    version: stored.version,
                    fields: stored.fields.clone(),
                })
            })
            .collect();
        Ok(result)
    }

    async fn insert(&self, doc: &DocRef, fields: Fields) -> Result<bool, StoreError> {
        let mut documents = self.documents.documents.borrow_mut();
        if documents.contains_key(doc) {
            return Ok(false);
        }
        documents.insert(
            doc.clone(),
            StoredDocument {
                version: Version::INITIAL,
                fields,
            },
        );
        Ok(true)
    }

    async fn write(&self, write: Write) -> Result<Version, StoreError> {
        let mut documents = self.documents.documents.borrow_mut();
        check_precondition(&documents, &write)?;
        trace!(doc = %write.doc, expected = %write.expected, "apply single write");
        apply(&mut documents, write)
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let mut documents = self.documents.documents.borrow_mut();

        // Check all preconditions first, either every write lands or none.
        for write in &writes {
            check_precondition(&documents, write)?;
        }

        trace!(writes = writes.len(), "apply atomic commit");
        for write in writes {
            apply(&mut documents, write)?;
        }

        Ok(())
    }

    async fn delete(&self, doc: &DocRef) -> Result<bool, StoreError> {
        let mut documents = self.documents.documents.borrow_mut();
        Ok(documents.remove(doc).is_some())
    }
}
