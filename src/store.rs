use crate::{
    embedding::Embedder,
    embedding_text::build_text,
    error::{Error, Result},
    record::{Record, RecordKind, now_millis},
    storage::Storage,
    vector_index::VectorIndex,
};

/// The records of one kind and the index built from them.
///
/// Position `i` of the index always describes `records[i]` once a mutation
/// has completed.
#[derive(Debug, Clone)]
pub struct Collection {
    kind: RecordKind,
    records: Vec<Record>,
    index: Option<VectorIndex>,
}

impl Collection {
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when every record has exactly one vector.
    pub fn is_aligned(&self) -> bool {
        match &self.index {
            Some(index) => index.len() == self.records.len(),
            None => self.records.is_empty(),
        }
    }

    pub fn get(&self, id: u64) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        kind: RecordKind,
        records: Vec<Record>,
        index: Option<VectorIndex>,
    ) -> Self {
        Self {
            kind,
            records,
            index,
        }
    }
}

/// The result of a mutation whose in-memory effect has been applied.
///
/// Saving to disk is best-effort: if it failed, `persist_error` carries the
/// failure and the in-memory state is still the current one.
#[derive(Debug)]
#[must_use]
pub struct Applied<T> {
    pub value: T,
    pub persist_error: Option<Error>,
}

impl<T> Applied<T> {
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Owns the candidate and project collections and keeps each one's index
/// in step with its records.
///
/// Every mutation rebuilds the whole index of the affected collection and
/// writes both files. Mutations take `&mut self`; sharing a repository
/// between threads requires wrapping it in a lock.
#[derive(Debug)]
pub struct Repository {
    storage: Storage,
    candidates: Collection,
    projects: Collection,
    clock: fn() -> u64,
}

impl Repository {
    /// Load both collections from `storage`.
    pub fn open(storage: Storage) -> Result<Self> {
        let (candidates, candidates_index) =
            storage.load(RecordKind::Candidate)?;
        let (projects, projects_index) = storage.load(RecordKind::Project)?;

        let repo = Self {
            storage,
            candidates: Collection {
                kind: RecordKind::Candidate,
                records: candidates,
                index: candidates_index,
            },
            projects: Collection {
                kind: RecordKind::Project,
                records: projects,
                index: projects_index,
            },
            clock: now_millis,
        };

        for kind in RecordKind::ALL {
            if !repo.collection(kind).is_aligned() {
                tracing::warn!(
                    %kind,
                    "stored index does not match stored records; run a rebuild"
                );
            }
        }
        Ok(repo)
    }

    /// Replace the id source used for records added without an id.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn collection(&self, kind: RecordKind) -> &Collection {
        match kind {
            RecordKind::Candidate => &self.candidates,
            RecordKind::Project => &self.projects,
        }
    }

    fn collection_mut(&mut self, kind: RecordKind) -> &mut Collection {
        match kind {
            RecordKind::Candidate => &mut self.candidates,
            RecordKind::Project => &mut self.projects,
        }
    }

    /// Look up a record by id. A miss is not an error.
    pub fn get_by_id(&self, kind: RecordKind, id: u64) -> Option<&Record> {
        self.collection(kind).get(id)
    }

    /// All records of one kind in insertion order.
    pub fn list_all(&self, kind: RecordKind) -> &[Record] {
        self.collection(kind).records()
    }

    /// Insert a record into the collection named by its kind.
    ///
    /// A record with id 0 receives the current time in milliseconds as its
    /// id; two records added within the same millisecond end up sharing an
    /// id. A supplied id already present in the collection is rejected.
    /// Returns the record's id.
    pub fn add(
        &mut self,
        mut record: Record,
        embedder: &mut dyn Embedder,
    ) -> Result<Applied<u64>> {
        record.normalize();
        if build_text(&record).is_empty() {
            return Err(Error::EmptyQuery);
        }
        let kind = record.kind;
        if record.id == 0 {
            record.id = (self.clock)();
        } else if self.collection(kind).get(record.id).is_some() {
            return Err(Error::DuplicateId {
                kind: kind.as_str(),
                id: record.id,
            });
        }
        let id = record.id;

        let mut records = self.collection(kind).records.clone();
        records.push(record);
        let persist_error = self.replace(kind, records, embedder)?;

        tracing::info!(%kind, id, "added record");
        Ok(Applied {
            value: id,
            persist_error,
        })
    }

    /// Remove every record with `id` from one collection.
    pub fn delete(
        &mut self,
        kind: RecordKind,
        id: u64,
        embedder: &mut dyn Embedder,
    ) -> Result<Applied<()>> {
        let current = &self.collection(kind).records;
        let records: Vec<Record> =
            current.iter().filter(|r| r.id != id).cloned().collect();
        if records.len() == current.len() {
            return Err(Error::NotFound {
                kind: kind.as_str(),
                name: id.to_string(),
            });
        }

        let persist_error = self.replace(kind, records, embedder)?;

        tracing::info!(%kind, id, "deleted record");
        Ok(Applied {
            value: (),
            persist_error,
        })
    }

    /// Re-embed every record of one kind and save the result.
    ///
    /// Repairs an index that is missing or was built by another model.
    pub fn rebuild(
        &mut self,
        kind: RecordKind,
        embedder: &mut dyn Embedder,
    ) -> Result<Applied<usize>> {
        let records = self.collection(kind).records.clone();
        let count = records.len();
        let persist_error = self.replace(kind, records, embedder)?;
        Ok(Applied {
            value: count,
            persist_error,
        })
    }

    /// Build an index for `records`, save both, then swap them into place.
    ///
    /// Nothing changes if embedding fails. A failed save is logged and
    /// returned rather than raised.
    fn replace(
        &mut self,
        kind: RecordKind,
        records: Vec<Record>,
        embedder: &mut dyn Embedder,
    ) -> Result<Option<Error>> {
        let index = VectorIndex::build(&records, embedder)?;
        tracing::debug!(%kind, records = records.len(), "rebuilt index");

        let persist_error = self.storage.save(kind, &records, &index).err();
        if let Some(e) = &persist_error {
            tracing::warn!(%kind, error = %e, "could not save collection");
        }

        let collection = self.collection_mut(kind);
        collection.records = records;
        collection.index = Some(index);
        Ok(persist_error)
    }
}
