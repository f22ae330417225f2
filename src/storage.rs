use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    record::{Record, RecordKind},
    vector_index::VectorIndex,
};

/// On-disk location of both collections.
///
/// Each kind owns two files under the root: `<collection>.json`, a
/// pretty-printed JSON array of records, and `<collection>.index`, the
/// serialized [`VectorIndex`]. Saves overwrite both files in place; a crash
/// in the middle of a save can leave either one truncated.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_path(&self, kind: RecordKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.collection_name()))
    }

    pub fn index_path(&self, kind: RecordKind) -> PathBuf {
        self.root.join(format!("{}.index", kind.collection_name()))
    }

    /// Load one collection.
    ///
    /// When either file is missing the collection starts out empty with no
    /// index. Files that exist but cannot be read or decoded are an error.
    pub fn load(
        &self,
        kind: RecordKind,
    ) -> Result<(Vec<Record>, Option<VectorIndex>)> {
        let records_path = self.records_path(kind);
        let index_path = self.index_path(kind);

        match (records_path.is_file(), index_path.is_file()) {
            (true, true) => {}
            (false, false) => {
                tracing::debug!(%kind, "no stored collection, starting empty");
                return Ok((Vec::new(), None));
            }
            (records_present, _) => {
                let missing = if records_present {
                    &index_path
                } else {
                    &records_path
                };
                tracing::warn!(
                    %kind,
                    missing = %missing.display(),
                    "incomplete stored collection, starting empty"
                );
                return Ok((Vec::new(), None));
            }
        }

        let json = std::fs::read(&records_path)
            .map_err(|e| Error::persistence(&records_path, e))?;
        let mut records: Vec<Record> = serde_json::from_slice(&json)
            .map_err(|e| Error::persistence(&records_path, e))?;
        for record in &mut records {
            record.normalize();
        }
        if let Some(stray) = records.iter().find(|r| r.kind != kind) {
            return Err(Error::persistence(
                &records_path,
                format!(
                    "record {} has type {} but is stored with {}",
                    stray.id,
                    stray.kind,
                    kind.collection_name()
                ),
            ));
        }

        let bytes = std::fs::read(&index_path)
            .map_err(|e| Error::persistence(&index_path, e))?;
        let index = VectorIndex::from_bytes(&bytes)
            .map_err(|reason| Error::persistence(&index_path, reason))?;

        tracing::info!(
            %kind,
            records = records.len(),
            vectors = index.len(),
            "loaded collection"
        );
        Ok((records, Some(index)))
    }

    /// Overwrite both files of one collection.
    pub fn save(
        &self,
        kind: RecordKind,
        records: &[Record],
        index: &VectorIndex,
    ) -> Result<()> {
        let records_path = self.records_path(kind);
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| Error::persistence(&records_path, e))?;
        std::fs::write(&records_path, json)
            .map_err(|e| Error::persistence(&records_path, e))?;

        let index_path = self.index_path(kind);
        std::fs::write(&index_path, index.to_bytes())
            .map_err(|e| Error::persistence(&index_path, e))?;

        tracing::debug!(
            %kind,
            records = records.len(),
            vectors = index.len(),
            "saved collection"
        );
        Ok(())
    }
}
