use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid record type: {0:?}")]
    InvalidType(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {id} already exists")]
    DuplicateId { kind: &'static str, id: u64 },

    #[error("nothing to embed: stack, skills and description are all empty")]
    EmptyQuery,

    #[error("no vector index has been built for {kind}")]
    IndexUnavailable { kind: &'static str },

    #[error(
        "embedding dimension {actual} does not match index dimension {expected}"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("persistence failure at {}: {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("collaborator failure: {0}")]
    Collaborator(String),

    #[error("could not extract a record: {0}")]
    Extraction(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Caller errors are reported as-is and never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidType(_)
                | Error::NotFound { .. }
                | Error::DuplicateId { .. }
                | Error::EmptyQuery
        )
    }

    pub(crate) fn persistence(
        path: impl Into<PathBuf>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Error::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
