//! staffmatch - match candidates and projects through a semantic vector index.
//!
//! Candidates and projects are stored as two collections of [`Record`]s.
//! Each collection keeps an exact cosine-similarity [`VectorIndex`] built
//! from the records' stack, skills and description, embedded with a
//! [ColBERT](https://github.com/stanford-futuredata/ColBERT) model. A record
//! of one kind can be matched against the other collection, and a language
//! model turns the best hits into a short write-up.
//!
//! # Quick start
//!
//! ```no_run
//! use staffmatch::{DataDir, ModelManager, Record, RecordKind, Repository};
//! use staffmatch::embedding_text::Query;
//! use staffmatch::search::{self, SearchParams};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let mut repo = Repository::open(data_dir.storage()).unwrap();
//! let mut model = ModelManager::default();
//!
//! let mut project = Record::new(RecordKind::Project);
//! project.name = "Billing".to_string();
//! project.stack = "Rust, PostgreSQL".to_string();
//! let _ = repo.add(project, &mut model).unwrap();
//!
//! let query = Query {
//!     kind: RecordKind::Project,
//!     stack: "Rust".to_string(),
//!     skills: String::new(),
//!     description: String::new(),
//! };
//! let hits = search::execute_search(
//!     repo.collection(RecordKind::Project),
//!     &query,
//!     &mut model,
//!     &SearchParams::default(),
//! )
//! .unwrap();
//! for hit in &hits {
//!     println!("{} ({:.3})", hit.record.name, hit.similarity);
//! }
//! ```

pub mod cli;
pub mod config_db;
pub mod data_dir;
pub mod embedding;
pub mod embedding_text;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod matcher;
pub mod model_manager;
pub mod record;
pub mod search;
pub mod settings;
pub mod storage;
pub mod store;
pub mod vector_index;
pub mod walker;

#[cfg(test)]
mod testing;

pub use config_db::ConfigDb;
pub use data_dir::DataDir;
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use llm::{ChatClient, LanguageModel};
pub use model_manager::ModelManager;
pub use record::{Record, RecordKind};
pub use settings::Settings;
pub use storage::Storage;
pub use store::{Applied, Collection, Repository};
pub use vector_index::VectorIndex;
