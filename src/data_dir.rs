use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    record::RecordKind,
    storage::Storage,
};

pub const DATA_DIR_ENV_VAR: &str = "STAFFMATCH_DATA_DIR";

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The STAFFMATCH_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/staffmatch/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DATA_DIR_ENV_VAR) {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("staffmatch")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_db(&self) -> PathBuf {
        self.root.join("config.redb")
    }

    /// Record and index files for both collections live directly in the
    /// root, next to the settings database.
    pub fn storage(&self) -> Storage {
        Storage::new(&self.root)
    }

    /// Every file the tool may keep here, with whether it exists yet.
    pub fn artifacts(&self) -> Vec<(PathBuf, bool)> {
        let storage = self.storage();
        let mut paths = vec![self.config_db()];
        for kind in RecordKind::ALL {
            paths.push(storage.records_path(kind));
            paths.push(storage.index_path(kind));
        }
        paths
            .into_iter()
            .map(|path| {
                let present = path.is_file();
                (path, present)
            })
            .collect()
    }
}
