use std::path::{Path, PathBuf};

use crate::error::Result;

/// How a source file's content is turned into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Free text (`.txt`, `.md`) that needs language-model extraction.
    Text,
    /// One record object or an array of them (`.json`).
    Json,
}

impl SourceFormat {
    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A file that can be ingested.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the directory that was walked.
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub format: SourceFormat,
}

impl SourceFile {
    /// Describe a single file given directly by the user.
    ///
    /// Returns `None` for unsupported extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let format = SourceFormat::from_path(path)?;
        let relative_path = path
            .file_name()
            .map_or_else(|| path.to_path_buf(), PathBuf::from);
        Some(Self {
            relative_path,
            absolute_path: path.to_path_buf(),
            format,
        })
    }
}

/// Recursively walk a directory and collect ingestible files.
///
/// Hidden files and directories (names starting with `.`) are skipped.
/// Results are sorted by relative path.
pub fn discover_sources(root: &Path) -> Result<Vec<SourceFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<SourceFile>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &path, results)?;
            continue;
        }

        let resolved = if file_type.is_symlink() {
            match path.canonicalize() {
                Ok(p) if p.is_file() => p,
                // Broken links and links to directories are not followed.
                _ => continue,
            }
        } else if file_type.is_file() {
            path.clone()
        } else {
            continue;
        };

        let Some(format) = SourceFormat::from_path(&resolved) else {
            continue;
        };
        results.push(SourceFile {
            relative_path: path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_path_buf(),
            absolute_path: resolved,
            format,
        });
    }

    Ok(())
}
