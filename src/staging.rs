//! Local staging between extraction and indexing.
//!
//! Extracted text is persisted as UTF-8 `.txt` files whose names are a
//! deterministic, filesystem-safe transform of the source blob name. Two
//! distinct blob names can sanitize to the same filename; within a run the
//! [`StagingArea`] makes that explicit by inserting a short hash of the
//! original name instead of silently overwriting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::types::PipelineError;

/// Fixed extension for staged documents.
pub const STAGED_EXTENSION: &str = ".txt";

/// Maps an arbitrary blob name to a filesystem-safe filename.
///
/// Every character outside `[A-Za-z0-9._-]` (path separators, spaces, and
/// so on) is replaced with `_`, preserving enough of the original name for
/// traceability, and the fixed `.txt` extension is appended.
pub fn sanitize_blob_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        sanitized.push_str("document");
    }
    sanitized.push_str(STAGED_EXTENSION);
    sanitized
}

/// A staged document: where it landed and where it came from.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub source_name: String,
    pub path: PathBuf,
}

/// Writer for the staging directory.
///
/// Tracks filenames claimed during the run so a sanitation collision
/// between two distinct sources resolves to a distinct, still
/// deterministic name.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    claimed: HashMap<String, String>,
}

impl StagingArea {
    /// Creates the staging directory (and parents) if absent.
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            claimed: HashMap::new(),
        })
    }

    /// Staging root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the local filename for a source blob name.
    ///
    /// The first claimant of a sanitized name keeps it; any later distinct
    /// source that collides gets an 8-hex SHA-256 prefix of its original
    /// name inserted before the extension.
    pub fn filename_for(&mut self, source_name: &str) -> String {
        let base = sanitize_blob_name(source_name);
        match self.claimed.get(&base) {
            Some(owner) if owner != source_name => {
                let stem = base
                    .strip_suffix(STAGED_EXTENSION)
                    .unwrap_or(base.as_str());
                let disambiguated =
                    format!("{stem}-{}{STAGED_EXTENSION}", short_hash(source_name));
                self.claimed
                    .insert(disambiguated.clone(), source_name.to_string());
                disambiguated
            }
            _ => {
                self.claimed.insert(base.clone(), source_name.to_string());
                base
            }
        }
    }

    /// Writes extracted text for `source_name`, returning the staged file.
    pub async fn write(
        &mut self,
        source_name: &str,
        text: &str,
    ) -> Result<StagedFile, PipelineError> {
        let filename = self.filename_for(source_name);
        let path = self.root.join(filename);
        fs::write(&path, text).await?;
        Ok(StagedFile {
            source_name: source_name.to_string(),
            path,
        })
    }

    /// Enumerates staged `.txt` files, sorted by name for stable iteration.
    pub async fn staged_files(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_txt = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
            if is_txt && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sanitizer_replaces_unsafe_characters() {
        let name = sanitize_blob_name("420/BackOffice/report final.pdf");
        assert_eq!(name, "420_BackOffice_report_final.pdf.txt");
        assert!(
            name.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        );
    }

    #[test]
    fn sanitizer_always_appends_extension() {
        for name in ["a.pdf", "deeply/nested path/doc", "", "ü ü"] {
            assert!(sanitize_blob_name(name).ends_with(STAGED_EXTENSION));
        }
    }

    #[tokio::test]
    async fn colliding_sources_get_distinct_deterministic_names() {
        let dir = tempdir().unwrap();
        let mut staging = StagingArea::create(dir.path()).await.unwrap();

        let first = staging.filename_for("a/b.pdf");
        let second = staging.filename_for("a b.pdf");
        assert_eq!(first, "a_b.pdf.txt");
        assert_ne!(first, second);
        assert!(second.ends_with(STAGED_EXTENSION));

        // Re-resolving the same sources yields the same answers.
        assert_eq!(staging.filename_for("a/b.pdf"), first);
        assert_eq!(staging.filename_for("a b.pdf"), second);
    }

    #[tokio::test]
    async fn write_then_enumerate_round_trips() {
        let dir = tempdir().unwrap();
        let mut staging = StagingArea::create(dir.path()).await.unwrap();

        staging.write("x/y.pdf", "extracted text").await.unwrap();
        staging.write("z.pdf", "more text").await.unwrap();
        // Non-text files are ignored by enumeration.
        tokio::fs::write(dir.path().join("state.json"), "{}")
            .await
            .unwrap();

        let files = staging.staged_files().await.unwrap();
        assert_eq!(files.len(), 2);
        let content = tokio::fs::read_to_string(&files[0]).await.unwrap();
        assert!(!content.is_empty());
    }
}
