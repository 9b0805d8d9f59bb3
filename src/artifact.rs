use crate::patcher::{self, RuleApplication};
use crate::rule::RewriteRule;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// The full text of a target file, owned for the duration of one run.
///
/// Loaded once, mutated in memory by rule applications, persisted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    content: String,
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 text")]
    NotUtf8 { path: PathBuf },
}

impl Artifact {
    /// Wrap in-memory text as an artifact for `path` without touching disk.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Read the file at `path` as UTF-8 text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|_| ArtifactError::NotUtf8 {
            path: path.to_path_buf(),
        })?;

        debug!(path = %path.display(), bytes = content.len(), "loaded artifact");
        Ok(Self::new(path, content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    /// Apply one rule to the buffer, returning how many matches were replaced.
    ///
    /// Zero matches leaves the buffer untouched.
    pub fn apply_rule(&mut self, rule: &RewriteRule) -> usize {
        let outcome = patcher::apply_rule(&self.content, rule);
        let matches = outcome.matches;
        if matches > 0 {
            self.content = outcome.content.into_owned();
        }
        matches
    }

    /// Apply `rules` in order, each one seeing the output of the previous.
    pub fn apply_all(&mut self, rules: &[RewriteRule]) -> Vec<RuleApplication> {
        rules
            .iter()
            .map(|rule| RuleApplication {
                rule_id: rule.id().to_string(),
                matches: self.apply_rule(rule),
            })
            .collect()
    }

    /// Overwrite the artifact's own path with the current buffer.
    pub fn save(&self) -> Result<(), ArtifactError> {
        self.save_to(&self.path)
    }

    /// Overwrite `path` with the current buffer.
    ///
    /// Uses tempfile + fsync + rename, so readers see either the old file or
    /// the new one.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let write_err = |source| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        };

        atomic_write(path, self.content.as_bytes()).map_err(write_err)?;

        // Bump mtime so watchers pick up the rewrite
        filetime::set_file_mtime(path, filetime::FileTime::now()).map_err(write_err)?;

        info!(path = %path.display(), bytes = self.content.len(), "saved artifact");
        Ok(())
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Permissions of an existing file at `path` are carried over.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
