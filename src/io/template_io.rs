use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Error loading a document template
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("no template configured")]
    NotConfigured,
    #[error("template not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("could not read template {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: io::Error,
    },
}

impl TemplateError {
    /// The template path involved, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            TemplateError::NotConfigured => None,
            TemplateError::NotFound { path } | TemplateError::Unreadable { path, .. } => Some(path),
        }
    }
}

/// Where document templates come from
pub trait TemplateSource {
    fn load(&self, path: &str) -> Result<String, TemplateError>;
}

/// Templates read from files under a root directory
#[derive(Debug, Clone)]
pub struct FsTemplateSource {
    root: PathBuf,
}

impl FsTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsTemplateSource { root: root.into() }
    }

    /// `path` under the root; tries `<path>.md` when `path` has no extension
    /// and does not exist as given
    fn resolve(&self, path: &str) -> Result<PathBuf, TemplateError> {
        let direct = self.root.join(path);
        if direct.is_file() {
            return Ok(direct);
        }
        if direct.extension().is_none() {
            let with_md = self.root.join(format!("{path}.md"));
            if with_md.is_file() {
                warn!(
                    template = path,
                    resolved = %with_md.display(),
                    "template found only with .md extension"
                );
                return Ok(with_md);
            }
        }
        Err(TemplateError::NotFound { path: direct })
    }
}

impl TemplateSource for FsTemplateSource {
    fn load(&self, path: &str) -> Result<String, TemplateError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(TemplateError::NotConfigured);
        }
        let resolved = self.resolve(path)?;
        fs::read_to_string(&resolved).map_err(|e| TemplateError::Unreadable {
            path: resolved,
            source: e,
        })
    }
}
