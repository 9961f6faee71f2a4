//! Error types.

use std::path::PathBuf;

use tower_lsp::lsp_types::Url;

/// Errors from notebook cell lookups.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("notebook document not found for cell URI: {0}")]
    CellNotFound(Url),
}

/// Errors from reading a settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from converting notebook sync notifications into store updates.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("invalid document URI: {0}")]
    InvalidUri(String),
}
