//! Settings infrastructure for nblsp.
//!
//! Settings live in an `nblsp.toml` file discovered from the workspace root.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::SettingsError;

/// Name of the settings file searched for in the workspace.
pub const SETTINGS_FILE: &str = "nblsp.toml";

/// Root settings structure loaded from `nblsp.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notebooks: NotebookSettings,
    pub analysis: AnalysisSettings,
}

/// Notebook synchronization settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotebookSettings {
    /// Whether to advertise `notebookDocumentSync` to the client.
    pub sync: bool,
    /// Language of the notebook cells to synchronize.
    pub cell_language: String,
}

impl Default for NotebookSettings {
    fn default() -> Self {
        Self {
            sync: true,
            cell_language: "python".to_string(),
        }
    }
}

/// Settings for identifier analysis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Identifiers that are never resolved (typically language keywords).
    pub ignore: Vec<String>,
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            ignore: PYTHON_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl AnalysisSettings {
    pub fn is_ignored(&self, identifier: &str) -> bool {
        self.ignore.iter().any(|ignored| ignored == identifier)
    }
}

/// Read and parse a settings file.
pub fn try_load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load settings from a settings file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match try_load_settings(path) {
        Ok(settings) => settings,
        Err(e @ SettingsError::Parse { .. }) => {
            warn!("{e}");
            Settings::default()
        }
        Err(SettingsError::Read { .. }) => Settings::default(),
    }
}

/// Discover `nblsp.toml` by searching up the directory tree, then direct children.
///
/// Returns `(settings, settings_dir)` where `settings_dir` is the directory
/// containing the found file. If not found, returns `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}
