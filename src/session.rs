//! The server-side state request handlers run against.

use std::sync::OnceLock;

use tracing::warn;

use crate::document::{DocumentStore, Workspace};
use crate::settings::Settings;

/// What a request handler may use from the running server.
pub trait Session {
    type Workspace: Workspace + ?Sized;

    fn workspace(&self) -> &Self::Workspace;

    fn settings(&self) -> &Settings;
}

/// Open documents and settings of a running server.
#[derive(Debug, Default)]
pub struct ServerState {
    pub documents: DocumentStore,
    settings: OnceLock<Settings>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        let state = Self::new();
        let _ = state.settings.set(settings);
        state
    }

    /// Install settings. Settings can only be set once; later calls are ignored.
    pub fn set_settings(&self, settings: Settings) {
        if self.settings.set(settings).is_err() {
            warn!("settings already initialized");
        }
    }
}

impl Session for ServerState {
    type Workspace = DocumentStore;

    fn workspace(&self) -> &DocumentStore {
        &self.documents
    }

    fn settings(&self) -> &Settings {
        self.settings.get_or_init(Settings::default)
    }
}
