//! The workspace interface request handlers read documents through.

use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use super::state::{Notebook, TextDocument};

/// How to look up a notebook: by its own URI, or by the URI of one of its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotebookQuery<'a> {
    Notebook(&'a Url),
    Cell(&'a Url),
}

/// Read access to the current in-memory state of open documents.
///
/// Every operation a request handler needs is listed here so that views
/// over a workspace can forward them explicitly.
pub trait Workspace {
    /// Find an open notebook.
    fn notebook(&self, query: NotebookQuery<'_>) -> Option<Arc<Notebook>>;

    /// Get an open text document.
    fn text_document(&self, uri: &Url) -> Option<Arc<TextDocument>>;
}
