//! Forwarding views that present a notebook as one flat document.

use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use super::mapper::NotebookMapper;
use crate::document::{Notebook, NotebookQuery, TextDocument, Workspace};
use crate::session::Session;
use crate::settings::Settings;

/// A workspace that forwards everything to `inner`, except that reading the
/// active notebook, or any of its cells, yields the concatenated notebook.
#[derive(Debug)]
pub struct NotebookView<'w, W: ?Sized> {
    inner: &'w W,
    notebook: Option<Url>,
}

impl<'w, W: Workspace + ?Sized> NotebookView<'w, W> {
    /// A view that substitutes nothing.
    pub fn passthrough(inner: &'w W) -> Self {
        Self {
            inner,
            notebook: None,
        }
    }

    /// A view that substitutes the notebook at `notebook`.
    pub fn for_notebook(inner: &'w W, notebook: Url) -> Self {
        Self {
            inner,
            notebook: Some(notebook),
        }
    }

    fn is_substituted(&self, notebook: &Url, uri: &Url) -> bool {
        uri == notebook
            || self
                .inner
                .notebook(NotebookQuery::Cell(uri))
                .is_some_and(|owner| owner.uri == *notebook)
    }
}

impl<W: Workspace + ?Sized> Workspace for NotebookView<'_, W> {
    fn notebook(&self, query: NotebookQuery<'_>) -> Option<Arc<Notebook>> {
        self.inner.notebook(query)
    }

    fn text_document(&self, uri: &Url) -> Option<Arc<TextDocument>> {
        if let Some(notebook) = &self.notebook {
            if self.is_substituted(notebook, uri) {
                if let Some(mapper) =
                    NotebookMapper::build(self.inner, NotebookQuery::Notebook(notebook))
                {
                    return Some(Arc::new(mapper.to_text_document()));
                }
            }
        }
        self.inner.text_document(uri)
    }
}

/// A session that forwards to `inner` but reads documents through a [`NotebookView`].
pub struct NotebookSession<'s, S: Session + ?Sized> {
    inner: &'s S,
    workspace: NotebookView<'s, S::Workspace>,
}

impl<'s, S: Session + ?Sized> NotebookSession<'s, S> {
    pub fn new(inner: &'s S, notebook: Option<Url>) -> Self {
        let workspace = match notebook {
            Some(uri) => NotebookView::for_notebook(inner.workspace(), uri),
            None => NotebookView::passthrough(inner.workspace()),
        };
        Self { inner, workspace }
    }
}

impl<'s, S: Session + ?Sized> Session for NotebookSession<'s, S> {
    type Workspace = NotebookView<'s, S::Workspace>;

    fn workspace(&self) -> &Self::Workspace {
        &self.workspace
    }

    fn settings(&self) -> &Settings {
        self.inner.settings()
    }
}
