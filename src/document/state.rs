//! Document state management for open text documents and notebooks.

use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, TextDocumentItem, Url};
use tracing::{debug, warn};

use super::text::LineIndex;
use super::workspace::{NotebookQuery, Workspace};

/// State for a single text document: a plain file or one notebook cell.
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub uri: Url,
    /// Document version from the client. `None` for synthesized documents.
    pub version: Option<i32>,
    /// Pre-computed line index for position conversion.
    pub line_index: LineIndex,
}

impl TextDocument {
    pub fn new(uri: Url, source: String, version: Option<i32>) -> Self {
        Self {
            uri,
            version,
            line_index: LineIndex::new(source),
        }
    }

    /// The full source text.
    pub fn source(&self) -> &str {
        self.line_index.source()
    }

    /// Number of lines in the document (see [`LineIndex::line_count`]).
    pub fn line_count(&self) -> usize {
        self.line_index.line_count()
    }

    /// Apply content changes in order, producing the next document state.
    ///
    /// A change without a range replaces the whole text. Ranged changes whose
    /// start line is out of bounds are skipped.
    pub fn with_changes(
        &self,
        changes: impl IntoIterator<Item = TextDocumentContentChangeEvent>,
        version: i32,
    ) -> Self {
        let mut index = self.line_index.clone();
        for change in changes {
            let Some(range) = change.range else {
                index = LineIndex::new(change.text);
                continue;
            };
            let start = index.position_to_offset(range.start);
            let end = index.position_to_offset(range.end);
            let (Some(start), end) = (start, end) else {
                warn!(uri = %self.uri, ?range, "dropping change outside document");
                continue;
            };
            let end = end.unwrap_or(index.source().len()).max(start);
            let mut source = index.source().to_string();
            source.replace_range(start..end, &change.text);
            index = LineIndex::new(source);
        }
        Self {
            uri: self.uri.clone(),
            version: Some(version),
            line_index: index,
        }
    }
}

/// An open notebook: an ordered list of cell document URIs.
///
/// Cell order defines how cells are concatenated into one virtual document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notebook {
    pub uri: Url,
    pub version: i32,
    pub cells: Vec<Url>,
}

/// Replace `delete_count` cells starting at `start` with `cells`.
#[derive(Debug, Clone, Default)]
pub struct CellSplice {
    pub start: usize,
    pub delete_count: usize,
    pub cells: Vec<Url>,
}

/// Content changes for one cell document.
#[derive(Debug, Clone)]
pub struct CellTextChange {
    pub uri: Url,
    pub version: i32,
    pub changes: Vec<TextDocumentContentChangeEvent>,
}

/// A change to an open notebook.
///
/// Applied in this order: `opened` cell documents, the `splice`, `closed`
/// cell documents, then `text_content` in sequence.
#[derive(Debug, Clone)]
pub struct NotebookChange {
    pub uri: Url,
    pub version: i32,
    pub opened: Vec<TextDocumentItem>,
    pub splice: Option<CellSplice>,
    pub closed: Vec<Url>,
    pub text_content: Vec<CellTextChange>,
}

impl NotebookChange {
    /// A change that only bumps the notebook version.
    pub fn new(uri: Url, version: i32) -> Self {
        Self {
            uri,
            version,
            opened: Vec::new(),
            splice: None,
            closed: Vec::new(),
            text_content: Vec::new(),
        }
    }
}

/// Thread-safe storage for open documents and notebooks.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Arc<TextDocument>>,
    notebooks: DashMap<Url, Arc<Notebook>>,
    /// Cell URI -> URI of the notebook that owns it.
    cell_notebooks: DashMap<Url, Url>,
}

impl DocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace a text document.
    pub fn open(&self, uri: Url, text: String, version: i32) -> Arc<TextDocument> {
        let state = Arc::new(TextDocument::new(uri.clone(), text, Some(version)));
        self.documents.insert(uri, Arc::clone(&state));
        state
    }

    /// Apply content changes to an open document.
    pub fn change(
        &self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Option<Arc<TextDocument>> {
        let current = self.get(uri)?;
        let next = Arc::new(current.with_changes(changes, version));
        self.documents.insert(uri.clone(), Arc::clone(&next));
        Some(next)
    }

    /// Close a document.
    pub fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    /// Get a document's state.
    pub fn get(&self, uri: &Url) -> Option<Arc<TextDocument>> {
        self.documents.get(uri).map(|r| Arc::clone(&r))
    }

    /// Open a notebook together with the text of its cells.
    ///
    /// Re-opening a notebook replaces its cell list; cells only the old list
    /// had are unlinked.
    pub fn open_notebook(
        &self,
        uri: Url,
        version: i32,
        cells: Vec<Url>,
        cell_documents: Vec<TextDocumentItem>,
    ) {
        if let Some(previous) = self.notebooks.get(&uri).map(|n| Arc::clone(&n)) {
            for cell in &previous.cells {
                self.unlink_cell(cell, &uri);
            }
        }
        for item in cell_documents {
            self.open(item.uri, item.text, item.version);
        }
        for cell in &cells {
            self.cell_notebooks.insert(cell.clone(), uri.clone());
        }
        debug!(notebook = %uri, cells = cells.len(), "opened notebook");
        self.notebooks
            .insert(uri.clone(), Arc::new(Notebook { uri, version, cells }));
    }

    /// Update a notebook's version and, optionally, its cell structure.
    ///
    /// Cells removed by the splice are unlinked from the notebook; their text
    /// documents stay open until closed explicitly.
    pub fn update_notebook(&self, uri: &Url, version: i32, splice: Option<CellSplice>) {
        let Some(current) = self.notebooks.get(uri).map(|n| Arc::clone(&n)) else {
            warn!(notebook = %uri, "change for unknown notebook");
            return;
        };
        let mut next = Notebook::clone(&current);
        next.version = version;

        if let Some(splice) = splice {
            let start = splice.start.min(next.cells.len());
            let end = (start + splice.delete_count).min(next.cells.len());
            let removed: Vec<Url> = next
                .cells
                .splice(start..end, splice.cells.iter().cloned())
                .collect();
            for cell in removed {
                if !next.cells.contains(&cell) {
                    self.unlink_cell(&cell, uri);
                }
            }
            for cell in splice.cells {
                self.cell_notebooks.insert(cell, uri.clone());
            }
        }

        self.notebooks.insert(uri.clone(), Arc::new(next));
    }

    /// Apply a notebook change: cell documents, structure, then cell text.
    pub fn apply_notebook_change(&self, change: NotebookChange) {
        for item in change.opened {
            self.open(item.uri, item.text, item.version);
        }
        self.update_notebook(&change.uri, change.version, change.splice);
        for cell in &change.closed {
            self.close(cell);
        }
        for content in change.text_content {
            if self
                .change(&content.uri, content.version, content.changes)
                .is_none()
            {
                debug!(cell = %content.uri, "change for unknown cell");
            }
        }
    }

    /// Close a notebook and all of its cell documents.
    pub fn close_notebook(&self, uri: &Url) {
        let Some((_, notebook)) = self.notebooks.remove(uri) else {
            return;
        };
        for cell in &notebook.cells {
            self.unlink_cell(cell, uri);
            self.documents.remove(cell);
        }
        debug!(notebook = %uri, "closed notebook");
    }

    /// Remove the link from `cell` to `notebook`, leaving links to other notebooks alone.
    fn unlink_cell(&self, cell: &Url, notebook: &Url) {
        self.cell_notebooks
            .remove_if(cell, |_, owner| owner == notebook);
    }
}

impl Workspace for DocumentStore {
    fn notebook(&self, query: NotebookQuery<'_>) -> Option<Arc<Notebook>> {
        let uri = match query {
            NotebookQuery::Notebook(uri) => uri.clone(),
            NotebookQuery::Cell(cell) => self.cell_notebooks.get(cell)?.value().clone(),
        };
        self.notebooks.get(&uri).map(|n| Arc::clone(&n))
    }

    fn text_document(&self, uri: &Url) -> Option<Arc<TextDocument>> {
        self.get(uri)
    }
}

#[cfg(test)]
mod tests {
    use tower_lsp::lsp_types::{Position, Range};

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn item(uri: &str, text: &str) -> TextDocumentItem {
        TextDocumentItem::new(url(uri), "python".to_string(), 1, text.to_string())
    }

    #[test]
    fn ranged_change_splices_text() {
        let doc = TextDocument::new(url("file:///a.py"), "x = 1\ny = 2".to_string(), Some(1));
        let change = TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(1, 4), Position::new(1, 5))),
            range_length: None,
            text: "42".to_string(),
        };
        let next = doc.with_changes([change], 2);
        assert_eq!(next.source(), "x = 1\ny = 42");
        assert_eq!(next.version, Some(2));
    }

    #[test]
    fn full_change_replaces_text() {
        let doc = TextDocument::new(url("file:///a.py"), "old".to_string(), Some(1));
        let change = TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new\ntext".to_string(),
        };
        assert_eq!(doc.with_changes([change], 2).source(), "new\ntext");
    }

    #[test]
    fn notebook_lookup_by_cell() {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://doc"),
            1,
            vec![url("cell://a"), url("cell://b")],
            vec![item("cell://a", "x"), item("cell://b", "y")],
        );

        let by_cell = store.notebook(NotebookQuery::Cell(&url("cell://b"))).unwrap();
        assert_eq!(by_cell.uri, url("nb://doc"));
        assert!(store.notebook(NotebookQuery::Cell(&url("nb://doc"))).is_none());
        assert!(store.notebook(NotebookQuery::Notebook(&url("cell://a"))).is_none());
    }

    #[test]
    fn splice_relinks_cells() {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://doc"),
            1,
            vec![url("cell://a"), url("cell://b")],
            vec![item("cell://a", "x"), item("cell://b", "y")],
        );
        store.update_notebook(
            &url("nb://doc"),
            2,
            Some(CellSplice {
                start: 0,
                delete_count: 1,
                cells: vec![url("cell://c")],
            }),
        );

        let notebook = store.notebook(NotebookQuery::Notebook(&url("nb://doc"))).unwrap();
        assert_eq!(notebook.cells, vec![url("cell://c"), url("cell://b")]);
        assert_eq!(notebook.version, 2);
        assert!(store.notebook(NotebookQuery::Cell(&url("cell://a"))).is_none());
        assert!(store.notebook(NotebookQuery::Cell(&url("cell://c"))).is_some());
    }

    #[test]
    fn reopen_unlinks_cells_missing_from_new_list() {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://doc"),
            1,
            vec![url("cell://a"), url("cell://b")],
            vec![item("cell://a", "x"), item("cell://b", "y")],
        );
        store.open_notebook(url("nb://doc"), 2, vec![url("cell://c")], vec![item("cell://c", "z")]);

        assert!(store.notebook(NotebookQuery::Cell(&url("cell://b"))).is_none());
        assert!(store.notebook(NotebookQuery::Cell(&url("cell://a"))).is_none());
        let notebook = store.notebook(NotebookQuery::Cell(&url("cell://c"))).unwrap();
        assert_eq!(notebook.cells, vec![url("cell://c")]);
    }

    #[test]
    fn splice_keeps_links_owned_by_other_notebooks() {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://one"),
            1,
            vec![url("cell://shared")],
            vec![item("cell://shared", "x")],
        );
        store.open_notebook(url("nb://two"), 1, vec![url("cell://shared")], vec![]);
        store.update_notebook(
            &url("nb://one"),
            2,
            Some(CellSplice {
                start: 0,
                delete_count: 1,
                cells: vec![],
            }),
        );

        let owner = store.notebook(NotebookQuery::Cell(&url("cell://shared"))).unwrap();
        assert_eq!(owner.uri, url("nb://two"));
    }

    #[test]
    fn notebook_change_applies_structure_before_text() {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://doc"),
            1,
            vec![url("cell://a"), url("cell://b")],
            vec![item("cell://a", "x = 1"), item("cell://b", "y")],
        );

        let change = NotebookChange {
            opened: vec![item("cell://c", "z = 1")],
            splice: Some(CellSplice {
                start: 1,
                delete_count: 1,
                cells: vec![url("cell://c")],
            }),
            closed: vec![url("cell://b")],
            text_content: vec![
                CellTextChange {
                    uri: url("cell://c"),
                    version: 2,
                    changes: vec![TextDocumentContentChangeEvent {
                        range: Some(Range::new(Position::new(0, 4), Position::new(0, 5))),
                        range_length: None,
                        text: "2".to_string(),
                    }],
                },
                CellTextChange {
                    uri: url("cell://c"),
                    version: 3,
                    changes: vec![TextDocumentContentChangeEvent {
                        range: Some(Range::new(Position::new(0, 5), Position::new(0, 5))),
                        range_length: None,
                        text: "0".to_string(),
                    }],
                },
            ],
            ..NotebookChange::new(url("nb://doc"), 2)
        };
        store.apply_notebook_change(change);

        let notebook = store.notebook(NotebookQuery::Notebook(&url("nb://doc"))).unwrap();
        assert_eq!(notebook.cells, vec![url("cell://a"), url("cell://c")]);
        assert_eq!(notebook.version, 2);
        assert!(store.get(&url("cell://b")).is_none());
        assert!(store.notebook(NotebookQuery::Cell(&url("cell://b"))).is_none());

        let cell = store.get(&url("cell://c")).unwrap();
        assert_eq!(cell.source(), "z = 20");
        assert_eq!(cell.version, Some(3));
    }

    #[test]
    fn close_notebook_drops_cells() {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://doc"),
            1,
            vec![url("cell://a")],
            vec![item("cell://a", "x")],
        );
        store.close_notebook(&url("nb://doc"));
        assert!(store.get(&url("cell://a")).is_none());
        assert!(store.notebook(NotebookQuery::Cell(&url("cell://a"))).is_none());
    }
}
