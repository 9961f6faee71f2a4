//! Grouping of converted edits by destination cell.

use indexmap::IndexMap;
use tower_lsp::lsp_types::{
    AnnotatedTextEdit, OneOf, OptionalVersionedTextDocumentIdentifier, TextDocumentEdit, TextEdit,
    Url,
};

/// Edits grouped by cell URI.
///
/// Groups keep the order in which their cell was first seen, and edits keep
/// their insertion order within a group.
#[derive(Debug, Clone)]
pub struct CellEdits<E> {
    groups: IndexMap<Url, Vec<E>>,
}

impl<E> Default for CellEdits<E> {
    fn default() -> Self {
        Self {
            groups: IndexMap::new(),
        }
    }
}

impl<E> CellEdits<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: Url, edit: E) {
        self.groups.entry(cell).or_default().push(edit);
    }

    pub fn into_groups(self) -> impl Iterator<Item = (Url, Vec<E>)> {
        self.groups.into_iter()
    }
}

impl CellEdits<OneOf<TextEdit, AnnotatedTextEdit>> {
    /// One `TextDocumentEdit` per cell, stamped with `version(cell)`.
    pub fn into_document_edits(self, version: impl Fn(&Url) -> i32) -> Vec<TextDocumentEdit> {
        self.into_groups()
            .map(|(uri, edits)| TextDocumentEdit {
                text_document: OptionalVersionedTextDocumentIdentifier {
                    version: Some(version(&uri)),
                    uri,
                },
                edits,
            })
            .collect()
    }
}
