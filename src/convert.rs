//! Conversion between notebook sync notifications and document store types.
//!
//! `tower-lsp` is built on an `lsp-types` release without the notebook
//! protocol, so notebook notifications are decoded with the newer
//! `lsp_types` crate and converted here before they reach the store.

use tower_lsp::lsp_types::{
    Position, Range, Registration, TextDocumentContentChangeEvent, TextDocumentItem, Url,
};

use crate::document::{CellSplice, CellTextChange, NotebookChange};
use crate::error::ConvertError;

/// Method used to register notebook synchronization dynamically.
pub const NOTEBOOK_SYNC_METHOD: &str = "notebookDocument/sync";

/// A notebook opened by the client, with the text of its cells.
#[derive(Debug, Clone)]
pub struct NotebookOpen {
    pub uri: Url,
    pub version: i32,
    pub cells: Vec<Url>,
    pub cell_documents: Vec<TextDocumentItem>,
}

/// A notebook closed by the client.
#[derive(Debug, Clone)]
pub struct NotebookClose {
    pub uri: Url,
    pub cells: Vec<Url>,
}

/// Convert an lsp-types URI to a `Url`.
pub fn uri_from_lsp(uri: &lsp_types::Uri) -> Result<Url, ConvertError> {
    Url::parse(uri.as_str()).map_err(|_| ConvertError::InvalidUri(uri.as_str().to_string()))
}

fn uris_from_lsp<'a>(
    uris: impl IntoIterator<Item = &'a lsp_types::Uri>,
) -> Result<Vec<Url>, ConvertError> {
    uris.into_iter().map(uri_from_lsp).collect()
}

/// Convert an lsp-types Position to a tower_lsp Position.
pub fn position_from_lsp(position: lsp_types::Position) -> Position {
    Position::new(position.line, position.character)
}

/// Convert an lsp-types Range to a tower_lsp Range.
pub fn range_from_lsp(range: lsp_types::Range) -> Range {
    Range::new(position_from_lsp(range.start), position_from_lsp(range.end))
}

pub fn content_change_from_lsp(
    change: lsp_types::TextDocumentContentChangeEvent,
) -> TextDocumentContentChangeEvent {
    TextDocumentContentChangeEvent {
        range: change.range.map(range_from_lsp),
        range_length: change.range_length,
        text: change.text,
    }
}

pub fn text_document_item_from_lsp(
    item: lsp_types::TextDocumentItem,
) -> Result<TextDocumentItem, ConvertError> {
    Ok(TextDocumentItem::new(
        uri_from_lsp(&item.uri)?,
        item.language_id,
        item.version,
        item.text,
    ))
}

fn text_document_items_from_lsp(
    items: Vec<lsp_types::TextDocumentItem>,
) -> Result<Vec<TextDocumentItem>, ConvertError> {
    items.into_iter().map(text_document_item_from_lsp).collect()
}

/// Convert a `notebookDocument/didOpen` notification.
pub fn notebook_open(
    params: lsp_types::DidOpenNotebookDocumentParams,
) -> Result<NotebookOpen, ConvertError> {
    let notebook = params.notebook_document;
    Ok(NotebookOpen {
        uri: uri_from_lsp(&notebook.uri)?,
        version: notebook.version,
        cells: uris_from_lsp(notebook.cells.iter().map(|cell| &cell.document))?,
        cell_documents: text_document_items_from_lsp(params.cell_text_documents)?,
    })
}

/// Convert a `notebookDocument/didChange` notification.
///
/// Cell metadata changes carry nothing the store tracks and are ignored.
pub fn notebook_change(
    params: lsp_types::DidChangeNotebookDocumentParams,
) -> Result<NotebookChange, ConvertError> {
    let notebook = params.notebook_document;
    let mut change = NotebookChange::new(uri_from_lsp(&notebook.uri)?, notebook.version);
    let Some(cells) = params.change.cells else {
        return Ok(change);
    };

    if let Some(structure) = cells.structure {
        change.opened = text_document_items_from_lsp(structure.did_open.unwrap_or_default())?;
        change.closed = uris_from_lsp(
            structure
                .did_close
                .iter()
                .flatten()
                .map(|document| &document.uri),
        )?;
        let array = structure.array;
        change.splice = Some(CellSplice {
            start: array.start as usize,
            delete_count: array.delete_count as usize,
            cells: uris_from_lsp(array.cells.iter().flatten().map(|cell| &cell.document))?,
        });
    }

    for content in cells.text_content.unwrap_or_default() {
        change.text_content.push(CellTextChange {
            uri: uri_from_lsp(&content.document.uri)?,
            version: content.document.version,
            changes: content
                .changes
                .into_iter()
                .map(content_change_from_lsp)
                .collect(),
        });
    }
    Ok(change)
}

/// Convert a `notebookDocument/didClose` notification.
pub fn notebook_close(
    params: lsp_types::DidCloseNotebookDocumentParams,
) -> Result<NotebookClose, ConvertError> {
    Ok(NotebookClose {
        uri: uri_from_lsp(&params.notebook_document.uri)?,
        cells: uris_from_lsp(params.cell_text_documents.iter().map(|document| &document.uri))?,
    })
}

/// Registration asking the client to sync notebooks whose cells are in `cell_language`.
pub fn notebook_sync_registration(cell_language: &str) -> Registration {
    let options = lsp_types::NotebookDocumentSyncOptions {
        notebook_selector: vec![lsp_types::NotebookSelector::ByCells {
            notebook: None,
            cells: vec![lsp_types::NotebookCellSelector {
                language: cell_language.to_string(),
            }],
        }],
        save: None,
    };
    Registration {
        id: NOTEBOOK_SYNC_METHOD.to_string(),
        method: NOTEBOOK_SYNC_METHOD.to_string(),
        register_options: serde_json::to_value(options).ok(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn open_lists_cells_in_order() {
        let params = serde_json::from_value(json!({
            "notebookDocument": {
                "uri": "file:///nb.ipynb",
                "notebookType": "jupyter-notebook",
                "version": 3,
                "cells": [
                    { "kind": 2, "document": "cell://a" },
                    { "kind": 1, "document": "cell://b" }
                ]
            },
            "cellTextDocuments": [
                { "uri": "cell://a", "languageId": "python", "version": 1, "text": "x = 1" }
            ]
        }))
        .unwrap();

        let open = notebook_open(params).unwrap();
        assert_eq!(open.uri, url("file:///nb.ipynb"));
        assert_eq!(open.version, 3);
        assert_eq!(open.cells, vec![url("cell://a"), url("cell://b")]);
        assert_eq!(open.cell_documents.len(), 1);
        assert_eq!(open.cell_documents[0].uri, url("cell://a"));
        assert_eq!(open.cell_documents[0].text, "x = 1");
    }

    #[test]
    fn change_carries_structure_and_text() {
        let params = serde_json::from_value(json!({
            "notebookDocument": { "uri": "file:///nb.ipynb", "version": 4 },
            "change": {
                "cells": {
                    "structure": {
                        "array": {
                            "start": 1,
                            "deleteCount": 1,
                            "cells": [{ "kind": 2, "document": "cell://c" }]
                        },
                        "didOpen": [
                            { "uri": "cell://c", "languageId": "python", "version": 1, "text": "z" }
                        ],
                        "didClose": [{ "uri": "cell://b" }]
                    },
                    "textContent": [{
                        "document": { "uri": "cell://a", "version": 7 },
                        "changes": [{
                            "range": {
                                "start": { "line": 0, "character": 0 },
                                "end": { "line": 0, "character": 1 }
                            },
                            "text": "w"
                        }]
                    }]
                }
            }
        }))
        .unwrap();

        let change = notebook_change(params).unwrap();
        assert_eq!(change.uri, url("file:///nb.ipynb"));
        assert_eq!(change.version, 4);
        assert_eq!(change.opened[0].uri, url("cell://c"));
        assert_eq!(change.closed, vec![url("cell://b")]);

        let splice = change.splice.unwrap();
        assert_eq!((splice.start, splice.delete_count), (1, 1));
        assert_eq!(splice.cells, vec![url("cell://c")]);

        assert_eq!(change.text_content.len(), 1);
        let content = &change.text_content[0];
        assert_eq!((content.uri.clone(), content.version), (url("cell://a"), 7));
        assert_eq!(
            content.changes[0].range,
            Some(Range::new(Position::new(0, 0), Position::new(0, 1)))
        );
        assert_eq!(content.changes[0].text, "w");
    }

    #[test]
    fn version_only_change_has_no_structure() {
        let params = serde_json::from_value(json!({
            "notebookDocument": { "uri": "file:///nb.ipynb", "version": 5 },
            "change": {}
        }))
        .unwrap();

        let change = notebook_change(params).unwrap();
        assert_eq!(change.version, 5);
        assert!(change.splice.is_none());
        assert!(change.opened.is_empty());
        assert!(change.text_content.is_empty());
    }

    #[test]
    fn close_lists_cell_documents() {
        let params = serde_json::from_value(json!({
            "notebookDocument": { "uri": "file:///nb.ipynb" },
            "cellTextDocuments": [{ "uri": "cell://a" }, { "uri": "cell://b" }]
        }))
        .unwrap();

        let close = notebook_close(params).unwrap();
        assert_eq!(close.uri, url("file:///nb.ipynb"));
        assert_eq!(close.cells, vec![url("cell://a"), url("cell://b")]);
    }

    #[test]
    fn sync_registration_selects_cell_language() {
        let registration = notebook_sync_registration("julia");
        assert_eq!(registration.method, "notebookDocument/sync");

        let options = registration.register_options.unwrap();
        assert_eq!(
            options["notebookSelector"][0]["cells"][0]["language"],
            json!("julia")
        );
    }
}
