//! Rename an identifier throughout its document.

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{
    DocumentChanges, OneOf, OptionalVersionedTextDocumentIdentifier, RenameParams,
    TextDocumentEdit, TextEdit, WorkspaceEdit,
};

use super::words::{occurrences, word_at};
use crate::document::Workspace;
use crate::session::Session;

static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Replace every occurrence of the identifier under the cursor with `new_name`.
///
/// Returns `None` if there is nothing to rename or `new_name` is not an identifier.
pub fn rename<S: Session + ?Sized>(session: &S, params: RenameParams) -> Option<WorkspaceEdit> {
    if !VALID_NAME.is_match(&params.new_name) {
        return None;
    }
    let position_params = params.text_document_position;
    let document = session
        .workspace()
        .text_document(&position_params.text_document.uri)?;
    let word = word_at(&document, position_params.position)?;
    if session.settings().analysis.is_ignored(&word.text) {
        return None;
    }

    let edits = occurrences(&document, &word.text)
        .into_iter()
        .map(|range| OneOf::Left(TextEdit::new(range, params.new_name.clone())))
        .collect();
    Some(WorkspaceEdit {
        document_changes: Some(DocumentChanges::Edits(vec![TextDocumentEdit {
            text_document: OptionalVersionedTextDocumentIdentifier {
                uri: document.uri.clone(),
                version: document.version,
            },
            edits,
        }])),
        ..Default::default()
    })
}
