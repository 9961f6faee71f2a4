//! Hover information for identifiers.

use tower_lsp::lsp_types::{Hover, HoverContents, HoverParams, MarkupContent, MarkupKind};

use super::words::{occurrences, word_at};
use crate::document::Workspace;
use crate::session::Session;

/// Describe the identifier under the cursor.
pub fn hover<S: Session + ?Sized>(session: &S, params: HoverParams) -> Option<Hover> {
    let position_params = params.text_document_position_params;
    let document = session
        .workspace()
        .text_document(&position_params.text_document.uri)?;
    let word = word_at(&document, position_params.position)?;
    if session.settings().analysis.is_ignored(&word.text) {
        return None;
    }

    let count = occurrences(&document, &word.text).len();
    let plural = if count == 1 { "" } else { "s" };
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("`{}`\n\n{count} occurrence{plural}", word.text),
        }),
        range: Some(word.range),
    })
}
