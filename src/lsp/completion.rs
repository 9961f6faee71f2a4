//! Completion from identifiers already present in the document.

use std::collections::BTreeSet;

use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse};

use super::words::{prefix_at, words};
use crate::document::Workspace;
use crate::session::Session;

pub fn completion<S: Session + ?Sized>(
    session: &S,
    params: CompletionParams,
) -> Option<CompletionResponse> {
    let position_params = params.text_document_position;
    let document = session
        .workspace()
        .text_document(&position_params.text_document.uri)?;
    let prefix = prefix_at(&document, position_params.position)?;
    if prefix.is_empty() {
        return None;
    }

    let analysis = &session.settings().analysis;
    let candidates: BTreeSet<String> = words(&document)
        .map(|word| word.text)
        .filter(|text| text.starts_with(&prefix) && *text != prefix && !analysis.is_ignored(text))
        .collect();

    let items = candidates
        .into_iter()
        .map(|label| CompletionItem {
            label,
            kind: Some(CompletionItemKind::TEXT),
            ..Default::default()
        })
        .collect();
    Some(CompletionResponse::Array(items))
}
