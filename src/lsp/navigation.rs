//! Definition, references and highlights by identifier name.

use tower_lsp::lsp_types::{
    DocumentHighlight, DocumentHighlightKind, DocumentHighlightParams, GotoDefinitionParams,
    GotoDefinitionResponse, Location, Position, Range, ReferenceParams, Url,
};

use super::words::{occurrences, word_at};
use crate::document::Workspace;
use crate::session::Session;

/// Resolve the identifier at `position` to its occurrences in the document.
fn resolve<S: Session + ?Sized>(
    session: &S,
    uri: &Url,
    position: Position,
) -> Option<(Url, Vec<Range>)> {
    let document = session.workspace().text_document(uri)?;
    let word = word_at(&document, position)?;
    if session.settings().analysis.is_ignored(&word.text) {
        return None;
    }
    Some((document.uri.clone(), occurrences(&document, &word.text)))
}

/// The first occurrence of the identifier is taken as its definition.
pub fn goto_definition<S: Session + ?Sized>(
    session: &S,
    params: GotoDefinitionParams,
) -> Option<GotoDefinitionResponse> {
    let position_params = params.text_document_position_params;
    let (uri, ranges) = resolve(
        session,
        &position_params.text_document.uri,
        position_params.position,
    )?;
    let first = *ranges.first()?;
    Some(GotoDefinitionResponse::Scalar(Location::new(uri, first)))
}

pub fn references<S: Session + ?Sized>(session: &S, params: ReferenceParams) -> Option<Vec<Location>> {
    let position_params = params.text_document_position;
    let (uri, ranges) = resolve(
        session,
        &position_params.text_document.uri,
        position_params.position,
    )?;
    let skip = usize::from(!params.context.include_declaration);
    Some(
        ranges
            .into_iter()
            .skip(skip)
            .map(|range| Location::new(uri.clone(), range))
            .collect(),
    )
}

pub fn document_highlight<S: Session + ?Sized>(
    session: &S,
    params: DocumentHighlightParams,
) -> Option<Vec<DocumentHighlight>> {
    let position_params = params.text_document_position_params;
    let (_, ranges) = resolve(
        session,
        &position_params.text_document.uri,
        position_params.position,
    )?;
    Some(
        ranges
            .into_iter()
            .map(|range| DocumentHighlight {
                range,
                kind: Some(DocumentHighlightKind::TEXT),
            })
            .collect(),
    )
}
