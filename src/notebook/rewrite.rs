//! Rewriting of position-bearing requests and their results.
//!
//! A request addressed to a notebook cell goes through three steps:
//!
//! 1. [`NotebookRequest::new`] moves the request's position and range from
//!    cell space into the concatenated notebook.
//! 2. [`NotebookRequest::invoke`] runs the handler against a
//!    [`NotebookSession`] whose workspace yields the concatenated notebook
//!    when the cell is read.
//! 3. The result is moved back into cell space through [`NotebookResult`].
//!
//! Requests for documents outside any notebook run unchanged.

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    CodeActionParams, CompletionParams, CompletionResponse, DocumentChangeOperation,
    DocumentChanges, DocumentHighlight, DocumentHighlightParams, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverParams, Location, Position, Range, ReferenceParams,
    RenameParams, TextDocumentEdit, TextDocumentPositionParams, TextEdit, Url, WorkspaceEdit,
};
use tracing::debug;

use super::mapper::NotebookMapper;
use super::view::NotebookSession;
use crate::document::{NotebookQuery, Workspace};
use crate::session::Session;

/// Request parameters that address a document and may carry a position or range.
///
/// The `with_*` methods return the same parameters with only that field replaced.
pub trait PositionalParams {
    fn document_uri(&self) -> &Url;

    fn position(&self) -> Option<Position> {
        None
    }

    fn with_position(self, _position: Position) -> Self
    where
        Self: Sized,
    {
        self
    }

    fn range(&self) -> Option<Range> {
        None
    }

    fn with_range(self, _range: Range) -> Self
    where
        Self: Sized,
    {
        self
    }
}

impl PositionalParams for TextDocumentPositionParams {
    fn document_uri(&self) -> &Url {
        &self.text_document.uri
    }

    fn position(&self) -> Option<Position> {
        Some(self.position)
    }

    fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

impl PositionalParams for HoverParams {
    fn document_uri(&self) -> &Url {
        self.text_document_position_params.document_uri()
    }

    fn position(&self) -> Option<Position> {
        self.text_document_position_params.position()
    }

    fn with_position(mut self, position: Position) -> Self {
        self.text_document_position_params.position = position;
        self
    }
}

impl PositionalParams for GotoDefinitionParams {
    fn document_uri(&self) -> &Url {
        self.text_document_position_params.document_uri()
    }

    fn position(&self) -> Option<Position> {
        self.text_document_position_params.position()
    }

    fn with_position(mut self, position: Position) -> Self {
        self.text_document_position_params.position = position;
        self
    }
}

impl PositionalParams for DocumentHighlightParams {
    fn document_uri(&self) -> &Url {
        self.text_document_position_params.document_uri()
    }

    fn position(&self) -> Option<Position> {
        self.text_document_position_params.position()
    }

    fn with_position(mut self, position: Position) -> Self {
        self.text_document_position_params.position = position;
        self
    }
}

impl PositionalParams for ReferenceParams {
    fn document_uri(&self) -> &Url {
        self.text_document_position.document_uri()
    }

    fn position(&self) -> Option<Position> {
        self.text_document_position.position()
    }

    fn with_position(mut self, position: Position) -> Self {
        self.text_document_position.position = position;
        self
    }
}

impl PositionalParams for CompletionParams {
    fn document_uri(&self) -> &Url {
        self.text_document_position.document_uri()
    }

    fn position(&self) -> Option<Position> {
        self.text_document_position.position()
    }

    fn with_position(mut self, position: Position) -> Self {
        self.text_document_position.position = position;
        self
    }
}

impl PositionalParams for RenameParams {
    fn document_uri(&self) -> &Url {
        self.text_document_position.document_uri()
    }

    fn position(&self) -> Option<Position> {
        self.text_document_position.position()
    }

    fn with_position(mut self, position: Position) -> Self {
        self.text_document_position.position = position;
        self
    }
}

impl PositionalParams for CodeActionParams {
    fn document_uri(&self) -> &Url {
        &self.text_document.uri
    }

    fn range(&self) -> Option<Range> {
        Some(self.range)
    }

    fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }
}

/// Context for moving a result from notebook space back into cell space.
pub struct CellSpace<'a, W: ?Sized> {
    workspace: &'a W,
    /// The document the request was addressed to.
    origin: &'a Url,
}

impl<'a, W: Workspace + ?Sized> CellSpace<'a, W> {
    pub fn new(workspace: &'a W, origin: &'a Url) -> Self {
        Self { workspace, origin }
    }

    /// Mapper for the notebook the request's document belongs to.
    pub fn origin_mapper(&self) -> Option<NotebookMapper> {
        NotebookMapper::build(self.workspace, NotebookQuery::Cell(self.origin))
    }

    /// Move a notebook range into the originating cell.
    ///
    /// Returns `None` if the range does not map to a single cell, or maps to
    /// a cell other than the one the request was addressed to.
    pub fn origin_range(&self, mapper: &NotebookMapper, range: Range) -> Option<Range> {
        mapper
            .cell_range(range)
            .filter(|location| location.uri == *self.origin)
            .map(|location| location.range)
    }

    /// Move a location into cell space.
    ///
    /// Locations outside any notebook are returned as is; locations in a
    /// notebook that do not fit in one cell yield `None`.
    pub fn location(&self, location: Location) -> Option<Location> {
        match NotebookMapper::build(self.workspace, NotebookQuery::Notebook(&location.uri)) {
            None => Some(location),
            Some(mapper) => {
                let converted = mapper.cell_location(&location);
                if converted.is_none() {
                    debug!(?location, "dropping location spanning cells");
                }
                converted
            }
        }
    }

    pub fn locations(&self, locations: Vec<Location>) -> Vec<Location> {
        locations
            .into_iter()
            .filter_map(|location| self.location(location))
            .collect()
    }

    /// Split a document edit targeting a notebook into per-cell edits.
    pub fn document_edits(&self, edit: TextDocumentEdit) -> Vec<TextDocumentEdit> {
        let uri = &edit.text_document.uri;
        match NotebookMapper::build(self.workspace, NotebookQuery::Notebook(uri)) {
            None => vec![edit],
            Some(mapper) => mapper.cell_text_document_edits(&edit),
        }
    }

    /// Regroup a `WorkspaceEdit.changes` map so notebook entries become cell entries.
    pub fn changes(&self, changes: HashMap<Url, Vec<TextEdit>>) -> HashMap<Url, Vec<TextEdit>> {
        let mut result: HashMap<Url, Vec<TextEdit>> = HashMap::new();
        for (uri, edits) in changes {
            match NotebookMapper::build(self.workspace, NotebookQuery::Notebook(&uri)) {
                None => result.entry(uri).or_default().extend(edits),
                Some(mapper) => {
                    for (cell, cell_edits) in mapper.cell_edits(&edits) {
                        result.entry(cell).or_default().extend(cell_edits);
                    }
                }
            }
        }
        result
    }
}

/// A result that can be moved from notebook space back into cell space.
pub trait NotebookResult: Sized {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self;
}

impl<T: NotebookResult> NotebookResult for Option<T> {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self {
        self.map(|result| result.into_cell_space(cells))
    }
}

impl NotebookResult for Vec<Location> {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self {
        cells.locations(self)
    }
}

impl NotebookResult for GotoDefinitionResponse {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self {
        match self {
            GotoDefinitionResponse::Scalar(location) => match cells.location(location) {
                Some(location) => GotoDefinitionResponse::Scalar(location),
                None => GotoDefinitionResponse::Array(Vec::new()),
            },
            GotoDefinitionResponse::Array(locations) => {
                GotoDefinitionResponse::Array(cells.locations(locations))
            }
            links @ GotoDefinitionResponse::Link(_) => links,
        }
    }
}

impl NotebookResult for Hover {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self {
        let Some(range) = self.range else {
            return self;
        };
        let Some(mapper) = cells.origin_mapper() else {
            return self;
        };
        match cells.origin_range(&mapper, range) {
            Some(range) => Hover {
                range: Some(range),
                ..self
            },
            None => self,
        }
    }
}

impl NotebookResult for Vec<DocumentHighlight> {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self {
        let Some(mapper) = cells.origin_mapper() else {
            return self;
        };
        self.into_iter()
            .filter_map(|highlight| {
                let range = cells.origin_range(&mapper, highlight.range)?;
                Some(DocumentHighlight { range, ..highlight })
            })
            .collect()
    }
}

impl NotebookResult for WorkspaceEdit {
    fn into_cell_space<W: Workspace + ?Sized>(self, cells: &CellSpace<'_, W>) -> Self {
        let changes = self.changes.map(|changes| cells.changes(changes));
        let document_changes = self.document_changes.map(|document_changes| match document_changes {
            DocumentChanges::Edits(edits) => DocumentChanges::Edits(
                edits
                    .into_iter()
                    .flat_map(|edit| cells.document_edits(edit))
                    .collect(),
            ),
            DocumentChanges::Operations(operations) => DocumentChanges::Operations(
                operations
                    .into_iter()
                    .flat_map(|operation| match operation {
                        DocumentChangeOperation::Edit(edit) => cells
                            .document_edits(edit)
                            .into_iter()
                            .map(DocumentChangeOperation::Edit)
                            .collect(),
                        op @ DocumentChangeOperation::Op(_) => vec![op],
                    })
                    .collect(),
            ),
        });
        WorkspaceEdit {
            changes,
            document_changes,
            ..self
        }
    }
}

impl NotebookResult for CompletionResponse {
    fn into_cell_space<W: Workspace + ?Sized>(self, _cells: &CellSpace<'_, W>) -> Self {
        self
    }
}

/// A request whose parameters have been moved into notebook space.
pub struct NotebookRequest<'s, S: Session + ?Sized, P> {
    session: &'s S,
    origin: Url,
    notebook: Option<Url>,
    params: P,
}

impl<'s, S: Session + ?Sized, P: PositionalParams> NotebookRequest<'s, S, P> {
    /// Rewrite `params` if they address a notebook cell.
    ///
    /// The document URI is left pointing at the cell; only coordinates change.
    pub fn new(session: &'s S, params: P) -> Self {
        let origin = params.document_uri().clone();
        let Some(mapper) = NotebookMapper::build(session.workspace(), NotebookQuery::Cell(&origin))
        else {
            return Self {
                session,
                origin,
                notebook: None,
                params,
            };
        };

        let mut params = params;
        if let Some(position) = params.position() {
            let rewritten = mapper.notebook_position(&origin, position);
            debug!(cell = %origin, ?position, ?rewritten, "rewrote position");
            params = params.with_position(rewritten);
        }
        if let Some(range) = params.range() {
            let rewritten = mapper.notebook_range(&origin, range);
            debug!(cell = %origin, ?range, ?rewritten, "rewrote range");
            params = params.with_range(rewritten);
        }

        Self {
            session,
            origin,
            notebook: Some(mapper.uri().clone()),
            params,
        }
    }

    /// The (possibly rewritten) parameters.
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Whether the request addresses a notebook cell.
    pub fn is_notebook(&self) -> bool {
        self.notebook.is_some()
    }

    /// Run `handler` on the rewritten request and move its result into cell space.
    pub fn invoke<R, F>(self, handler: F) -> R
    where
        R: NotebookResult,
        F: FnOnce(&NotebookSession<'s, S>, P) -> R,
    {
        let session = NotebookSession::new(self.session, self.notebook);
        let result = handler(&session, self.params);
        result.into_cell_space(&CellSpace::new(self.session.workspace(), &self.origin))
    }
}

/// Rewrite, run and post-process a request in one call.
pub fn with_notebooks<'s, S, P, R, F>(session: &'s S, params: P, handler: F) -> R
where
    S: Session + ?Sized,
    P: PositionalParams,
    R: NotebookResult,
    F: FnOnce(&NotebookSession<'s, S>, P) -> R,
{
    NotebookRequest::new(session, params).invoke(handler)
}

#[cfg(test)]
mod tests {
    use tower_lsp::lsp_types::{
        CodeActionContext, HoverContents, MarkedString, PartialResultParams, TextDocumentIdentifier,
        TextDocumentItem, WorkDoneProgressParams,
    };

    use super::*;
    use crate::document::DocumentStore;
    use crate::settings::Settings;

    struct TestSession {
        store: DocumentStore,
        settings: Settings,
    }

    impl Session for TestSession {
        type Workspace = DocumentStore;

        fn workspace(&self) -> &DocumentStore {
            &self.store
        }

        fn settings(&self) -> &Settings {
            &self.settings
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    /// cell://a has 3 lines, cell://b has 2.
    fn session() -> TestSession {
        let store = DocumentStore::new();
        store.open_notebook(
            url("nb://doc"),
            1,
            vec![url("cell://a"), url("cell://b")],
            vec![
                TextDocumentItem::new(url("cell://a"), "python".into(), 1, "a\nfoo\nc".into()),
                TextDocumentItem::new(url("cell://b"), "python".into(), 1, "d\ne".into()),
            ],
        );
        store.open(url("file:///plain.py"), "plain".into(), 1);
        TestSession {
            store,
            settings: Settings::default(),
        }
    }

    fn position_params(uri: &str, line: u32, character: u32) -> TextDocumentPositionParams {
        TextDocumentPositionParams::new(
            TextDocumentIdentifier::new(url(uri)),
            Position::new(line, character),
        )
    }

    fn hover(range: Option<Range>) -> Hover {
        Hover {
            contents: HoverContents::Scalar(MarkedString::String("doc".into())),
            range,
        }
    }

    #[test]
    fn cell_position_is_moved_into_notebook() {
        let session = session();
        let request = NotebookRequest::new(&session, position_params("cell://b", 1, 0));
        assert!(request.is_notebook());
        assert_eq!(request.params().position, Position::new(4, 0));
        assert_eq!(request.params().text_document.uri, url("cell://b"));
    }

    #[test]
    fn plain_document_is_not_rewritten() {
        let session = session();
        let request = NotebookRequest::new(&session, position_params("file:///plain.py", 3, 2));
        assert!(!request.is_notebook());
        assert_eq!(request.params().position, Position::new(3, 2));
    }

    #[test]
    fn cell_range_is_moved_into_notebook() {
        let session = session();
        let params = CodeActionParams {
            text_document: TextDocumentIdentifier::new(url("cell://b")),
            range: range(0, 0, 1, 1),
            context: CodeActionContext::default(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };
        let request = NotebookRequest::new(&session, params);
        assert_eq!(request.params().range, range(3, 0, 4, 1));
    }

    #[test]
    fn handler_reads_concatenated_document() {
        let session = session();
        let mut seen = None;
        let locations = with_notebooks(&session, position_params("cell://a", 0, 0), |s, p| {
            let document = s.workspace().text_document(&p.text_document.uri).unwrap();
            seen = Some((document.uri.clone(), document.source().to_string()));
            vec![Location::new(document.uri.clone(), range(4, 0, 4, 1))]
        });
        assert_eq!(seen, Some((url("nb://doc"), "a\nfoo\nc\nd\ne".to_string())));
        assert_eq!(locations, vec![Location::new(url("cell://b"), range(1, 0, 1, 1))]);
    }

    #[test]
    fn locations_are_mapped_dropped_or_kept() {
        let session = session();
        let locations = with_notebooks(&session, position_params("cell://b", 1, 0), |_, _| {
            vec![
                Location::new(url("nb://doc"), range(1, 0, 1, 3)),
                Location::new(url("nb://doc"), range(2, 0, 3, 0)),
                Location::new(url("file:///plain.py"), range(0, 0, 0, 5)),
            ]
        });
        assert_eq!(
            locations,
            vec![
                Location::new(url("cell://a"), range(1, 0, 1, 3)),
                Location::new(url("file:///plain.py"), range(0, 0, 0, 5)),
            ]
        );
    }

    #[test]
    fn notebook_locations_are_mapped_for_plain_requests() {
        let session = session();
        let locations = with_notebooks(&session, position_params("file:///plain.py", 0, 0), |_, _| {
            vec![Location::new(url("nb://doc"), range(4, 0, 4, 1))]
        });
        assert_eq!(locations, vec![Location::new(url("cell://b"), range(1, 0, 1, 1))]);
    }

    #[test]
    fn hover_range_is_moved_into_origin_cell() {
        let session = session();
        let result = with_notebooks(&session, position_params("cell://b", 0, 0), |_, _| {
            Some(hover(Some(range(3, 0, 3, 1))))
        });
        assert_eq!(result, Some(hover(Some(range(0, 0, 0, 1)))));
    }

    #[test]
    fn hover_anchored_in_other_cell_is_unchanged() {
        let session = session();
        let result = with_notebooks(&session, position_params("cell://b", 0, 0), |_, _| {
            hover(Some(range(1, 0, 1, 3)))
        });
        assert_eq!(result, hover(Some(range(1, 0, 1, 3))));
    }

    #[test]
    fn hover_without_range_or_notebook_is_unchanged() {
        let session = session();
        let result = with_notebooks(&session, position_params("cell://b", 0, 0), |_, _| hover(None));
        assert_eq!(result, hover(None));

        let result = with_notebooks(&session, position_params("file:///plain.py", 0, 0), |_, _| {
            hover(Some(range(0, 0, 0, 5)))
        });
        assert_eq!(result, hover(Some(range(0, 0, 0, 5))));
    }

    #[test]
    fn highlights_outside_origin_cell_are_dropped() {
        let session = session();
        let result = with_notebooks(&session, position_params("cell://a", 1, 0), |_, _| {
            vec![
                DocumentHighlight { range: range(1, 0, 1, 3), kind: None },
                DocumentHighlight { range: range(4, 0, 4, 1), kind: None },
            ]
        });
        assert_eq!(
            result,
            vec![DocumentHighlight { range: range(1, 0, 1, 3), kind: None }]
        );
    }

    #[test]
    fn workspace_edit_changes_are_regrouped_by_cell() {
        let session = session();
        let mut changes = HashMap::new();
        changes.insert(
            url("nb://doc"),
            vec![
                TextEdit::new(range(0, 0, 0, 1), "A".into()),
                TextEdit::new(range(3, 0, 3, 1), "D".into()),
            ],
        );
        changes.insert(
            url("file:///plain.py"),
            vec![TextEdit::new(range(0, 0, 0, 1), "P".into())],
        );
        let edit = with_notebooks(&session, position_params("cell://a", 0, 0), |_, _| {
            WorkspaceEdit::new(changes)
        });

        let changes = edit.changes.unwrap();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[&url("cell://a")][0].new_text, "A");
        assert_eq!(changes[&url("cell://b")][0].range, range(0, 0, 0, 1));
        assert_eq!(changes[&url("file:///plain.py")][0].new_text, "P");
    }
}
