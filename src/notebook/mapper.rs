//! Coordinate mapping between notebook cells and the concatenated notebook.
//!
//! The cells of a notebook are laid out one after another in a single
//! virtual document. Cell *i* occupies the half-open line range
//! `[start, start + line_count)` where `start` is the total line count of the
//! cells before it, so the ranges cover `[0, total)` without gaps or overlap.

use std::collections::HashMap;
use std::ops::Range as LineRange;
use std::sync::Arc;

use tower_lsp::lsp_types::{
    AnnotatedTextEdit, Location, OneOf, Position, Range, TextDocumentEdit, TextEdit, Url,
};
use tracing::warn;

use super::edits::CellEdits;
use crate::document::{NotebookQuery, TextDocument, Workspace};

/// A position inside a specific cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPosition {
    pub uri: Url,
    pub position: Position,
}

/// A text edit re-anchored inside a specific cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTextEdit {
    pub uri: Url,
    pub edit: OneOf<TextEdit, AnnotatedTextEdit>,
}

/// Maps positions between the cells of one notebook and its concatenated source.
///
/// A mapper is a snapshot: build a fresh one from the workspace for every use.
#[derive(Debug, Clone)]
pub struct NotebookMapper {
    uri: Url,
    cells: Vec<Arc<TextDocument>>,
    /// Line range of each cell in the concatenated document, in cell order.
    line_ranges: Vec<LineRange<u32>>,
    index_by_uri: HashMap<Url, usize>,
}

impl NotebookMapper {
    /// Build the index for `cells`, given in notebook order.
    pub fn new(uri: Url, cells: Vec<Arc<TextDocument>>) -> Self {
        let mut line_ranges = Vec::with_capacity(cells.len());
        let mut index_by_uri = HashMap::with_capacity(cells.len());
        let mut start = 0u32;
        for (index, cell) in cells.iter().enumerate() {
            let end = start + cell.line_count() as u32;
            line_ranges.push(start..end);
            index_by_uri.insert(cell.uri.clone(), index);
            start = end;
        }

        Self {
            uri,
            cells,
            line_ranges,
            index_by_uri,
        }
    }

    /// Build a mapper from the current workspace state.
    ///
    /// Returns `None` when no open notebook matches `query`, or when one of
    /// the notebook's cells has no open text document.
    pub fn build<W: Workspace + ?Sized>(workspace: &W, query: NotebookQuery<'_>) -> Option<Self> {
        let notebook = workspace.notebook(query)?;
        let mut cells = Vec::with_capacity(notebook.cells.len());
        for cell in &notebook.cells {
            let Some(document) = workspace.text_document(cell) else {
                warn!(notebook = %notebook.uri, %cell, "cell document is not open");
                return None;
            };
            cells.push(document);
        }
        Some(Self::new(notebook.uri.clone(), cells))
    }

    /// The notebook URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Concatenated notebook source: cell texts joined by a single `\n`.
    pub fn source(&self) -> String {
        let sources: Vec<&str> = self.cells.iter().map(|cell| cell.source()).collect();
        sources.join("\n")
    }

    /// Total number of mapped lines.
    pub fn line_count(&self) -> u32 {
        self.line_ranges.last().map_or(0, |range| range.end)
    }

    /// The virtual document a flat-document backend sees for this notebook.
    pub fn to_text_document(&self) -> TextDocument {
        TextDocument::new(self.uri.clone(), self.source(), None)
    }

    /// Line range of a cell in the concatenated document.
    pub fn cell_line_range(&self, cell_uri: &Url) -> Option<LineRange<u32>> {
        self.cell_index(cell_uri)
            .map(|index| self.line_ranges[index].clone())
    }

    /// Convert a cell position to a notebook position.
    ///
    /// # Panics
    ///
    /// Panics if `cell_uri` is not a cell of this notebook.
    pub fn notebook_position(&self, cell_uri: &Url, position: Position) -> Position {
        let Some(range) = self.cell_line_range(cell_uri) else {
            panic!("{cell_uri} is not a cell of notebook {}", self.uri);
        };
        // Saturate so an out-of-range line stays outside every cell.
        Position::new(range.start.saturating_add(position.line), position.character)
    }

    /// Convert a cell range to a notebook range.
    ///
    /// # Panics
    ///
    /// Panics if `cell_uri` is not a cell of this notebook.
    pub fn notebook_range(&self, cell_uri: &Url, range: Range) -> Range {
        Range::new(
            self.notebook_position(cell_uri, range.start),
            self.notebook_position(cell_uri, range.end),
        )
    }

    /// Convert a notebook position to a position in the cell containing its line.
    pub fn cell_position(&self, position: Position) -> Option<CellPosition> {
        let line = position.line;
        let index = self.line_ranges.partition_point(|range| range.end <= line);
        let range = self.line_ranges.get(index)?;
        if !range.contains(&line) {
            return None;
        }
        Some(CellPosition {
            uri: self.cells[index].uri.clone(),
            position: Position::new(line - range.start, position.character),
        })
    }

    /// Convert a notebook range to a cell range.
    ///
    /// Returns `None` if either end is unmapped or the ends fall in different cells.
    pub fn cell_range(&self, range: Range) -> Option<Location> {
        let start = self.cell_position(range.start)?;
        let end = self.cell_position(range.end)?;
        if start.uri != end.uri {
            return None;
        }
        Some(Location::new(
            start.uri,
            Range::new(start.position, end.position),
        ))
    }

    /// Convert a location in this notebook to a location in one of its cells.
    pub fn cell_location(&self, location: &Location) -> Option<Location> {
        if location.uri != self.uri {
            return None;
        }
        self.cell_range(location.range)
    }

    /// Position of a cell in notebook order.
    pub fn cell_index(&self, cell_uri: &Url) -> Option<usize> {
        self.index_by_uri.get(cell_uri).copied()
    }

    /// Version of a cell document, defaulting to 0 when it has none.
    pub fn cell_version(&self, cell_uri: &Url) -> i32 {
        self.cell_index(cell_uri)
            .and_then(|index| self.cells[index].version)
            .unwrap_or(0)
    }

    /// Convert a notebook edit to an edit of a single cell.
    ///
    /// The replacement text and annotation are kept; only the range moves.
    pub fn cell_text_edit(&self, edit: &OneOf<TextEdit, AnnotatedTextEdit>) -> Option<CellTextEdit> {
        let range = match edit {
            OneOf::Left(edit) => edit.range,
            OneOf::Right(edit) => edit.text_edit.range,
        };
        let location = self.cell_range(range)?;
        let edit = match edit {
            OneOf::Left(edit) => OneOf::Left(TextEdit {
                range: location.range,
                ..edit.clone()
            }),
            OneOf::Right(edit) => OneOf::Right(AnnotatedTextEdit {
                text_edit: TextEdit {
                    range: location.range,
                    ..edit.text_edit.clone()
                },
                annotation_id: edit.annotation_id.clone(),
            }),
        };
        Some(CellTextEdit {
            uri: location.uri,
            edit,
        })
    }

    /// Split an edit of the concatenated notebook into per-cell edits.
    ///
    /// Produces nothing unless the edit targets this notebook. Edits that do
    /// not fit inside a single cell are dropped.
    pub fn cell_text_document_edits(&self, edit: &TextDocumentEdit) -> Vec<TextDocumentEdit> {
        if edit.text_document.uri != self.uri {
            return Vec::new();
        }

        let mut by_cell = CellEdits::new();
        for text_edit in &edit.edits {
            match self.cell_text_edit(text_edit) {
                Some(cell_edit) => by_cell.push(cell_edit.uri, cell_edit.edit),
                None => warn!(notebook = %self.uri, ?text_edit, "dropping cross-cell edit"),
            }
        }
        by_cell.into_document_edits(|uri| self.cell_version(uri))
    }

    /// Split plain notebook edits into per-cell edit lists.
    pub fn cell_edits(&self, edits: &[TextEdit]) -> Vec<(Url, Vec<TextEdit>)> {
        let mut by_cell = CellEdits::new();
        for edit in edits {
            let Some(location) = self.cell_range(edit.range) else {
                warn!(notebook = %self.uri, ?edit, "dropping cross-cell edit");
                continue;
            };
            by_cell.push(
                location.uri,
                TextEdit {
                    range: location.range,
                    ..edit.clone()
                },
            );
        }
        by_cell.into_groups().collect()
    }
}
