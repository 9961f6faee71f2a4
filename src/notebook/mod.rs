//! Notebook support for a flat-document backend.
//!
//! This module provides:
//! - `NotebookMapper` for cell <-> notebook coordinate conversion
//! - `CellEdits` for splitting notebook edits per cell
//! - `NotebookView` and `NotebookSession`, which present a notebook as one document
//! - `NotebookRequest` and `with_notebooks` for rewriting requests and results

mod edits;
mod mapper;
mod rewrite;
mod view;

pub use edits::CellEdits;
pub use mapper::{CellPosition, CellTextEdit, NotebookMapper};
pub use rewrite::{with_notebooks, CellSpace, NotebookRequest, NotebookResult, PositionalParams};
pub use view::{NotebookSession, NotebookView};

use tower_lsp::lsp_types::{Hover, HoverContents, Url};

use crate::document::{NotebookQuery, Workspace};
use crate::error::NotebookError;

/// Index of a cell within its notebook.
///
/// # Panics
///
/// Panics if the cell's notebook does not list the cell.
pub fn cell_index<W: Workspace + ?Sized>(workspace: &W, cell: &Url) -> Result<usize, NotebookError> {
    let mapper = NotebookMapper::build(workspace, NotebookQuery::Cell(cell))
        .ok_or_else(|| NotebookError::CellNotFound(cell.clone()))?;
    let Some(index) = mapper.cell_index(cell) else {
        panic!("{cell} is not a cell of notebook {}", mapper.uri());
    };
    Ok(index)
}

/// Human-readable cell name, e.g. `cell 2` for the second cell.
pub fn cell_label<W: Workspace + ?Sized>(workspace: &W, cell: &Url) -> Result<String, NotebookError> {
    cell_index(workspace, cell).map(|index| format!("cell {}", index + 1))
}

/// Append the cell label to a markup hover on a notebook cell.
///
/// Hovers on other documents, or with non-markup contents, are returned as is.
pub fn label_hover<W: Workspace + ?Sized>(workspace: &W, cell: &Url, mut hover: Hover) -> Hover {
    let Ok(label) = cell_label(workspace, cell) else {
        return hover;
    };
    if let HoverContents::Markup(markup) = &mut hover.contents {
        markup.value.push_str(&format!("\n\n*{label}*"));
    }
    hover
}
