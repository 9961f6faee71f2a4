//! Document state management and text utilities.
//!
//! This module provides:
//! - `LineIndex` for efficient byte offset <-> LSP position conversion
//! - `TextDocument` and `Notebook` snapshots of open documents
//! - `DocumentStore`, the thread-safe store behind the `Workspace` interface

mod state;
mod text;
mod workspace;

pub use state::{
    CellSplice, CellTextChange, DocumentStore, Notebook, NotebookChange, TextDocument,
};
pub use text::LineIndex;
pub use workspace::{NotebookQuery, Workspace};
