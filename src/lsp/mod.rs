//! LSP protocol feature implementations.
//!
//! These handlers see one flat document. Notebook cells reach them through
//! the rewriting in [`crate::notebook`].
//!
//! - Hover with occurrence counts
//! - Definition, references and document highlights by identifier name
//! - Rename across the document
//! - Completion from identifiers in the document

mod completion;
mod hover;
mod navigation;
mod rename;
mod words;

pub use completion::completion;
pub use hover::hover;
pub use navigation::{document_highlight, goto_definition, references};
pub use rename::rename;
pub use words::{occurrences, word_at, words, Word};
