//! Identifier scanning over a flat text document.

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{Position, Range};

use crate::document::TextDocument;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap());

/// An identifier and where it occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub range: Range,
}

/// UTF-16 column of a byte offset within a line.
fn utf16_column(line: &str, byte: usize) -> u32 {
    line[..byte].encode_utf16().count() as u32
}

fn line_words(line_number: u32, line: &str) -> impl Iterator<Item = Word> + '_ {
    IDENTIFIER.find_iter(line).map(move |m| Word {
        text: m.as_str().to_string(),
        range: Range::new(
            Position::new(line_number, utf16_column(line, m.start())),
            Position::new(line_number, utf16_column(line, m.end())),
        ),
    })
}

/// All identifiers in the document, in order.
pub fn words(document: &TextDocument) -> impl Iterator<Item = Word> + '_ {
    let index = &document.line_index;
    (0u32..)
        .map_while(move |n| index.line(n as usize).map(|line| (n, line)))
        .flat_map(|(n, line)| line_words(n, line))
}

/// The identifier touching `position`, if any.
///
/// A cursor right after the last character of an identifier still touches it.
pub fn word_at(document: &TextDocument, position: Position) -> Option<Word> {
    let line = document.line_index.line(position.line as usize)?;
    line_words(position.line, line).find(|word| {
        word.range.start.character <= position.character
            && position.character <= word.range.end.character
    })
}

/// Ranges of every occurrence of `name`.
pub fn occurrences(document: &TextDocument, name: &str) -> Vec<Range> {
    words(document)
        .filter(|word| word.text == name)
        .map(|word| word.range)
        .collect()
}

/// The partial identifier typed immediately before `position`.
pub fn prefix_at(document: &TextDocument, position: Position) -> Option<String> {
    let line = document.line_index.line(position.line as usize)?;
    let mut column = 0u32;
    let mut end = line.len();
    for (i, c) in line.char_indices() {
        if column >= position.character {
            end = i;
            break;
        }
        column += c.len_utf16() as u32;
    }
    let before = &line[..end];
    let length = before
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    Some(before[before.len() - length..].to_string())
}
