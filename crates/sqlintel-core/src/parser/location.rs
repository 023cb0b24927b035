//! Line/column to byte offset conversion

use sqlparser::tokenizer::{Location, Span as TokenSpan};

use crate::error::Span;

/// Maps sqlparser's 1-based line/column locations (columns count chars)
/// onto byte offsets of the source text.
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|(_, ch)| *ch == '\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    /// Byte offset of a location; `None` for the empty location sqlparser
    /// uses for EOF and synthesized tokens
    pub(crate) fn offset(&self, location: Location) -> Option<usize> {
        if location.line == 0 || location.column == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(location.line as usize - 1)?;
        let line_end = self
            .line_starts
            .get(location.line as usize)
            .copied()
            .unwrap_or(self.text.len());
        let line = &self.text[line_start..line_end];
        let col = location.column as usize - 1;
        let within = line
            .char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        Some(line_start + within)
    }

    pub(crate) fn span(&self, span: &TokenSpan) -> Option<Span> {
        let start = self.offset(span.start)?;
        let end = self.offset(span.end).unwrap_or(start);
        Some(Span::new(start, end))
    }
}

/// Pull the `Line: N, Column: M` suffix sqlparser appends to parser errors
pub(crate) fn error_location(message: &str) -> Option<Location> {
    let at = message.rfind("Line: ")?;
    let rest = &message[at + "Line: ".len()..];
    let (line, rest) = rest.split_once(", Column: ")?;
    let column: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some(Location {
        line: line.trim().parse().ok()?,
        column: column.parse().ok()?,
    })
}
