//! Error and diagnostic types

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

/// Half-open byte range into the source buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Zero-width span at `offset`
    pub fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `offset` lies inside the span (end inclusive, so a cursor
    /// sitting right after the last character still counts)
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn cover(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn shift(self, delta: usize) -> Span {
        Span::new(self.start + delta, self.end + delta)
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A lint or parse finding anchored to a range of the source buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub range: Span,
    pub help: Option<String>,
    /// Set when the finding was computed against a metadata snapshot that is
    /// known to be stale, so the caller can show it with reduced confidence.
    #[serde(default)]
    pub stale_metadata: bool,
}

impl Diagnostic {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        range: Span,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            range,
            help: None,
            stale_metadata: false,
        }
    }

    pub fn error(rule_id: impl Into<String>, message: impl Into<String>, range: Span) -> Self {
        Self::new(rule_id, Severity::Error, message, range)
    }

    pub fn warning(rule_id: impl Into<String>, message: impl Into<String>, range: Span) -> Self {
        Self::new(rule_id, Severity::Warning, message, range)
    }

    pub fn info(rule_id: impl Into<String>, message: impl Into<String>, range: Span) -> Self {
        Self::new(rule_id, Severity::Info, message, range)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_stale_metadata(mut self, stale: bool) -> Self {
        self.stale_metadata = stale;
        self
    }

    pub fn shift(mut self, delta: usize) -> Self {
        self.range = self.range.shift(delta);
        self
    }
}

/// Error returned by a lint rule that could not finish its check
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    #[error("rule does not support this statement: {0}")]
    Unsupported(String),
    #[error("{0}")]
    Failed(String),
}

/// A rule that failed during one analysis cycle. Reported on the engine's
/// failure channel; the rule's output for that cycle is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub message: String,
}

/// Setup-time errors. Analysis itself never fails; these only come from
/// configuration and metadata loading.
#[derive(Debug, thiserror::Error)]
pub enum IntelError {
    #[error("Unknown dialect: '{0}'. Supported dialects: postgresql, mysql, sqlite, generic.")]
    UnknownDialect(String),

    #[error("No metadata published for connection '{0}'")]
    UnknownConnection(String),

    #[error("Unknown buffer: {0}")]
    UnknownBuffer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_touches_end() {
        let span = Span::new(4, 8);
        assert!(span.touches(4));
        assert!(span.touches(8));
        assert!(!span.touches(9));
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn test_span_never_inverted() {
        let span = Span::new(10, 3);
        assert_eq!(span.start, 10);
        assert!(span.is_empty());
    }

    #[test]
    fn test_diagnostic_shift() {
        let diag = Diagnostic::warning("missing-where", "msg", Span::new(0, 6)).shift(10);
        assert_eq!(diag.range, Span::new(10, 16));
    }
}
