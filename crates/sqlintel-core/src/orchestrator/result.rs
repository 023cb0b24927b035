//! Analysis results and the notifications that carry them

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::{Diagnostic, RuleFailure};
use crate::parser::{ClauseContext, StatementTree};
use crate::suggest::SuggestionList;

/// Identifies an open buffer within one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// The exact `(text, cursor)` request a result was computed for. The
/// generation grows with every edit or direct request on the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceVersion {
    pub buffer: BufferId,
    pub generation: u64,
}

impl fmt::Display for SourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.buffer, self.generation)
    }
}

/// Everything one analysis cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub source_version: SourceVersion,
    /// Tree of the statement under the cursor (partial if it failed to parse)
    pub statement_tree: StatementTree,
    pub clause_context: ClauseContext,
    pub suggestions: SuggestionList,
    /// Parse and lint findings for every statement in the buffer
    pub diagnostics: Vec<Diagnostic>,
    /// Rules that failed during this cycle
    pub rule_failures: Vec<RuleFailure>,
    /// Version of the metadata snapshot the cycle read
    pub snapshot_version: u64,
    /// The snapshot was known to be stale
    pub stale_metadata: bool,
    /// A newer request overtook this one before it finished. Such results
    /// are only ever handed back to the direct caller, never published.
    pub superseded: bool,
}

/// Notification for a completed, current cycle
#[derive(Debug, Clone)]
pub struct Published {
    pub source_version: SourceVersion,
    pub result: Arc<AnalysisResult>,
}
