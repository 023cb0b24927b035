//! sqlintel-core: SQL intelligence engine
//!
//! Parses SQL as it is typed, keeps a live analysis of the statement under
//! the cursor, ranks completions against a cached schema snapshot, and runs
//! lint rules, without blocking the editor or analyzing stale input.

pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod lint;
pub mod metadata;
pub mod orchestrator;
pub mod parser;
pub mod suggest;

pub use catalog::CatalogStore;
pub use config::EngineConfig;
pub use dialect::{ConnectionCapabilities, SqlDialect};
pub use error::{Diagnostic, IntelError, RuleError, RuleFailure, Severity, Span};
pub use lint::{LintEngine, LintMode, Rule};
pub use metadata::{
    ConnectionKey, MetadataCache, MetadataSnapshot, SharedMetadataCache, SnapshotBuilder,
};
pub use orchestrator::{
    AnalysisResult, AnalysisView, BufferHandle, BufferId, BufferPhase, Engine, Published,
    SourceVersion,
};
pub use parser::{ParseOutcome, ParserAdapter, SqlParser, StatementTree};
pub use suggest::{
    Candidate, SuggestRequest, Suggestion, SuggestionKind, SuggestionList, SuggestionSource,
};
