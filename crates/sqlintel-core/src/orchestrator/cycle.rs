//! One analysis cycle: parse, then lint, then suggest

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogStore;
use crate::config::EngineConfig;
use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, RuleFailure};
use crate::lint::{LintEngine, LintMode, LintOutcome, Rule};
use crate::metadata::MetadataSnapshot;
use crate::parser::{parse_all, parse_at, ClauseContext, ParserAdapter, SqlParser, StatementTree};
use crate::suggest::{
    Candidate, RecentlyAccepted, SuggestInput, SuggestionBroker, SuggestionList, SuggestionSource,
};

/// Rules and suggestion sources registered on the engine. They outlive
/// `prime`, which rebuilds everything else.
#[derive(Default)]
pub(crate) struct Extensions {
    pub(crate) rules: Vec<Arc<dyn Rule>>,
    pub(crate) sources: Vec<Arc<dyn SuggestionSource>>,
}

/// Dialect-bound pieces of the engine. Rebuilt by `prime`, shared by
/// running cycles through an `Arc`.
pub(crate) struct Components {
    pub(crate) dialect: SqlDialect,
    pub(crate) parser: Box<dyn ParserAdapter>,
    pub(crate) lint: LintEngine,
    pub(crate) broker: SuggestionBroker,
}

impl Components {
    pub(crate) fn build(
        dialect: SqlDialect,
        config: &EngineConfig,
        extensions: &Extensions,
    ) -> Self {
        let mut lint = extensions
            .rules
            .iter()
            .fold(LintEngine::new(), |lint, rule| {
                lint.with_shared_rule(Arc::clone(rule))
            });
        for id in &config.disabled_rules {
            lint.disable(id.clone());
        }
        let catalog = Arc::new(CatalogStore::for_dialect(dialect));
        let broker = extensions.sources.iter().fold(
            SuggestionBroker::new(catalog, config.max_suggestions),
            |broker, source| broker.with_shared_source(Arc::clone(source)),
        );
        Self {
            dialect,
            parser: Box::new(SqlParser::new(dialect)),
            lint,
            broker,
        }
    }

    /// Lint every statement of `text`
    pub(crate) fn lint_all(
        &self,
        text: &str,
        snapshot: &MetadataSnapshot,
        cursor: Option<usize>,
        stale: bool,
        mode: LintMode,
    ) -> LintOutcome {
        let mut outcome = LintOutcome::default();
        for parsed in parse_all(self.parser.as_ref(), text) {
            outcome.extend(self.lint.run_outcome(&parsed, snapshot, cursor, stale, mode));
        }
        outcome
    }
}

pub(crate) struct CycleInput<'a> {
    pub(crate) text: &'a str,
    pub(crate) cursor: usize,
    pub(crate) snapshot: &'a MetadataSnapshot,
    pub(crate) stale: bool,
    pub(crate) recent: &'a RecentlyAccepted,
    pub(crate) schema_tables: &'a [Candidate],
}

pub(crate) struct CycleOutput {
    pub(crate) tree: StatementTree,
    pub(crate) context: ClauseContext,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) failures: Vec<RuleFailure>,
    pub(crate) suggestions: SuggestionList,
    /// The token fired; phases after that point were skipped
    pub(crate) cancelled: bool,
}

impl CycleOutput {
    /// Output of a cycle cancelled before it parsed anything
    fn cancelled_early() -> Self {
        let tree = StatementTree::empty("");
        let context = ClauseContext::at(&tree, 0);
        Self {
            tree,
            context,
            diagnostics: Vec::new(),
            failures: Vec::new(),
            suggestions: SuggestionList::default(),
            cancelled: true,
        }
    }
}

/// Run the phases in order, checking `token` before each one. A cancelled
/// cycle stops where it is and reports what it has.
pub(crate) async fn run_cycle(
    components: &Components,
    input: CycleInput<'_>,
    token: &CancellationToken,
) -> CycleOutput {
    if token.is_cancelled() {
        return CycleOutput::cancelled_early();
    }
    let cursor = clamp_cursor(input.text, input.cursor);
    let parsed = parse_at(components.parser.as_ref(), input.text, cursor);
    let context = ClauseContext::at(parsed.tree(), cursor);
    let mut output = CycleOutput {
        tree: parsed.tree().clone(),
        context,
        diagnostics: Vec::new(),
        failures: Vec::new(),
        suggestions: SuggestionList::default(),
        cancelled: false,
    };

    tokio::task::yield_now().await;
    if token.is_cancelled() {
        output.cancelled = true;
        return output;
    }
    let outcome = components.lint_all(
        input.text,
        input.snapshot,
        Some(cursor),
        input.stale,
        LintMode::OnChange,
    );
    output.diagnostics = outcome.diagnostics;
    output.failures = outcome.failures;

    tokio::task::yield_now().await;
    if token.is_cancelled() {
        output.cancelled = true;
        return output;
    }
    output.suggestions = components.broker.suggest(SuggestInput {
        tree: &output.tree,
        context: &output.context,
        snapshot: input.snapshot,
        stale: input.stale,
        recent: input.recent,
        schema_tables: Some(input.schema_tables),
    });
    output
}

/// Clamp to the text and back off to a char boundary
pub(crate) fn clamp_cursor(text: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(text.len());
    while cursor > 0 && !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}
