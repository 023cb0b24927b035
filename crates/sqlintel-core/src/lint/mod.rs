//! Lint engine - independent rules over a statement tree

mod rules;

pub use rules::{
    ConfirmInsertTarget, DestructiveStatement, MissingWhere, UnresolvedColumn, UnusedCte,
};

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashSet;
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Once};

use crate::error::{Diagnostic, RuleError, RuleFailure};
use crate::metadata::MetadataSnapshot;
use crate::parser::{ParseOutcome, StatementTree};

/// When lint runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintMode {
    /// Every analysis cycle while typing
    #[default]
    OnChange,
    /// The caller is about to execute the statement; adds the pre-execute rules
    PreExecute,
}

/// Everything a rule may look at
pub struct LintContext<'a> {
    pub tree: &'a StatementTree,
    pub snapshot: &'a MetadataSnapshot,
    /// Cursor offset, in the same coordinates as the tree's spans
    pub cursor: Option<usize>,
    /// The snapshot is known to be stale
    pub stale: bool,
}

/// A lint rule. Rules must not depend on each other's output.
///
/// Report trouble by returning a `RuleError`. A panic is caught and
/// reported the same way, without the default panic message on stderr.
pub trait Rule: Send + Sync {
    /// Stable identifier, e.g. `missing-where`
    fn id(&self) -> &'static str;

    /// Only run when the caller signals intent to execute
    fn pre_execute_only(&self) -> bool {
        false
    }

    fn check(&self, ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError>;
}

/// Diagnostics from the rules that succeeded, plus the ones that did not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LintOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<RuleFailure>,
}

impl LintOutcome {
    pub fn extend(&mut self, other: LintOutcome) {
        self.diagnostics.extend(other.diagnostics);
        self.failures.extend(other.failures);
    }
}

pub struct LintEngine {
    rules: Vec<Arc<dyn Rule>>,
    disabled: HashSet<String>,
}

impl LintEngine {
    /// Engine with the built-in rules
    pub fn new() -> Self {
        Self::empty()
            .with_rule(MissingWhere)
            .with_rule(UnresolvedColumn)
            .with_rule(UnusedCte)
            .with_rule(DestructiveStatement)
            .with_rule(ConfirmInsertTarget)
    }

    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            disabled: HashSet::new(),
        }
    }

    pub fn with_rule(self, rule: impl Rule + 'static) -> Self {
        self.with_shared_rule(Arc::new(rule))
    }

    pub fn with_shared_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Skip the rule with this id
    pub fn disable(&mut self, id: impl Into<String>) {
        self.disabled.insert(id.into());
    }

    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Run every enabled rule for `mode`. A rule that errors or panics is
    /// reported as a failure and its output dropped; the others still run.
    pub fn run(&self, ctx: &LintContext<'_>, mode: LintMode) -> LintOutcome {
        let mut outcome = LintOutcome::default();
        for rule in &self.rules {
            if self.disabled.contains(rule.id()) {
                continue;
            }
            if rule.pre_execute_only() && mode != LintMode::PreExecute {
                continue;
            }
            match run_quietly(|| rule.check(ctx)) {
                Ok(Ok(diagnostics)) => outcome.diagnostics.extend(diagnostics),
                Ok(Err(err)) => outcome.failures.push(self.failure(rule.id(), err.to_string())),
                Err(payload) => {
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "rule panicked".to_string());
                    outcome.failures.push(self.failure(rule.id(), message));
                }
            }
        }
        outcome
    }

    /// Lint a parse outcome: the parse error (if any) followed by the rule
    /// results over the full or partial tree
    pub fn run_outcome(
        &self,
        parsed: &ParseOutcome,
        snapshot: &MetadataSnapshot,
        cursor: Option<usize>,
        stale: bool,
        mode: LintMode,
    ) -> LintOutcome {
        let mut outcome = LintOutcome::default();
        if let Some(failure) = parsed.failure() {
            outcome.diagnostics.push(failure.diagnostic());
        }
        let ctx = LintContext {
            tree: parsed.tree(),
            snapshot,
            cursor,
            stale,
        };
        outcome.extend(self.run(&ctx, mode));
        outcome
    }

    fn failure(&self, rule_id: &str, message: String) -> RuleFailure {
        tracing::warn!(rule = rule_id, %message, "lint rule failed");
        RuleFailure {
            rule_id: rule_id.to_string(),
            message,
        }
    }
}

impl Default for LintEngine {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static IN_RULE: Cell<bool> = const { Cell::new(false) };
}

/// Catch a panic from `f` without printing the panic report. Panics on other
/// threads, or outside `f`, still reach the previously installed hook.
fn run_quietly<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_RULE.with(Cell::get) {
                previous(info);
            }
        }));
    });

    let outer = IN_RULE.with(|flag| flag.replace(true));
    let result = catch_unwind(AssertUnwindSafe(f));
    IN_RULE.with(|flag| flag.set(outer));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialect;
    use crate::metadata::ConnectionKey;
    use crate::parser::{ParserAdapter, SqlParser};

    struct Exploding;

    impl Rule for Exploding {
        fn id(&self) -> &'static str {
            "exploding"
        }

        fn check(&self, _ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
            panic!("boom")
        }
    }

    struct Refusing;

    impl Rule for Refusing {
        fn id(&self) -> &'static str {
            "refusing"
        }

        fn check(&self, _ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
            Err(RuleError::Unsupported("anything".to_string()))
        }
    }

    fn run(engine: &LintEngine, sql: &str, mode: LintMode) -> LintOutcome {
        let parsed = SqlParser::new(SqlDialect::PostgreSQL).parse(sql);
        let snapshot = MetadataSnapshot::empty(ConnectionKey::default());
        engine.run_outcome(&parsed, &snapshot, None, false, mode)
    }

    #[test]
    fn test_failing_rules_are_isolated() {
        let engine = LintEngine::empty()
            .with_rule(Exploding)
            .with_rule(MissingWhere)
            .with_rule(Refusing);
        let outcome = run(&engine, "DELETE FROM t", LintMode::OnChange);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].rule_id, "missing-where");
        let failed: Vec<_> = outcome.failures.iter().map(|f| f.rule_id.as_str()).collect();
        assert_eq!(failed, vec!["exploding", "refusing"]);
        assert_eq!(outcome.failures[0].message, "boom");
    }

    #[test]
    fn test_panic_report_suppressed_only_inside_rule() {
        assert_eq!(run_quietly(|| IN_RULE.with(Cell::get)).ok(), Some(true));
        assert!(!IN_RULE.with(Cell::get));

        let caught = run_quietly(|| -> u8 { panic!("inside") });
        assert!(caught.is_err());
        assert!(!IN_RULE.with(Cell::get));

        // Nested use restores the outer scope
        let nested = run_quietly(|| {
            let _ = run_quietly(|| -> u8 { panic!("inner") });
            IN_RULE.with(Cell::get)
        });
        assert_eq!(nested.ok(), Some(true));
        assert!(!IN_RULE.with(Cell::get));
    }

    #[test]
    fn test_pre_execute_rules_wait_for_intent() {
        let engine = LintEngine::new();
        let typing = run(&engine, "DROP TABLE users", LintMode::OnChange);
        assert!(typing.diagnostics.is_empty());
        let executing = run(&engine, "DROP TABLE users", LintMode::PreExecute);
        assert_eq!(executing.diagnostics[0].rule_id, "destructive-statement");
    }

    #[test]
    fn test_disabled_rule() {
        let mut engine = LintEngine::new();
        engine.disable("missing-where");
        let outcome = run(&engine, "UPDATE t SET a = 1", LintMode::OnChange);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_error_comes_first() {
        let outcome = run(&LintEngine::new(), "DELETE FROM t WHERE", LintMode::OnChange);
        assert_eq!(outcome.diagnostics[0].rule_id, crate::parser::PARSE_ERROR);
    }
}
