use super::anchor;
use crate::error::{Diagnostic, RuleError};
use crate::lint::{LintContext, Rule};
use crate::parser::{ClauseKind, StatementKind};

/// Ask the user to double check where rows are going before running an INSERT
pub struct ConfirmInsertTarget;

impl Rule for ConfirmInsertTarget {
    fn id(&self) -> &'static str {
        "confirm-insert-target"
    }

    fn pre_execute_only(&self) -> bool {
        true
    }

    fn check(&self, ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        let tree = ctx.tree;
        if tree.kind != StatementKind::Insert {
            return Ok(Vec::new());
        }
        let clause = tree.clause(ClauseKind::Insert).map(|c| c.span());
        let target = tree
            .tables
            .iter()
            .find(|t| clause.map(|c| c.contains_span(&t.span)).unwrap_or(false))
            .or_else(|| tree.tables.first());
        let message = match target {
            Some(table) => format!(
                "Confirm INSERT target '{}' before executing",
                table.qualified_name()
            ),
            None => "Confirm INSERT target before executing".to_string(),
        };
        Ok(vec![Diagnostic::info(
            self.id(),
            message,
            anchor(tree, ClauseKind::Insert),
        )])
    }
}
