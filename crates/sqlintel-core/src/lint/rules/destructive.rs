use sqlparser::ast::{AlterTableOperation, Statement};

use super::anchor;
use crate::error::{Diagnostic, RuleError};
use crate::lint::{LintContext, Rule};
use crate::parser::{ClauseKind, StatementKind, StatementTree};

/// Statements that destroy data. Only checked before execution.
pub struct DestructiveStatement;

impl Rule for DestructiveStatement {
    fn id(&self) -> &'static str {
        "destructive-statement"
    }

    fn pre_execute_only(&self) -> bool {
        true
    }

    fn check(&self, ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        let tree = ctx.tree;
        let target = tree
            .tables
            .first()
            .map(|t| t.qualified_name())
            .unwrap_or_else(|| "the target".to_string());

        let diagnostic = match tree.kind {
            StatementKind::Drop => Some(Diagnostic::warning(
                self.id(),
                format!("DROP permanently removes {target}"),
                anchor(tree, ClauseKind::Ddl),
            )),
            StatementKind::Truncate => Some(Diagnostic::warning(
                self.id(),
                format!("TRUNCATE removes every row of {target}"),
                anchor(tree, ClauseKind::Ddl),
            )),
            StatementKind::Alter if drops_column_or_constraint(tree) => Some(Diagnostic::warning(
                self.id(),
                format!("ALTER drops part of {target}"),
                anchor(tree, ClauseKind::Ddl),
            )),
            StatementKind::Update | StatementKind::Delete if !tree.has_where => {
                let clause = if tree.kind == StatementKind::Update {
                    ClauseKind::Update
                } else {
                    ClauseKind::Delete
                };
                Some(
                    Diagnostic::error(
                        self.id(),
                        format!("Statement modifies every row of {target}"),
                        anchor(tree, clause),
                    )
                    .with_help("Add a WHERE clause or confirm the full-table change"),
                )
            }
            _ => None,
        };
        Ok(diagnostic.into_iter().collect())
    }
}

fn drops_column_or_constraint(tree: &StatementTree) -> bool {
    match tree.statement() {
        Some(Statement::AlterTable { operations, .. }) => operations.iter().any(|op| {
            matches!(
                op,
                AlterTableOperation::DropColumn { .. }
                    | AlterTableOperation::DropConstraint { .. }
                    | AlterTableOperation::DropPrimaryKey
            )
        }),
        // Without an AST fall back to the raw text
        _ => tree.text.to_ascii_uppercase().contains(" DROP "),
    }
}
