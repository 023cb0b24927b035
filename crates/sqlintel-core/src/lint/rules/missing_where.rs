use super::anchor;
use crate::error::{Diagnostic, RuleError};
use crate::lint::{LintContext, Rule};
use crate::parser::{ClauseKind, StatementKind};

/// UPDATE or DELETE with no WHERE clause
pub struct MissingWhere;

impl Rule for MissingWhere {
    fn id(&self) -> &'static str {
        "missing-where"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        let tree = ctx.tree;
        if !tree.is_dml_without_where() {
            return Ok(Vec::new());
        }
        let (verb, clause) = match tree.kind {
            StatementKind::Update => ("UPDATE", ClauseKind::Update),
            _ => ("DELETE", ClauseKind::Delete),
        };
        Ok(vec![Diagnostic::warning(
            self.id(),
            format!("{verb} without WHERE affects every row"),
            anchor(tree, clause),
        )
        .with_help("Add a WHERE clause to limit the affected rows")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Severity, Span};
    use crate::lint::rules::test_support::check;

    #[test]
    fn test_update_without_where() {
        let diags = check(&MissingWhere, "UPDATE accounts SET balance = 0", "", None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].range, Span::new(0, 6));
        assert!(diags[0].message.starts_with("UPDATE"));
    }

    #[test]
    fn test_update_with_where() {
        let diags = check(
            &MissingWhere,
            "UPDATE accounts SET balance = 0 WHERE id = 1",
            "",
            None,
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_delete_without_where() {
        let diags = check(&MissingWhere, "DELETE FROM accounts", "", None);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("DELETE"));
    }

    #[test]
    fn test_select_is_ignored() {
        assert!(check(&MissingWhere, "SELECT * FROM accounts", "", None).is_empty());
    }
}
