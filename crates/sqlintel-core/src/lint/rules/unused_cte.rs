use crate::error::{Diagnostic, RuleError};
use crate::lint::{LintContext, Rule};

/// CTE defined in WITH but never read
pub struct UnusedCte;

impl Rule for UnusedCte {
    fn id(&self) -> &'static str {
        "unused-cte"
    }

    fn check(&self, ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        // A half-typed statement has not referenced its CTEs yet
        if !ctx.tree.complete {
            return Ok(Vec::new());
        }
        Ok(ctx
            .tree
            .ctes
            .iter()
            .filter(|cte| !cte.referenced)
            .map(|cte| {
                Diagnostic::info(
                    self.id(),
                    format!("CTE '{}' is defined but never used", cte.name),
                    cte.span,
                )
            })
            .collect())
    }
}
