//! Built-in lint rules

mod destructive;
mod insert_target;
mod missing_where;
mod unresolved_column;
mod unused_cte;

pub use destructive::DestructiveStatement;
pub use insert_target::ConfirmInsertTarget;
pub use missing_where::MissingWhere;
pub use unresolved_column::UnresolvedColumn;
pub use unused_cte::UnusedCte;

use crate::error::Span;
use crate::parser::{ClauseKind, StatementTree};

/// Keyword range of the first clause of `kind`, falling back to the whole
/// statement
fn anchor(tree: &StatementTree, kind: ClauseKind) -> Span {
    tree.clause(kind)
        .map(|c| c.keyword)
        .unwrap_or_else(|| tree.span())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::dialect::SqlDialect;
    use crate::error::Diagnostic;
    use crate::lint::{LintContext, Rule};
    use crate::metadata::{
        ConnectionKey, MetadataCache, MetadataSnapshot, SharedMetadataCache, SnapshotBuilder,
    };
    use crate::parser::{ParserAdapter, SqlParser};
    use std::sync::Arc;

    pub fn snapshot(ddl: &str) -> Arc<MetadataSnapshot> {
        let mut builder = SnapshotBuilder::new(SqlDialect::PostgreSQL);
        builder.parse(ddl);
        let (draft, _) = builder.build();
        let cache = SharedMetadataCache::new();
        cache.publish(ConnectionKey::new("test"), draft);
        cache.current()
    }

    pub fn check(rule: &dyn Rule, sql: &str, ddl: &str, cursor: Option<usize>) -> Vec<Diagnostic> {
        let parsed = SqlParser::new(SqlDialect::PostgreSQL).parse(sql);
        let snapshot = snapshot(ddl);
        let ctx = LintContext {
            tree: parsed.tree(),
            snapshot: &snapshot,
            cursor,
            stale: false,
        };
        match rule.check(&ctx) {
            Ok(diagnostics) => diagnostics,
            Err(err) => panic!("rule failed: {err}"),
        }
    }
}
