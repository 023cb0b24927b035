//! Catalog store - static keyword, function and snippet entries per dialect

mod functions;
mod keywords;
mod snippets;

pub use functions::FunctionEntry;
pub use keywords::KeywordEntry;
pub use snippets::SnippetEntry;

use crate::dialect::SqlDialect;
use crate::parser::ClauseKind;

/// Where in a statement a catalog entry is offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// Before the first clause keyword
    Start,
    /// Inside the given clause
    In(ClauseKind),
}

impl Position {
    pub fn matches(&self, clause: Option<ClauseKind>) -> bool {
        match self {
            Position::Start => clause.is_none(),
            Position::In(kind) => clause == Some(*kind),
        }
    }
}

fn offered(positions: &[Position], clause: Option<ClauseKind>) -> bool {
    positions.iter().any(|p| p.matches(clause))
}

/// Keyword, function and snippet entries for one dialect. Built once per
/// `Engine::prime` and shared read-only.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    dialect: SqlDialect,
    keywords: Vec<&'static KeywordEntry>,
    functions: Vec<&'static FunctionEntry>,
    snippets: Vec<&'static SnippetEntry>,
}

impl CatalogStore {
    pub fn for_dialect(dialect: SqlDialect) -> Self {
        let (extra_keywords, extra_functions, extra_snippets): (
            &[KeywordEntry],
            &[FunctionEntry],
            &[SnippetEntry],
        ) = match dialect {
            SqlDialect::PostgreSQL => (keywords::POSTGRES, functions::POSTGRES, snippets::POSTGRES),
            SqlDialect::MySQL => (keywords::MYSQL, functions::MYSQL, snippets::MYSQL),
            SqlDialect::SQLite => (keywords::SQLITE, functions::SQLITE, snippets::SQLITE),
            SqlDialect::Generic => (&[], &[], &[]),
        };
        Self {
            dialect,
            keywords: keywords::COMMON.iter().chain(extra_keywords).collect(),
            functions: functions::COMMON.iter().chain(extra_functions).collect(),
            snippets: snippets::COMMON.iter().chain(extra_snippets).collect(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn keywords_for(
        &self,
        clause: Option<ClauseKind>,
    ) -> impl Iterator<Item = &'static KeywordEntry> + '_ {
        self.keywords
            .iter()
            .copied()
            .filter(move |e| offered(e.positions, clause))
    }

    pub fn functions_for(
        &self,
        clause: Option<ClauseKind>,
    ) -> impl Iterator<Item = &'static FunctionEntry> + '_ {
        self.functions
            .iter()
            .copied()
            .filter(move |e| offered(e.positions, clause))
    }

    pub fn snippets_for(
        &self,
        clause: Option<ClauseKind>,
    ) -> impl Iterator<Item = &'static SnippetEntry> + '_ {
        self.snippets
            .iter()
            .copied()
            .filter(move |e| offered(e.positions, clause))
    }

    /// True if `name` is a known function of this dialect
    pub fn is_function(&self, name: &str) -> bool {
        self.functions
            .iter()
            .any(|f| f.name.eq_ignore_ascii_case(name))
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::for_dialect(SqlDialect::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(iter: impl Iterator<Item = &'static KeywordEntry>) -> Vec<&'static str> {
        iter.map(|e| e.keyword).collect()
    }

    #[test]
    fn test_statement_start_keywords() {
        let store = CatalogStore::for_dialect(SqlDialect::PostgreSQL);
        let start = labels(store.keywords_for(None));
        assert!(start.contains(&"SELECT"));
        assert!(start.contains(&"DELETE FROM"));
        assert!(!start.contains(&"WHERE"));
    }

    #[test]
    fn test_dialect_extras() {
        let pg = CatalogStore::for_dialect(SqlDialect::PostgreSQL);
        let mysql = CatalogStore::for_dialect(SqlDialect::MySQL);
        let values = Some(ClauseKind::Values);
        assert!(labels(pg.keywords_for(values)).contains(&"ON CONFLICT"));
        assert!(labels(mysql.keywords_for(values)).contains(&"ON DUPLICATE KEY UPDATE"));
        assert!(pg.is_function("date_trunc"));
        assert!(!mysql.is_function("date_trunc"));
        assert!(mysql.is_function("IFNULL"));
    }

    #[test]
    fn test_snippets_by_clause() {
        let store = CatalogStore::for_dialect(SqlDialect::SQLite);
        let start: Vec<_> = store.snippets_for(None).map(|s| s.label).collect();
        assert_eq!(start, vec!["Limit 100 rows", "Count rows"]);
        let insert: Vec<_> = store
            .snippets_for(Some(ClauseKind::Insert))
            .map(|s| s.render(Some("users")))
            .collect();
        assert_eq!(insert.len(), 1);
        assert!(insert[0].starts_with("INSERT INTO users"));
    }

    #[test]
    fn test_generic_has_common_entries_only() {
        let store = CatalogStore::for_dialect(SqlDialect::Generic);
        assert!(store.is_function("COUNT"));
        assert!(!store.is_function("NOW"));
    }
}
