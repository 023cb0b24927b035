//! Suggestion broker - ranked completions for a cursor position
//!
//! Candidates come from independent `SuggestionSource`s (the dialect
//! catalog and the schema snapshot). The broker filters them against the
//! partially typed token, ranks them by a total `RankKey`, and caps the
//! list.

mod recent;
mod sources;

pub use recent::RecentlyAccepted;
pub use sources::{table_candidates, CatalogSuggestions, SchemaIdentifiers};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::error::Span;
use crate::metadata::MetadataSnapshot;
use crate::parser::{ClauseContext, ClauseKind, StatementTree};

/// Default result cap
pub const MAX_SUGGESTIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Keyword,
    Identifier,
    Snippet,
    Function,
}

impl SuggestionKind {
    /// Lower sorts first. Identifiers lead inside a clause; at the start of a
    /// statement the statement keywords do.
    pub fn priority(&self, at_start: bool) -> u8 {
        match (self, at_start) {
            (SuggestionKind::Identifier, false) => 0,
            (SuggestionKind::Snippet, false) => 1,
            (SuggestionKind::Keyword, false) => 2,
            (SuggestionKind::Keyword, true) => 0,
            (SuggestionKind::Snippet, true) => 1,
            (SuggestionKind::Identifier, true) => 2,
            (SuggestionKind::Function, _) => 3,
        }
    }
}

/// How well a label matches the typed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Prefix,
    Substring,
}

impl MatchQuality {
    /// `None` when the label does not contain the token at all
    pub fn of(label: &str, token: &str) -> Option<Self> {
        if token.is_empty() {
            return Some(MatchQuality::Prefix);
        }
        let label = label.to_lowercase();
        let token = token.to_lowercase();
        if label.starts_with(&token) {
            Some(MatchQuality::Prefix)
        } else if label.contains(&token) {
            Some(MatchQuality::Substring)
        } else {
            None
        }
    }
}

/// Sort key of a suggestion. Compared field by field: match quality, then
/// recent use, then kind, then label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RankKey {
    pub quality: MatchQuality,
    /// Position in the recently-accepted list, `usize::MAX` if absent
    pub recency: usize,
    pub kind_priority: u8,
    pub folded_label: String,
    pub label: String,
}

/// Replacement to apply when a suggestion is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub range: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub label: String,
    pub detail: String,
    pub rank: RankKey,
    pub edit: TextEdit,
    /// Identifier taken from a snapshot known to be stale
    pub stale: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuggestionList {
    pub items: Vec<Suggestion>,
    /// More candidates matched than the cap allowed
    pub more_available: bool,
}

impl SuggestionList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.label.as_str()).collect()
    }
}

/// Unranked candidate produced by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: SuggestionKind,
    pub label: String,
    pub detail: String,
    /// Text inserted in place of the typed token
    pub insert: String,
}

impl Candidate {
    pub fn new(
        kind: SuggestionKind,
        label: impl Into<String>,
        detail: impl Into<String>,
        insert: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            detail: detail.into(),
            insert: insert.into(),
        }
    }
}

/// Which kinds of candidate make sense at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateKinds {
    pub keywords: bool,
    pub functions: bool,
    pub snippets: bool,
    pub tables: bool,
    pub columns: bool,
}

impl CandidateKinds {
    pub fn for_context(ctx: &ClauseContext) -> Self {
        // `alias.` or `schema.` narrows to identifiers only
        if ctx.qualifier.is_some() {
            return Self {
                tables: true,
                columns: true,
                ..Self::default()
            };
        }
        let has_tables = !ctx.tables.is_empty();
        match ctx.clause {
            None => Self {
                keywords: true,
                snippets: true,
                ..Self::default()
            },
            Some(ClauseKind::With) => Self {
                keywords: true,
                ..Self::default()
            },
            Some(ClauseKind::Select) => Self {
                keywords: true,
                functions: true,
                columns: has_tables,
                ..Self::default()
            },
            Some(ClauseKind::From | ClauseKind::Join | ClauseKind::Update | ClauseKind::Delete) => {
                Self {
                    keywords: true,
                    tables: true,
                    ..Self::default()
                }
            }
            Some(ClauseKind::Insert) => Self {
                keywords: true,
                tables: true,
                snippets: true,
                ..Self::default()
            },
            Some(
                ClauseKind::Where
                | ClauseKind::On
                | ClauseKind::Having
                | ClauseKind::GroupBy
                | ClauseKind::OrderBy
                | ClauseKind::Set
                | ClauseKind::Returning,
            ) => Self {
                keywords: true,
                functions: true,
                snippets: true,
                columns: true,
                ..Self::default()
            },
            Some(ClauseKind::Values | ClauseKind::Limit | ClauseKind::Offset) => Self {
                keywords: true,
                functions: true,
                ..Self::default()
            },
            Some(ClauseKind::Ddl) => Self {
                tables: true,
                ..Self::default()
            },
        }
    }
}

/// What a source sees for one request
pub struct SuggestRequest<'a> {
    pub tree: &'a StatementTree,
    pub context: &'a ClauseContext,
    pub snapshot: &'a MetadataSnapshot,
    pub kinds: CandidateKinds,
    /// Table and view candidates of the snapshot, computed once per version
    pub schema_tables: &'a [Candidate],
}

/// A provider of completion candidates
pub trait SuggestionSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn collect(&self, request: &SuggestRequest<'_>, out: &mut Vec<Candidate>);
}

/// Input for one `suggest` call
pub struct SuggestInput<'a> {
    pub tree: &'a StatementTree,
    pub context: &'a ClauseContext,
    pub snapshot: &'a MetadataSnapshot,
    /// Mark identifier candidates as stale
    pub stale: bool,
    pub recent: &'a RecentlyAccepted,
    /// Precomputed `table_candidates` for `snapshot`, if the caller keeps them
    pub schema_tables: Option<&'a [Candidate]>,
}

pub struct SuggestionBroker {
    sources: Vec<Arc<dyn SuggestionSource>>,
    catalog: Arc<CatalogStore>,
    cap: usize,
}

impl SuggestionBroker {
    /// Broker with the catalog and schema sources
    pub fn new(catalog: Arc<CatalogStore>, cap: usize) -> Self {
        let dialect = catalog.dialect();
        Self {
            sources: vec![
                Arc::new(SchemaIdentifiers::new(dialect)),
                Arc::new(CatalogSuggestions::new(Arc::clone(&catalog))),
            ],
            catalog,
            cap,
        }
    }

    pub fn with_source(self, source: impl SuggestionSource + 'static) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    pub fn with_shared_source(mut self, source: Arc<dyn SuggestionSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn suggest(&self, input: SuggestInput<'_>) -> SuggestionList {
        let owned;
        let schema_tables = match input.schema_tables {
            Some(tables) => tables,
            None => {
                owned = table_candidates(input.snapshot, self.catalog.dialect());
                owned.as_slice()
            }
        };
        let request = SuggestRequest {
            tree: input.tree,
            context: input.context,
            snapshot: input.snapshot,
            kinds: CandidateKinds::for_context(input.context),
            schema_tables,
        };

        let mut candidates = Vec::new();
        for source in &self.sources {
            let before = candidates.len();
            source.collect(&request, &mut candidates);
            tracing::trace!(
                source = source.name(),
                count = candidates.len() - before,
                "collected candidates"
            );
        }

        let at_start = input.context.clause.is_none();
        let mut best: HashMap<(SuggestionKind, String), Suggestion> = HashMap::new();
        for candidate in candidates {
            let Some(quality) = MatchQuality::of(&candidate.label, &input.context.partial) else {
                continue;
            };
            let rank = RankKey {
                quality,
                recency: input
                    .recent
                    .position(candidate.kind, &candidate.label)
                    .unwrap_or(usize::MAX),
                kind_priority: candidate.kind.priority(at_start),
                folded_label: candidate.label.to_lowercase(),
                label: candidate.label.clone(),
            };
            let suggestion = Suggestion {
                kind: candidate.kind,
                stale: input.stale && candidate.kind == SuggestionKind::Identifier,
                label: candidate.label,
                detail: candidate.detail,
                rank,
                edit: TextEdit {
                    range: input.context.replace,
                    text: candidate.insert,
                },
            };
            // First candidate wins for a repeated (kind, label)
            best.entry((suggestion.kind, suggestion.label.clone()))
                .or_insert(suggestion);
        }

        let mut items: Vec<Suggestion> = best.into_values().collect();
        items.sort_by(|a, b| a.rank.cmp(&b.rank));
        let more_available = items.len() > self.cap;
        items.truncate(self.cap);
        SuggestionList {
            items,
            more_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialect;
    use crate::metadata::{ConnectionKey, MetadataCache, SharedMetadataCache, SnapshotBuilder};
    use crate::parser::{ParserAdapter, SqlParser};

    fn snapshot() -> Arc<MetadataSnapshot> {
        let mut builder = SnapshotBuilder::new(SqlDialect::PostgreSQL);
        builder.parse(
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT, email TEXT);
             CREATE TABLE orders (id INT, user_id INT, total NUMERIC);
             CREATE TABLE audit.events (id INT, payload TEXT);",
        );
        let cache = SharedMetadataCache::new();
        cache.publish(ConnectionKey::new("test"), builder.build().0);
        cache.current()
    }

    fn suggest_with(
        sql: &str,
        cursor: usize,
        recent: &RecentlyAccepted,
        cap: usize,
    ) -> SuggestionList {
        let broker = SuggestionBroker::new(
            Arc::new(CatalogStore::for_dialect(SqlDialect::PostgreSQL)),
            cap,
        );
        let parsed = SqlParser::new(SqlDialect::PostgreSQL).parse(sql);
        let context = ClauseContext::at(parsed.tree(), cursor);
        let snapshot = snapshot();
        broker.suggest(SuggestInput {
            tree: parsed.tree(),
            context: &context,
            snapshot: &snapshot,
            stale: false,
            recent,
            schema_tables: None,
        })
    }

    fn suggest(sql: &str) -> SuggestionList {
        suggest_with(sql, sql.len(), &RecentlyAccepted::default(), MAX_SUGGESTIONS)
    }

    #[test]
    fn test_match_quality() {
        assert_eq!(MatchQuality::of("users", "us"), Some(MatchQuality::Prefix));
        assert_eq!(MatchQuality::of("users", "ER"), Some(MatchQuality::Substring));
        assert_eq!(MatchQuality::of("users", "x"), None);
        assert_eq!(MatchQuality::of("users", ""), Some(MatchQuality::Prefix));
    }

    #[test]
    fn test_from_offers_tables_not_columns() {
        let list = suggest("SELECT * FROM ");
        assert!(list.labels().contains(&"users"));
        assert!(list.labels().contains(&"audit.events"));
        assert!(list
            .items
            .iter()
            .all(|s| matches!(s.kind, SuggestionKind::Identifier | SuggestionKind::Keyword)));
        assert!(!list.labels().contains(&"email"));
    }

    #[test]
    fn test_alias_columns() {
        let sql = "SELECT u. FROM users u";
        let list = suggest_with(sql, 9, &RecentlyAccepted::default(), MAX_SUGGESTIONS);
        assert_eq!(list.labels(), vec!["email", "id", "name"]);
        assert!(list.items.iter().all(|s| s.edit.range == Span::empty(9)));
    }

    #[test]
    fn test_prefix_before_substring() {
        let list = suggest("SELECT id FROM users WHERE na");
        assert_eq!(list.items[0].label, "name");
        let qualities: Vec<_> = list.items.iter().map(|s| s.rank.quality).collect();
        let mut sorted = qualities.clone();
        sorted.sort();
        assert_eq!(qualities, sorted);
    }

    #[test]
    fn test_statement_start_prefers_keywords() {
        let list = suggest("SEL");
        assert_eq!(list.items[0].label, "SELECT");
        assert_eq!(list.items[0].kind, SuggestionKind::Keyword);
    }

    #[test]
    fn test_recent_boost_within_match_quality() {
        let mut recent = RecentlyAccepted::default();
        recent.accept(SuggestionKind::Identifier, "user_id");
        let sql = "SELECT * FROM orders WHERE ";
        let list = suggest_with(sql, sql.len(), &recent, MAX_SUGGESTIONS);
        assert_eq!(list.items[0].label, "user_id");
    }

    #[test]
    fn test_cap_sets_more_available() {
        let list = suggest_with("SELECT * FROM users WHERE ", 26, &RecentlyAccepted::default(), 3);
        assert_eq!(list.len(), 3);
        assert!(list.more_available);
    }

    #[test]
    fn test_quoting_in_edit() {
        let mut builder = SnapshotBuilder::new(SqlDialect::PostgreSQL);
        builder.parse("CREATE TABLE \"Order Items\" (id INT);");
        let cache = SharedMetadataCache::new();
        cache.publish(ConnectionKey::new("q"), builder.build().0);
        let snapshot = cache.current();
        let tables = table_candidates(&snapshot, SqlDialect::PostgreSQL);
        assert_eq!(tables[0].label, "Order Items");
        assert_eq!(tables[0].insert, "\"Order Items\"");
    }
}
