// Integration tests for the analysis orchestrator
use std::sync::Arc;
use std::time::Duration;

use sqlintel_core::config::EngineConfig;
use sqlintel_core::dialect::{ConnectionCapabilities, SqlDialect};
use sqlintel_core::error::{Diagnostic, RuleError};
use sqlintel_core::lint::{LintContext, LintMode, Rule};
use sqlintel_core::metadata::{ConnectionKey, SharedMetadataCache, SnapshotBuilder};
use sqlintel_core::orchestrator::{BufferPhase, Engine};
use sqlintel_core::suggest::{Candidate, SuggestRequest, SuggestionKind, SuggestionSource};

const SHOP: &str = r#"
    CREATE TABLE users (
        id SERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        email TEXT
    );

    CREATE TABLE orders (
        id SERIAL PRIMARY KEY,
        user_id INTEGER NOT NULL,
        total DECIMAL(10, 2)
    );
"#;

fn publish(cache: &SharedMetadataCache, key: &str, ddl: &str) -> u64 {
    let mut builder = SnapshotBuilder::new(SqlDialect::PostgreSQL);
    builder.parse(ddl);
    let (draft, _) = builder.build();
    cache.publish(ConnectionKey::new(key), draft)
}

fn setup() -> (Engine, Arc<SharedMetadataCache>) {
    let cache = Arc::new(SharedMetadataCache::new());
    publish(&cache, "shop", SHOP);
    let engine = Engine::new(cache.clone(), EngineConfig::default());
    (engine, cache)
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_publishes_once() {
    let (engine, _cache) = setup();
    let mut rx = engine.subscribe();
    let buffer = engine.open_buffer();

    for text in ["S", "SEL", "SELECT * FR", "SELECT * FROM us"] {
        buffer.edit(text, text.len());
        assert_eq!(buffer.phase(), BufferPhase::Pending);
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let published = rx.recv().await.expect("one result");
    assert_eq!(published.source_version.buffer, buffer.id());
    assert_eq!(published.source_version.generation, 4);
    assert_eq!(published.result.statement_tree.text, "SELECT * FROM us");
    assert!(rx.try_recv().is_err(), "burst must publish exactly once");
    assert_eq!(buffer.phase(), BufferPhase::Idle);
    assert_eq!(
        buffer.latest().map(|r| r.source_version),
        Some(published.source_version)
    );
}

#[tokio::test(start_paused = true)]
async fn test_separate_edits_publish_in_order() {
    let (engine, _cache) = setup();
    let mut rx = engine.subscribe();
    let buffer = engine.open_buffer();

    buffer.edit("SELECT 1", 8);
    tokio::time::sleep(Duration::from_millis(300)).await;
    buffer.edit("SELECT 2", 8);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let first = rx.recv().await.expect("first");
    let second = rx.recv().await.expect("second");
    assert!(first.source_version < second.source_version);
    assert_eq!(second.result.statement_tree.text, "SELECT 2");
}

#[tokio::test(start_paused = true)]
async fn test_newer_direct_call_supersedes_older() {
    let (engine, _cache) = setup();
    let mut rx = engine.subscribe();
    let buffer = engine.open_buffer();
    let text = "SELECT id FROM users";

    let (first, second) = tokio::join!(buffer.analyze(text, 5), buffer.analyze(text, 9));

    assert!(first.superseded);
    assert!(!second.superseded);
    assert!(first.source_version < second.source_version);
    let published = rx.recv().await.expect("published");
    assert_eq!(published.source_version, second.source_version);
    assert!(rx.try_recv().is_err(), "superseded result must not be published");
}

#[tokio::test(start_paused = true)]
async fn test_edit_supersedes_direct_call() {
    let (engine, _cache) = setup();
    let mut rx = engine.subscribe();
    let buffer = engine.open_buffer();

    let direct = buffer.analyze("SELECT 1", 8);
    let edit = async {
        tokio::task::yield_now().await;
        buffer.edit("SELECT 2", 8);
    };
    let (direct, ()) = tokio::join!(direct, edit);
    assert!(direct.superseded);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let published = rx.recv().await.expect("debounced result");
    assert_eq!(published.result.statement_tree.text, "SELECT 2");
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_closed_buffer_never_publishes() {
    let (engine, _cache) = setup();
    let mut rx = engine.subscribe();
    let buffer = engine.open_buffer();
    buffer.edit("SELECT 1", 8);
    buffer.close();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
    assert!(engine.buffer(buffer.id()).is_err());
}

#[tokio::test]
async fn test_analyze_never_fails() {
    let (engine, _cache) = setup();
    let buffer = engine.open_buffer();
    for (text, cursor) in [
        ("", 0),
        ("   ", 2),
        ("SELECT 'unterminated", 20),
        ("SELECT * FROM users WHERE", 99),
        (";;;", 1),
        ("SELECT ü FROM t", 8),
    ] {
        let result = buffer.analyze(text, cursor).await;
        assert!(!result.superseded, "{text:?}");
    }
}

#[tokio::test]
async fn test_analysis_result_contents() {
    let (engine, _cache) = setup();
    let buffer = engine.open_buffer();
    let text = "DELETE FROM orders;\nSELECT u. FROM users u";
    let cursor = text.find("u. ").map(|i| i + 2).unwrap_or_default();

    let result = buffer.analyze(text, cursor).await;

    assert_eq!(result.statement_tree.offset, 19);
    assert_eq!(result.clause_context.qualifier.as_deref(), Some("u"));
    let labels = result.suggestions.labels();
    assert_eq!(labels, vec!["email", "id", "name"]);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.rule_id == "missing-where" && d.range.start == 0));
    assert_eq!(result.snapshot_version, 1);
}

#[tokio::test]
async fn test_older_snapshot_marks_identifiers_stale() {
    let (engine, cache) = setup();
    publish(&cache, "archive", "CREATE TABLE archived_users (id INT, name TEXT);");
    cache.activate(&ConnectionKey::new("archive")).expect("known");
    let buffer = engine.open_buffer();
    let text = "SELECT * FROM ";

    let fresh = buffer.analyze(text, text.len()).await;
    assert_eq!(fresh.snapshot_version, 2);
    assert!(!fresh.stale_metadata);
    assert!(fresh.suggestions.labels().contains(&"archived_users"));

    cache.activate(&ConnectionKey::new("shop")).expect("known");
    let stale = buffer.analyze(text, text.len()).await;
    assert_eq!(stale.snapshot_version, 1);
    assert!(stale.stale_metadata);
    for suggestion in &stale.suggestions.items {
        let expect_stale = suggestion.kind == SuggestionKind::Identifier;
        assert_eq!(suggestion.stale, expect_stale, "{}", suggestion.label);
    }
    assert!(stale.suggestions.labels().contains(&"users"));
}

#[tokio::test(start_paused = true)]
async fn test_metadata_change_does_not_reanalyze() {
    let (engine, cache) = setup();
    let mut rx = engine.subscribe();
    let buffer = engine.open_buffer();
    let text = "SELECT * FROM ";
    buffer.analyze(text, text.len()).await;
    rx.recv().await.expect("direct result");

    publish(&cache, "shop", &format!("{SHOP}\nCREATE TABLE invoices (id INT);"));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(buffer.phase(), BufferPhase::Idle);

    // The next run picks up the new snapshot's tables
    let next = buffer.analyze(text, text.len()).await;
    assert_eq!(next.snapshot_version, 2);
    assert!(next.suggestions.labels().contains(&"invoices"));
}

#[tokio::test]
async fn test_accept_boosts_within_buffer_only() {
    let (engine, _cache) = setup();
    let text = "SELECT * FROM users WHERE ";
    let first = engine.open_buffer();
    let second = engine.open_buffer();

    let before = first.analyze(text, text.len()).await;
    let name = before
        .suggestions
        .items
        .iter()
        .find(|s| s.label == "name")
        .cloned()
        .expect("name offered");
    first.accept(&name);

    let boosted = first.analyze(text, text.len()).await;
    assert_eq!(boosted.suggestions.items[0].label, "name");
    let other = second.analyze(text, text.len()).await;
    assert_eq!(other.suggestions.items[0].label, "email");
}

#[tokio::test]
async fn test_view_reads_latest_and_reparses() {
    let (engine, _cache) = setup();
    let view = engine.view();
    let buffer = engine.open_buffer();
    assert!(view.latest(buffer.id()).is_none());

    let result = buffer.analyze("SELECT 1", 8).await;
    let latest = view.latest(buffer.id()).expect("published");
    assert_eq!(latest.source_version, result.source_version);

    let reparsed = view.request_reparse(buffer.id()).await.expect("open buffer");
    assert!(reparsed.source_version > result.source_version);
    assert_eq!(reparsed.statement_tree.text, "SELECT 1");
}

struct Exploding;

impl Rule for Exploding {
    fn id(&self) -> &'static str {
        "exploding"
    }

    fn check(&self, _ctx: &LintContext<'_>) -> Result<Vec<Diagnostic>, RuleError> {
        Err(RuleError::Failed("cannot cope".to_string()))
    }
}

#[tokio::test]
async fn test_rule_failure_is_reported_not_fatal() {
    let (engine, _cache) = setup();
    engine.register_rule(Arc::new(Exploding));
    let mut failures = engine.rule_failures();

    let diagnostics = engine.lint("DELETE FROM users", LintMode::OnChange);
    assert!(diagnostics.iter().any(|d| d.rule_id == "missing-where"));

    let failure = failures.recv().await.expect("failure reported");
    assert_eq!(failure.rule_id, "exploding");
    assert_eq!(failure.message, "cannot cope");

    let buffer = engine.open_buffer();
    let result = buffer.analyze("DELETE FROM users", 17).await;
    assert_eq!(result.rule_failures.len(), 1);
    assert!(result.diagnostics.iter().any(|d| d.rule_id == "missing-where"));
}

struct SavedQueries;

impl SuggestionSource for SavedQueries {
    fn name(&self) -> &'static str {
        "saved-queries"
    }

    fn collect(&self, request: &SuggestRequest<'_>, out: &mut Vec<Candidate>) {
        if request.context.clause.is_none() {
            out.push(Candidate::new(
                SuggestionKind::Snippet,
                "recent_orders",
                "saved query",
                "SELECT * FROM orders ORDER BY id DESC",
            ));
        }
    }
}

#[tokio::test]
async fn test_registered_source_is_ranked_and_survives_prime() {
    let (engine, _cache) = setup();
    let before = engine.suggest("recent", 6).await;
    assert!(!before.labels().contains(&"recent_orders"));

    engine.register_source(Arc::new(SavedQueries));
    let list = engine.suggest("recent", 6).await;
    let item = list
        .items
        .iter()
        .find(|s| s.label == "recent_orders")
        .expect("registered source consulted");
    assert_eq!(item.kind, SuggestionKind::Snippet);
    assert_eq!(item.edit.range.start, 0);
    assert_eq!(item.edit.range.end, 6);

    // Filtered against the typed token like every other candidate
    let other = engine.suggest("zzz", 3).await;
    assert!(!other.labels().contains(&"recent_orders"));

    engine.prime(ConnectionCapabilities::new(SqlDialect::SQLite));
    let after = engine.suggest("recent", 6).await;
    assert!(after.labels().contains(&"recent_orders"));
}

#[tokio::test]
async fn test_prime_switches_dialect() {
    let (engine, _cache) = setup();
    let ilike = "SELECT * FROM users WHERE name IL";
    let regexp = "SELECT * FROM users WHERE name REG";
    let pg = engine.suggest(ilike, ilike.len()).await;
    assert!(pg.labels().contains(&"ILIKE"));

    engine.prime(ConnectionCapabilities::new(SqlDialect::MySQL));
    engine.prime(ConnectionCapabilities::new(SqlDialect::MySQL));
    assert_eq!(engine.dialect(), SqlDialect::MySQL);
    let mysql = engine.suggest(ilike, ilike.len()).await;
    assert!(!mysql.labels().contains(&"ILIKE"));
    let mysql = engine.suggest(regexp, regexp.len()).await;
    assert!(mysql.labels().contains(&"REGEXP"));
}

#[tokio::test]
async fn test_shutdown_closes_buffers() {
    let (engine, _cache) = setup();
    let buffer = engine.open_buffer();
    engine.shutdown();
    assert!(engine.buffer(buffer.id()).is_err());
}
