use std::sync::Arc;

use sqlintel_core::config::EngineConfig;
use sqlintel_core::dialect::SqlDialect;
use sqlintel_core::error::Severity;
use sqlintel_core::lint::LintMode;
use sqlintel_core::metadata::{ConnectionKey, SharedMetadataCache, SnapshotBuilder};
use sqlintel_core::orchestrator::Engine;

fn setup_engine(config: EngineConfig) -> Engine {
    let schema = r#"
        CREATE TABLE users (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email TEXT
        );

        CREATE TABLE accounts (
            id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL,
            balance DECIMAL(12, 2)
        );
    "#;
    let cache = Arc::new(SharedMetadataCache::new());
    let mut builder = SnapshotBuilder::new(SqlDialect::PostgreSQL);
    builder.parse(schema);
    let (draft, _) = builder.build();
    cache.publish(ConnectionKey::new("test"), draft);
    Engine::new(cache, config)
}

fn rule_ids(engine: &Engine, sql: &str, mode: LintMode) -> Vec<String> {
    engine
        .lint(sql, mode)
        .into_iter()
        .map(|d| d.rule_id)
        .collect()
}

#[test]
fn test_update_without_where() {
    let engine = setup_engine(EngineConfig::default());
    let diagnostics = engine.lint("UPDATE accounts SET balance = 0", LintMode::OnChange);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, "missing-where");
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].range.start, 0);
    assert_eq!(diagnostics[0].range.end, 6);

    let diagnostics = engine.lint("UPDATE accounts SET balance = 0 WHERE id = 1", LintMode::OnChange);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_delete_without_where_in_second_statement() {
    let engine = setup_engine(EngineConfig::default());
    let sql = "SELECT id FROM users;\nDELETE FROM accounts";
    let diagnostics = engine.lint(sql, LintMode::OnChange);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(&sql[diagnostics[0].range.start..diagnostics[0].range.end], "DELETE FROM");
}

#[test]
fn test_unresolved_column_with_suggestion() {
    let engine = setup_engine(EngineConfig::default());
    let diagnostics = engine.lint("SELECT nme FROM users", LintMode::OnChange);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, "unresolved-column");
    assert_eq!(diagnostics[0].help.as_deref(), Some("Did you mean 'name'?"));
    assert_eq!(diagnostics[0].range.start, 7);
}

#[test]
fn test_unknown_table_silences_column_checks() {
    let engine = setup_engine(EngineConfig::default());
    let diagnostics = engine.lint("SELECT anything FROM audit_log", LintMode::OnChange);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_valid_join() {
    let engine = setup_engine(EngineConfig::default());
    let sql = "SELECT u.name, a.balance FROM users u JOIN accounts a ON a.user_id = u.id WHERE u.id = 1";
    assert!(engine.lint(sql, LintMode::OnChange).is_empty());
}

#[test]
fn test_unused_cte() {
    let engine = setup_engine(EngineConfig::default());
    let ids = rule_ids(
        &engine,
        "WITH rich AS (SELECT id FROM accounts) SELECT id FROM users",
        LintMode::OnChange,
    );
    assert_eq!(ids, vec!["unused-cte"]);
}

#[test]
fn test_pre_execute_adds_confirmation_rules() {
    let engine = setup_engine(EngineConfig::default());

    let drop = "DROP TABLE accounts";
    assert!(rule_ids(&engine, drop, LintMode::OnChange).is_empty());
    assert_eq!(rule_ids(&engine, drop, LintMode::PreExecute), vec!["destructive-statement"]);

    let insert = "INSERT INTO users (id, name) VALUES (1, 'a')";
    assert!(rule_ids(&engine, insert, LintMode::OnChange).is_empty());
    let diagnostics = engine.lint(insert, LintMode::PreExecute);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].rule_id, "confirm-insert-target");
    assert_eq!(diagnostics[0].severity, Severity::Info);

    let wipe = rule_ids(&engine, "DELETE FROM accounts", LintMode::PreExecute);
    assert!(wipe.contains(&"missing-where".to_string()));
    assert!(wipe.contains(&"destructive-statement".to_string()));
}

#[test]
fn test_disabled_rules_from_config() {
    let config = EngineConfig {
        disabled_rules: vec!["missing-where".to_string()],
        ..EngineConfig::default()
    };
    let engine = setup_engine(config);
    assert!(engine.lint("DELETE FROM accounts", LintMode::OnChange).is_empty());
}

#[test]
fn test_parse_error_reported_first() {
    let engine = setup_engine(EngineConfig::default());
    let diagnostics = engine.lint("SELEC * FROM users", LintMode::OnChange);
    assert_eq!(diagnostics[0].rule_id, "parse-error");
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn test_blank_input_is_clean() {
    let engine = setup_engine(EngineConfig::default());
    assert!(engine.lint("  ;\n-- only a comment\n", LintMode::PreExecute).is_empty());
}
