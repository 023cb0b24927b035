use pretty_assertions::assert_eq;

use sqlintel_core::dialect::SqlDialect;
use sqlintel_core::parser::{
    parse_all, parse_at, ClauseContext, ClauseKind, ParserAdapter, SqlParser, StatementKind,
};

const STATEMENTS: &[&str] = &[
    "SELECT id, name FROM users WHERE id = 1",
    "SELECT u.id, COUNT(*) FROM users u JOIN orders o ON o.user_id = u.id GROUP BY u.id",
    "WITH t AS (SELECT id FROM orders) SELECT t.id FROM t",
    "UPDATE accounts SET balance = balance - 10 WHERE id = 1",
    "DELETE FROM sessions WHERE expires_at < 100",
    "INSERT INTO users (id, name) VALUES (1, 'a')",
    "SELECT name FROM users ORDER BY name LIMIT 10",
];

#[test]
fn test_format_is_idempotent_across_dialects() {
    for dialect in [SqlDialect::PostgreSQL, SqlDialect::MySQL, SqlDialect::SQLite] {
        let parser = SqlParser::new(dialect);
        for sql in STATEMENTS {
            let first = parser.parse(sql);
            assert!(first.is_parsed(), "{dialect}: {sql}");
            let formatted = parser.format(first.tree());
            let second = parser.parse(&formatted);
            assert!(second.is_parsed(), "{dialect}: {formatted}");
            assert_eq!(first.tree().shape(), second.tree().shape());
            assert_eq!(parser.format(second.tree()), formatted);
        }
    }
}

#[test]
fn test_parse_is_deterministic() {
    let parser = SqlParser::new(SqlDialect::PostgreSQL);
    for sql in STATEMENTS.iter().copied().chain(["SELECT * FROM users WHERE", "SELEC 1"]) {
        let a = parser.parse(sql);
        let b = parser.parse(sql);
        assert_eq!(a.tree().shape(), b.tree().shape());
        assert_eq!(a.failure().map(|f| f.range), b.failure().map(|f| f.range));
    }
}

#[test]
fn test_cursor_selects_statement() {
    let parser = SqlParser::new(SqlDialect::PostgreSQL);
    let text = "SELECT 1;\nUPDATE users SET name = 'x';\nDELETE FROM t";

    let first = parse_at(&parser, text, 3).into_tree();
    assert_eq!(first.kind, StatementKind::Select);
    let second = parse_at(&parser, text, 15).into_tree();
    assert_eq!(second.kind, StatementKind::Update);
    assert_eq!(&text[second.tables[0].span.start..second.tables[0].span.end], "users");
    let third = parse_at(&parser, text, text.len()).into_tree();
    assert_eq!(third.kind, StatementKind::Delete);
}

#[test]
fn test_semicolon_inside_literal_does_not_split() {
    let parser = SqlParser::new(SqlDialect::PostgreSQL);
    let outcomes = parse_all(&parser, "SELECT ';' FROM t; SELECT 2");
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_parsed()));
}

#[test]
fn test_incomplete_statement_context() {
    let parser = SqlParser::new(SqlDialect::PostgreSQL);
    let text = "SELECT o.total FROM orders o WHERE o.";
    let outcome = parse_at(&parser, text, text.len());
    assert!(!outcome.is_parsed());
    let context = ClauseContext::at(outcome.tree(), text.len());
    assert_eq!(context.clause, Some(ClauseKind::Where));
    assert_eq!(context.qualifier.as_deref(), Some("o"));
    assert_eq!(
        context.qualified_table().map(|t| t.name.as_str()),
        Some("orders")
    );
}

#[test]
fn test_unterminated_string_keeps_tables() {
    let parser = SqlParser::new(SqlDialect::PostgreSQL);
    let outcome = parser.parse("SELECT * FROM users WHERE name = 'bob");
    let failure = outcome.failure().expect("should fail");
    assert_eq!(failure.partial.tables[0].name, "users");
}
