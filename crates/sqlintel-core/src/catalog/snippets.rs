//! Snippet templates

use super::Position::{self, In, Start};
use crate::parser::ClauseKind::*;

/// Reusable statement template. `{table}` is replaced with the first
/// table in scope when rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetEntry {
    pub label: &'static str,
    pub template: &'static str,
    pub detail: &'static str,
    pub positions: &'static [Position],
}

impl SnippetEntry {
    pub fn render(&self, table: Option<&str>) -> String {
        self.template.replace("{table}", table.unwrap_or("table_name"))
    }
}

pub(super) static COMMON: &[SnippetEntry] = &[
    SnippetEntry {
        label: "Limit 100 rows",
        template: "SELECT * FROM {table} LIMIT 100;",
        detail: "Quick peek at a table with sane row cap",
        positions: &[Start],
    },
    SnippetEntry {
        label: "Count rows",
        template: "SELECT COUNT(*) FROM {table};",
        detail: "Row count for a table",
        positions: &[Start],
    },
    SnippetEntry {
        label: "Exists guard",
        template: "EXISTS (SELECT 1 FROM {table} WHERE /* condition */)",
        detail: "Filter rows when a related record exists",
        positions: &[In(Where), In(Having)],
    },
];

pub(super) static POSTGRES: &[SnippetEntry] = &[SnippetEntry {
    label: "Upsert skeleton",
    template: "INSERT INTO {table} AS t (...) VALUES (...) \
               ON CONFLICT (id) DO UPDATE SET column = EXCLUDED.column;",
    detail: "Ready-to-edit INSERT ... ON CONFLICT block",
    positions: &[In(Insert)],
}];

pub(super) static MYSQL: &[SnippetEntry] = &[SnippetEntry {
    label: "Upsert skeleton",
    template: "INSERT INTO {table} (...) VALUES (...) \
               ON DUPLICATE KEY UPDATE column = VALUES(column);",
    detail: "Ready-to-edit INSERT ... ON DUPLICATE KEY block",
    positions: &[In(Insert)],
}];

pub(super) static SQLITE: &[SnippetEntry] = &[SnippetEntry {
    label: "Upsert skeleton",
    template: "INSERT INTO {table} (...) VALUES (...) \
               ON CONFLICT (id) DO UPDATE SET column = excluded.column;",
    detail: "Ready-to-edit INSERT ... ON CONFLICT block",
    positions: &[In(Insert)],
}];
