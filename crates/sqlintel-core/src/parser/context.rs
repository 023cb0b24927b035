//! Cursor context: which clause the cursor is in and what is being typed

use serde::Serialize;

use super::tree::{ClauseKind, StatementTree, TableRef};
use crate::error::Span;

/// Where the cursor sits within a statement, as far as completion cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClauseContext {
    /// Clause the cursor is in; `None` at the start of a statement
    pub clause: Option<ClauseKind>,
    /// Identifier fragment immediately before the cursor
    pub partial: String,
    /// Range of the fragment; suggestions replace this range
    pub replace: Span,
    /// Text before a `.` directly preceding the fragment (`u` in `u.na|`)
    pub qualifier: Option<String>,
    /// Tables and CTEs visible from the cursor
    pub tables: Vec<TableRef>,
    /// CTE names defined by the statement
    pub ctes: Vec<String>,
    /// The statement is an UPDATE/DELETE with no WHERE
    pub dml_without_where: bool,
}

impl ClauseContext {
    /// Build the context for `cursor`, a byte offset in the same coordinate
    /// space as `tree`'s spans
    pub fn at(tree: &StatementTree, cursor: usize) -> Self {
        let local = cursor.saturating_sub(tree.offset).min(tree.text.len());
        let head = &tree.text[..floor_char_boundary(&tree.text, local)];

        let partial_len = head
            .chars()
            .rev()
            .take_while(|c| is_identifier_char(*c))
            .map(char::len_utf8)
            .sum::<usize>();
        let partial_start = head.len() - partial_len;
        let partial = head[partial_start..].to_string();

        let qualifier = head[..partial_start]
            .strip_suffix('.')
            .map(|before| {
                let before = before.trim_end_matches('"');
                let len = before
                    .chars()
                    .rev()
                    .take_while(|c| is_identifier_char(*c))
                    .map(char::len_utf8)
                    .sum::<usize>();
                before[before.len() - len..].to_string()
            })
            .filter(|q| !q.is_empty());

        let token_start = tree.offset + partial_start;
        let clause = tree.clause_before(token_start).map(|c| c.kind);

        let mut tables = tree.tables.clone();
        for cte in &tree.ctes {
            if !tables.iter().any(|t| t.name.eq_ignore_ascii_case(&cte.name)) {
                tables.push(TableRef {
                    schema: None,
                    name: cte.name.clone(),
                    alias: None,
                    span: cte.span,
                });
            }
        }

        Self {
            clause,
            partial,
            replace: Span::new(token_start, tree.offset + head.len()),
            qualifier,
            tables,
            ctes: tree.ctes.iter().map(|c| c.name.clone()).collect(),
            dml_without_where: tree.is_dml_without_where(),
        }
    }

    /// Table the qualifier refers to, if any
    pub fn qualified_table(&self) -> Option<&TableRef> {
        let qualifier = self.qualifier.as_deref()?;
        self.tables
            .iter()
            .find(|t| t.answers_to(qualifier))
            .or_else(|| {
                self.tables
                    .iter()
                    .find(|t| t.name.eq_ignore_ascii_case(qualifier))
            })
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
