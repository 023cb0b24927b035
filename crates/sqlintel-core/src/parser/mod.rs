//! Parser adapter - turns SQL text into a normalized `StatementTree`
//!
//! Parsing never fails outright. Malformed input yields a `ParseFailure`
//! carrying a best-effort tree built from the token stream, so completion
//! keeps working while a statement is half typed.

mod collect;
mod context;
mod location;
mod scan;
mod split;
mod tree;

pub use context::ClauseContext;
pub(crate) use scan::is_reserved_word;
pub use split::{statement_range_at, statement_ranges};
pub use tree::{
    Clause, ClauseKind, ColumnRef, CteDef, Parameter, StatementKind, StatementTree, TableRef,
    TreeShape,
};

use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect;
use sqlparser::parser::{Parser, ParserError};

use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, Span};
use collect::{Collector, RawColumn};
use location::{error_location, LineIndex};
use scan::{Scan, Tok};

/// Rule id carried by parse failure diagnostics
pub const PARSE_ERROR: &str = "parse-error";

/// Dialect-aware SQL parser. Implementations must be pure: the same text
/// always produces the same tree.
pub trait ParserAdapter: Send + Sync {
    fn dialect(&self) -> SqlDialect;

    /// Parse a single statement
    fn parse(&self, text: &str) -> ParseOutcome;

    /// Render a tree back to SQL text
    fn format(&self, tree: &StatementTree) -> String;
}

/// Malformed input: what went wrong, where, and what could still be recovered
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub message: String,
    pub range: Span,
    pub partial: StatementTree,
}

impl ParseFailure {
    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic::error(PARSE_ERROR, self.message.clone(), self.range)
    }
}

#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(StatementTree),
    Failed(ParseFailure),
}

impl ParseOutcome {
    /// The full tree, or the partial one on failure
    pub fn tree(&self) -> &StatementTree {
        match self {
            ParseOutcome::Parsed(tree) => tree,
            ParseOutcome::Failed(failure) => &failure.partial,
        }
    }

    pub fn into_tree(self) -> StatementTree {
        match self {
            ParseOutcome::Parsed(tree) => tree,
            ParseOutcome::Failed(failure) => failure.partial,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            ParseOutcome::Parsed(_) => None,
            ParseOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }

    /// Move every span by `delta` bytes
    pub fn rebase(self, delta: usize) -> Self {
        match self {
            ParseOutcome::Parsed(tree) => ParseOutcome::Parsed(tree.rebase(delta)),
            ParseOutcome::Failed(failure) => ParseOutcome::Failed(ParseFailure {
                message: failure.message,
                range: failure.range.shift(delta),
                partial: failure.partial.rebase(delta),
            }),
        }
    }
}

/// Parse the statement of `text` that contains `cursor`. Spans in the
/// result are offsets into `text`.
pub fn parse_at(parser: &dyn ParserAdapter, text: &str, cursor: usize) -> ParseOutcome {
    let range = statement_range_at(text, cursor);
    parser
        .parse(&text[range.start..range.end])
        .rebase(range.start)
}

/// Parse every non-blank statement of `text`, spans relative to `text`
pub fn parse_all(parser: &dyn ParserAdapter, text: &str) -> Vec<ParseOutcome> {
    statement_ranges(text)
        .into_iter()
        .map(|range| {
            parser
                .parse(&text[range.start..range.end])
                .rebase(range.start)
        })
        .filter(|outcome| outcome.tree().kind != StatementKind::Empty)
        .collect()
}

/// `ParserAdapter` backed by sqlparser
pub struct SqlParser {
    dialect: SqlDialect,
    inner: Box<dyn Dialect + Send + Sync>,
}

impl SqlParser {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            inner: dialect.parser_dialect(),
        }
    }

    fn failed(&self, text: &str, tokens: &[Tok], message: String, range: Span) -> ParseOutcome {
        tracing::debug!(dialect = %self.dialect, %message, "parse failed, recovering partial tree");
        ParseOutcome::Failed(ParseFailure {
            message,
            range,
            partial: partial_tree(text, tokens),
        })
    }
}

impl ParserAdapter for SqlParser {
    fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    fn parse(&self, text: &str) -> ParseOutcome {
        let lexed = scan::lex(self.inner.as_ref(), text);
        if let Some(err) = lexed.error {
            let range = Span::new(err.offset, text.len());
            return self.failed(text, &lexed.tokens, err.message, range);
        }
        let tokens = lexed.tokens;
        if tokens.is_empty() {
            return ParseOutcome::Parsed(StatementTree::empty(text));
        }

        match Parser::parse_sql(self.inner.as_ref(), text) {
            Ok(mut statements) if statements.len() == 1 => {
                let statement = statements.remove(0);
                ParseOutcome::Parsed(full_tree(text, &tokens, statement))
            }
            Ok(statements) if statements.is_empty() => {
                ParseOutcome::Parsed(StatementTree::empty(text))
            }
            Ok(_) => {
                let range = Span::new(0, text.len());
                self.failed(
                    text,
                    &tokens,
                    "Expected a single statement".to_string(),
                    range,
                )
            }
            Err(err) => {
                let message = match err {
                    ParserError::ParserError(msg) | ParserError::TokenizerError(msg) => msg,
                    ParserError::RecursionLimitExceeded => "Recursion limit exceeded".to_string(),
                };
                let index = LineIndex::new(text);
                let range = error_location(&message)
                    .and_then(|loc| index.offset(loc))
                    .and_then(|offset| tokens.iter().find(|t| t.span.start >= offset))
                    .map(|t| t.span)
                    .unwrap_or_else(|| Span::empty(text.trim_end().len()));
                self.failed(text, &tokens, message, range)
            }
        }
    }

    fn format(&self, tree: &StatementTree) -> String {
        match (&tree.statement, tree.complete) {
            (Some(statement), true) => statement.to_string(),
            _ => tree.text.trim().to_string(),
        }
    }
}

/// Top-level clause that owns `offset`
fn clause_of(clauses: &[Clause], offset: usize) -> Option<ClauseKind> {
    clauses
        .iter()
        .filter(|c| c.keyword.start <= offset)
        .max_by_key(|c| c.keyword.start)
        .map(|c| c.kind)
}

fn full_tree(text: &str, tokens: &[Tok], statement: Statement) -> StatementTree {
    let index = LineIndex::new(text);
    let scan = scan::scan(tokens, text.len());
    let mut collector = Collector::new(&index);
    collector.collect_statement(&statement);

    let tables = if collector.walked {
        let mut tables = collector.tables;
        fill_table_spans(&mut tables, &scan);
        tables
    } else {
        scan.tables.clone()
    };

    let columns = attribute_columns(collector.columns, &scan);

    let mut ctes = collector.ctes;
    for cte in &mut ctes {
        if let Some(scanned) = scan
            .ctes
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(&cte.name))
        {
            cte.body = scanned.body;
            if cte.span == Span::default() {
                cte.span = scanned.span;
            }
        }
    }
    mark_referenced(&mut ctes, &tables);

    StatementTree {
        kind: collect::statement_kind(&statement),
        has_where: collect::has_where(&statement).unwrap_or_else(|| scan.has_where()),
        clauses: scan.clauses,
        tables,
        ctes,
        columns,
        parameters: scan.parameters,
        output_aliases: collector.output_aliases,
        complete: true,
        text: text.to_string(),
        offset: 0,
        statement: Some(statement),
    }
}

fn partial_tree(text: &str, tokens: &[Tok]) -> StatementTree {
    let scan = scan::scan(tokens, text.len());
    let has_where = scan.has_where();
    let mut ctes = scan.ctes;
    mark_referenced(&mut ctes, &scan.tables);
    StatementTree {
        kind: scan.kind.unwrap_or(StatementKind::Other),
        clauses: scan.clauses,
        tables: scan.tables,
        ctes,
        columns: scan.columns,
        parameters: scan.parameters,
        output_aliases: scan.output_aliases,
        has_where,
        complete: false,
        text: text.to_string(),
        offset: 0,
        statement: None,
    }
}

/// Give tables whose identifiers carried no position the span the token
/// scan found for the same name
fn fill_table_spans(tables: &mut [TableRef], scan: &Scan) {
    let mut used = vec![false; scan.tables.len()];
    for table in tables.iter_mut() {
        if table.span != Span::default() {
            continue;
        }
        let found = scan
            .tables
            .iter()
            .enumerate()
            .find(|(i, s)| !used[*i] && s.name.eq_ignore_ascii_case(&table.name));
        if let Some((i, scanned)) = found {
            used[i] = true;
            table.span = scanned.span;
        }
    }
}

fn attribute_columns(raw: Vec<RawColumn>, scan: &Scan) -> Vec<ColumnRef> {
    let mut used = vec![false; scan.columns.len()];
    raw.into_iter()
        .map(|col| {
            let span = col.span.or_else(|| {
                let (i, scanned) = scan.columns.iter().enumerate().find(|(i, s)| {
                    !used[*i] && s.name.eq_ignore_ascii_case(&col.name)
                })?;
                used[i] = true;
                Some(scanned.span)
            });
            let clause = span.and_then(|s| clause_of(&scan.clauses, s.start));
            ColumnRef {
                qualifier: col.qualifier,
                name: col.name,
                span: span.unwrap_or_default(),
                clause,
            }
        })
        .collect()
}

/// A CTE counts as referenced when a table reference outside its own body
/// names it
fn mark_referenced(ctes: &mut [CteDef], tables: &[TableRef]) {
    for cte in ctes.iter_mut() {
        cte.referenced = tables.iter().any(|t| {
            t.name.eq_ignore_ascii_case(&cte.name)
                && t.schema.is_none()
                && !cte.body.map(|b| b.contains_span(&t.span)).unwrap_or(false)
        });
    }
}
