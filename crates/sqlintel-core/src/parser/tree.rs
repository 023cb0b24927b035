//! Normalized statement tree

use serde::Serialize;
use sqlparser::ast::Statement;

use crate::error::Span;

/// What kind of statement the tree describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Blank input (whitespace or comments only)
    Empty,
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Truncate,
    Other,
}

impl StatementKind {
    pub fn is_dml_write(&self) -> bool {
        matches!(self, StatementKind::Update | StatementKind::Delete)
    }
}

/// Top-level SQL clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    With,
    Select,
    From,
    Join,
    On,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Insert,
    Values,
    Update,
    Set,
    Delete,
    Returning,
    Ddl,
}

impl ClauseKind {
    /// Clauses made of expressions over columns
    pub fn expects_expression(&self) -> bool {
        matches!(
            self,
            ClauseKind::Select
                | ClauseKind::On
                | ClauseKind::Where
                | ClauseKind::GroupBy
                | ClauseKind::Having
                | ClauseKind::OrderBy
                | ClauseKind::Set
                | ClauseKind::Returning
                | ClauseKind::Values
        )
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ClauseKind::With => "WITH",
            ClauseKind::Select => "SELECT",
            ClauseKind::From => "FROM",
            ClauseKind::Join => "JOIN",
            ClauseKind::On => "ON",
            ClauseKind::Where => "WHERE",
            ClauseKind::GroupBy => "GROUP BY",
            ClauseKind::Having => "HAVING",
            ClauseKind::OrderBy => "ORDER BY",
            ClauseKind::Limit => "LIMIT",
            ClauseKind::Offset => "OFFSET",
            ClauseKind::Insert => "INSERT INTO",
            ClauseKind::Values => "VALUES",
            ClauseKind::Update => "UPDATE",
            ClauseKind::Set => "SET",
            ClauseKind::Delete => "DELETE FROM",
            ClauseKind::Returning => "RETURNING",
            ClauseKind::Ddl => "DDL",
        }
    }
}

/// One recognized clause: the keyword(s) that open it and the text that
/// follows up to the next clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub kind: ClauseKind,
    pub keyword: Span,
    pub body: Span,
}

impl Clause {
    pub fn span(&self) -> Span {
        self.keyword.cover(&self.body)
    }
}

/// Table (or view, or CTE) referenced by the statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl TableRef {
    /// True if `qualifier` (as written before a `.`) refers to this table
    pub fn answers_to(&self, qualifier: &str) -> bool {
        match &self.alias {
            Some(alias) => alias.eq_ignore_ascii_case(qualifier),
            None => self.name.eq_ignore_ascii_case(qualifier),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// Common table expression defined in a WITH clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CteDef {
    pub name: String,
    /// Output column names, explicit or inferred from the CTE body
    pub columns: Vec<String>,
    pub span: Span,
    /// Range of the parenthesized body, when known
    pub body: Option<Span>,
    pub referenced: bool,
}

/// Column reference found in an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
    pub span: Span,
    /// Top-level clause the reference sits in
    pub clause: Option<ClauseKind>,
}

/// Bind parameter placeholder (`$1`, `?`, `:name`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub text: String,
    pub span: Span,
}

/// Normalized representation of one SQL statement.
///
/// Spans are byte offsets into the buffer the statement was taken from.
/// The tree is never mutated after the parser adapter hands it out.
#[derive(Debug, Clone, Serialize)]
pub struct StatementTree {
    pub kind: StatementKind,
    pub clauses: Vec<Clause>,
    pub tables: Vec<TableRef>,
    pub ctes: Vec<CteDef>,
    pub columns: Vec<ColumnRef>,
    pub parameters: Vec<Parameter>,
    /// Output aliases from select lists (visible to ORDER BY)
    pub output_aliases: Vec<String>,
    pub has_where: bool,
    /// False for best-effort trees recovered from a failed parse
    pub complete: bool,
    /// Statement source text
    pub text: String,
    /// Byte offset of `text` within the buffer
    pub offset: usize,
    #[serde(skip)]
    pub(crate) statement: Option<Statement>,
}

impl StatementTree {
    pub fn empty(text: &str) -> Self {
        Self {
            kind: StatementKind::Empty,
            clauses: Vec::new(),
            tables: Vec::new(),
            ctes: Vec::new(),
            columns: Vec::new(),
            parameters: Vec::new(),
            output_aliases: Vec::new(),
            has_where: false,
            complete: true,
            text: text.to_string(),
            offset: 0,
            statement: None,
        }
    }

    /// The parsed sqlparser statement, for well-formed input
    pub fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    /// Byte range of the statement within the buffer
    pub fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.text.len())
    }

    pub fn clause(&self, kind: ClauseKind) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.kind == kind)
    }

    /// Last clause whose keyword ends at or before `offset`
    pub fn clause_before(&self, offset: usize) -> Option<&Clause> {
        self.clauses
            .iter()
            .filter(|c| c.keyword.end <= offset)
            .max_by_key(|c| c.keyword.start)
    }

    pub fn cte(&self, name: &str) -> Option<&CteDef> {
        self.ctes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Tables in scope that answer to `qualifier`
    pub fn table_for_qualifier(&self, qualifier: &str) -> Option<&TableRef> {
        self.tables.iter().find(|t| t.answers_to(qualifier)).or_else(|| {
            // `users.id` is still valid when `users` was aliased
            self.tables
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(qualifier))
        })
    }

    pub fn is_dml_without_where(&self) -> bool {
        self.kind.is_dml_write() && !self.has_where
    }

    /// Move every span by `delta` bytes
    pub(crate) fn rebase(mut self, delta: usize) -> Self {
        if delta == 0 {
            return self;
        }
        self.offset += delta;
        for clause in &mut self.clauses {
            clause.keyword = clause.keyword.shift(delta);
            clause.body = clause.body.shift(delta);
        }
        for table in &mut self.tables {
            table.span = table.span.shift(delta);
        }
        for cte in &mut self.ctes {
            cte.span = cte.span.shift(delta);
            cte.body = cte.body.map(|b| b.shift(delta));
        }
        for column in &mut self.columns {
            column.span = column.span.shift(delta);
        }
        for param in &mut self.parameters {
            param.span = param.span.shift(delta);
        }
        self
    }

    /// Span-free projection used to compare trees built from differently
    /// formatted text
    pub fn shape(&self) -> TreeShape {
        TreeShape {
            kind: self.kind,
            clauses: self.clauses.iter().map(|c| c.kind).collect(),
            tables: self
                .tables
                .iter()
                .map(|t| (t.schema.clone(), t.name.clone(), t.alias.clone()))
                .collect(),
            ctes: self
                .ctes
                .iter()
                .map(|c| (c.name.clone(), c.columns.clone(), c.referenced))
                .collect(),
            columns: self
                .columns
                .iter()
                .map(|c| (c.qualifier.clone(), c.name.clone(), c.clause))
                .collect(),
            parameters: self.parameters.iter().map(|p| p.text.clone()).collect(),
            has_where: self.has_where,
        }
    }
}

/// Structural view of a `StatementTree` with all positions removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShape {
    pub kind: StatementKind,
    pub clauses: Vec<ClauseKind>,
    pub tables: Vec<(Option<String>, String, Option<String>)>,
    pub ctes: Vec<(String, Vec<String>, bool)>,
    pub columns: Vec<(Option<String>, String, Option<ClauseKind>)>,
    pub parameters: Vec<String>,
    pub has_where: bool,
}
