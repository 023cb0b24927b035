//! Token-level statement scan.
//!
//! The scan works on the raw token stream, so it keeps working on text the
//! parser rejects. It supplies clause boundaries for every tree, and the
//! whole best-effort structure for trees recovered from a failed parse.

use std::collections::HashSet;

use sqlparser::dialect::Dialect;
use sqlparser::keywords::{Keyword, ALL_KEYWORDS, ALL_KEYWORDS_INDEX};
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer};

use super::location::LineIndex;
use super::tree::{Clause, ClauseKind, ColumnRef, CteDef, Parameter, StatementKind, TableRef};
use crate::error::Span;

/// Non-whitespace token with its byte range
#[derive(Debug, Clone)]
pub(crate) struct Tok {
    pub(crate) token: Token,
    pub(crate) span: Span,
}

/// Tokenizer failure: the offset it stopped at and its message
#[derive(Debug, Clone)]
pub(crate) struct LexError {
    pub(crate) offset: usize,
    pub(crate) message: String,
}

pub(crate) struct Lexed {
    pub(crate) tokens: Vec<Tok>,
    pub(crate) error: Option<LexError>,
}

/// Tokenize `text`. On a tokenizer error the text before the error point is
/// tokenized instead, so callers always get the usable prefix.
pub(crate) fn lex(dialect: &dyn Dialect, text: &str) -> Lexed {
    let index = LineIndex::new(text);
    match Tokenizer::new(dialect, text).tokenize_with_location() {
        Ok(tokens) => Lexed {
            tokens: significant(tokens, &index),
            error: None,
        },
        Err(err) => {
            let cut = index.offset(err.location).unwrap_or(text.len());
            // the reported point may be the end of the text; fall back to the
            // last opening delimiter before it
            let mut cuts = vec![cut];
            cuts.extend(text[..cut].rfind(|c: char| matches!(c, '\'' | '"' | '`' | '$')));
            cuts.extend(text[..cut].rfind("/*"));
            for cut in cuts {
                if let Ok(tokens) = Tokenizer::new(dialect, &text[..cut]).tokenize_with_location() {
                    return Lexed {
                        tokens: significant(tokens, &index),
                        error: Some(LexError {
                            offset: cut,
                            message: err.message,
                        }),
                    };
                }
            }
            Lexed {
                tokens: Vec::new(),
                error: Some(LexError {
                    offset: 0,
                    message: err.message,
                }),
            }
        }
    }
}

fn significant(tokens: Vec<TokenWithSpan>, index: &LineIndex<'_>) -> Vec<Tok> {
    tokens
        .into_iter()
        .filter(|t| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
        .filter_map(|t| {
            let span = index.span(&t.span)?;
            Some(Tok {
                token: t.token,
                span,
            })
        })
        .collect()
}

/// Keywords that never stand for an identifier in the positions the scan
/// cares about
const RESERVED: &[Keyword] = &[
    Keyword::ALL,
    Keyword::AND,
    Keyword::AS,
    Keyword::ASC,
    Keyword::BETWEEN,
    Keyword::BY,
    Keyword::CASE,
    Keyword::CAST,
    Keyword::CROSS,
    Keyword::DEFAULT,
    Keyword::DELETE,
    Keyword::DESC,
    Keyword::DISTINCT,
    Keyword::DO,
    Keyword::ELSE,
    Keyword::END,
    Keyword::EXCEPT,
    Keyword::EXISTS,
    Keyword::FALSE,
    Keyword::FETCH,
    Keyword::FOR,
    Keyword::FROM,
    Keyword::FULL,
    Keyword::GROUP,
    Keyword::HAVING,
    Keyword::ILIKE,
    Keyword::IN,
    Keyword::INNER,
    Keyword::INSERT,
    Keyword::INTERSECT,
    Keyword::INTERVAL,
    Keyword::INTO,
    Keyword::IS,
    Keyword::JOIN,
    Keyword::LATERAL,
    Keyword::LEFT,
    Keyword::LIKE,
    Keyword::LIMIT,
    Keyword::NATURAL,
    Keyword::NOT,
    Keyword::NULL,
    Keyword::OFFSET,
    Keyword::ON,
    Keyword::OR,
    Keyword::ORDER,
    Keyword::OUTER,
    Keyword::RETURNING,
    Keyword::RIGHT,
    Keyword::SELECT,
    Keyword::SET,
    Keyword::THEN,
    Keyword::TRUE,
    Keyword::UNION,
    Keyword::UPDATE,
    Keyword::USING,
    Keyword::VALUES,
    Keyword::WHEN,
    Keyword::WHERE,
    Keyword::WINDOW,
    Keyword::WITH,
];

/// True if `word` would be read as a reserved keyword rather than a name
pub(crate) fn is_reserved_word(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    ALL_KEYWORDS
        .binary_search(&upper.as_str())
        .map(|i| RESERVED.contains(&ALL_KEYWORDS_INDEX[i]))
        .unwrap_or(false)
}

fn keyword(tok: Option<&Tok>) -> Option<Keyword> {
    match tok.map(|t| &t.token) {
        Some(Token::Word(w)) if w.quote_style.is_none() => Some(w.keyword),
        _ => None,
    }
}

fn is_keyword(tok: Option<&Tok>, kw: Keyword) -> bool {
    keyword(tok) == Some(kw)
}

/// Identifier text if the token can name a table, column or alias
fn ident(tok: Option<&Tok>) -> Option<&str> {
    match tok.map(|t| &t.token) {
        Some(Token::Word(w)) if w.quote_style.is_some() || !RESERVED.contains(&w.keyword) => {
            Some(w.value.as_str())
        }
        _ => None,
    }
}

fn is_token(tok: Option<&Tok>, expected: &Token) -> bool {
    tok.map(|t| &t.token == expected).unwrap_or(false)
}

/// Everything the scan recovers from a token stream
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub(crate) kind: Option<StatementKind>,
    pub(crate) clauses: Vec<Clause>,
    pub(crate) tables: Vec<TableRef>,
    pub(crate) ctes: Vec<CteDef>,
    pub(crate) columns: Vec<ColumnRef>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) output_aliases: Vec<String>,
}

impl Scan {
    pub(crate) fn has_where(&self) -> bool {
        self.clauses.iter().any(|c| c.kind == ClauseKind::Where)
    }
}

pub(crate) fn scan(tokens: &[Tok], text_len: usize) -> Scan {
    let clauses = scan_clauses(tokens, text_len);
    let kind = statement_kind(tokens, &clauses);
    let mut consumed = HashSet::new();
    let tables = scan_tables(tokens, &mut consumed);
    let ctes = scan_ctes(tokens, &clauses, text_len, &mut consumed);
    let (columns, output_aliases) = if kind == StatementKind::Create {
        (Vec::new(), Vec::new())
    } else {
        scan_columns(tokens, &clauses, &consumed)
    };
    let parameters = tokens
        .iter()
        .filter_map(|t| match &t.token {
            Token::Placeholder(text) => Some(Parameter {
                text: text.clone(),
                span: t.span,
            }),
            _ => None,
        })
        .collect();

    Scan {
        kind: Some(kind),
        clauses,
        tables,
        ctes,
        columns,
        parameters,
        output_aliases,
    }
}

fn scan_clauses(tokens: &[Tok], text_len: usize) -> Vec<Clause> {
    let mut openers: Vec<(ClauseKind, Span)> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Word(w) if depth == 0 && w.quote_style.is_none() => {
                let current = openers.last().map(|(kind, _)| *kind);
                if let Some((kind, last)) = clause_opener(tokens, i, current) {
                    openers.push((kind, tokens[i].span.cover(&tokens[last].span)));
                    i = last + 1;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    let mut clauses = Vec::with_capacity(openers.len());
    for (idx, (kind, keyword)) in openers.iter().enumerate() {
        let body_end = openers
            .get(idx + 1)
            .map(|(_, next)| next.start)
            .unwrap_or(text_len);
        clauses.push(Clause {
            kind: *kind,
            keyword: *keyword,
            body: Span::new(keyword.end, body_end),
        });
    }
    clauses
}

/// Decide whether the word at `i` opens a clause; returns the clause kind
/// and the index of the last token of its keyword run
fn clause_opener(
    tokens: &[Tok],
    i: usize,
    current: Option<ClauseKind>,
) -> Option<(ClauseKind, usize)> {
    let kw = keyword(tokens.get(i))?;
    let prev = i.checked_sub(1).and_then(|p| keyword(tokens.get(p)));
    let next = keyword(tokens.get(i + 1));

    let single = |kind| Some((kind, i));
    match kw {
        Keyword::WITH if current.is_none() => single(ClauseKind::With),
        Keyword::SELECT => single(ClauseKind::Select),
        Keyword::FROM if prev != Some(Keyword::DISTINCT) => single(ClauseKind::From),
        Keyword::JOIN => single(ClauseKind::Join),
        Keyword::ON if current == Some(ClauseKind::Join) => single(ClauseKind::On),
        Keyword::WHERE => single(ClauseKind::Where),
        Keyword::GROUP if next == Some(Keyword::BY) => Some((ClauseKind::GroupBy, i + 1)),
        Keyword::ORDER if next == Some(Keyword::BY) => Some((ClauseKind::OrderBy, i + 1)),
        Keyword::HAVING => single(ClauseKind::Having),
        Keyword::LIMIT => single(ClauseKind::Limit),
        Keyword::OFFSET => single(ClauseKind::Offset),
        Keyword::RETURNING => single(ClauseKind::Returning),
        Keyword::VALUES => single(ClauseKind::Values),
        Keyword::INSERT | Keyword::REPLACE if current.is_none() || current == Some(ClauseKind::With) => {
            let mut last = i;
            while matches!(
                keyword(tokens.get(last + 1)),
                Some(Keyword::INTO | Keyword::OR | Keyword::REPLACE | Keyword::IGNORE)
            ) {
                last += 1;
            }
            Some((ClauseKind::Insert, last))
        }
        Keyword::UPDATE if !matches!(prev, Some(Keyword::DO | Keyword::FOR | Keyword::KEY)) => {
            single(ClauseKind::Update)
        }
        Keyword::SET if current == Some(ClauseKind::Update) => single(ClauseKind::Set),
        Keyword::DELETE if prev != Some(Keyword::ON) => {
            if next == Some(Keyword::FROM) {
                Some((ClauseKind::Delete, i + 1))
            } else {
                single(ClauseKind::Delete)
            }
        }
        Keyword::CREATE | Keyword::ALTER | Keyword::DROP | Keyword::TRUNCATE if i == 0 => {
            single(ClauseKind::Ddl)
        }
        _ => None,
    }
}

fn statement_kind(tokens: &[Tok], clauses: &[Clause]) -> StatementKind {
    if tokens.is_empty() {
        return StatementKind::Empty;
    }
    match keyword(tokens.first()) {
        Some(Keyword::CREATE) => return StatementKind::Create,
        Some(Keyword::ALTER) => return StatementKind::Alter,
        Some(Keyword::DROP) => return StatementKind::Drop,
        Some(Keyword::TRUNCATE) => return StatementKind::Truncate,
        _ => {}
    }
    let main = clauses.iter().map(|c| c.kind).find(|kind| {
        matches!(
            kind,
            ClauseKind::Select | ClauseKind::Insert | ClauseKind::Update | ClauseKind::Delete
        )
    });
    match main {
        Some(ClauseKind::Select) => StatementKind::Select,
        Some(ClauseKind::Insert) => StatementKind::Insert,
        Some(ClauseKind::Update) => StatementKind::Update,
        Some(ClauseKind::Delete) => StatementKind::Delete,
        _ if clauses.first().map(|c| c.kind) == Some(ClauseKind::With) => StatementKind::Select,
        _ => StatementKind::Other,
    }
}

/// Read `name[.name...] [[AS] alias]` starting at `start`
fn read_table(tokens: &[Tok], start: usize) -> Option<(TableRef, usize)> {
    let mut parts = vec![ident(tokens.get(start))?.to_string()];
    let mut span = tokens[start].span;
    let mut i = start + 1;
    while is_token(tokens.get(i), &Token::Period) {
        match ident(tokens.get(i + 1)) {
            Some(part) => {
                parts.push(part.to_string());
                span = span.cover(&tokens[i + 1].span);
                i += 2;
            }
            None => break,
        }
    }

    let mut alias = None;
    if is_keyword(tokens.get(i), Keyword::AS) {
        if let Some(name) = ident(tokens.get(i + 1)) {
            alias = Some(name.to_string());
            i += 2;
        }
    } else if let Some(name) = ident(tokens.get(i)) {
        if !is_token(tokens.get(i + 1), &Token::Period) {
            alias = Some(name.to_string());
            i += 1;
        }
    }

    let name = parts.pop()?;
    let schema = parts.pop();
    Some((
        TableRef {
            schema,
            name,
            alias,
            span,
        },
        i,
    ))
}

fn scan_tables(tokens: &[Tok], consumed: &mut HashSet<usize>) -> Vec<TableRef> {
    let mut tables = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let kw = keyword(tokens.get(i));
        let prev = i.checked_sub(1).and_then(|p| keyword(tokens.get(p)));
        let introduces = match kw {
            Some(Keyword::FROM) => prev != Some(Keyword::DISTINCT),
            Some(Keyword::JOIN | Keyword::USING) => !is_token(tokens.get(i + 1), &Token::LParen),
            Some(Keyword::INTO) => true,
            Some(Keyword::UPDATE) => {
                !matches!(prev, Some(Keyword::DO | Keyword::FOR | Keyword::KEY))
            }
            Some(Keyword::TABLE) => matches!(
                prev,
                Some(Keyword::CREATE | Keyword::ALTER | Keyword::DROP | Keyword::TRUNCATE)
            ),
            Some(Keyword::TRUNCATE) => !is_keyword(tokens.get(i + 1), Keyword::TABLE),
            _ => false,
        };
        if !introduces {
            i += 1;
            continue;
        }

        let list = matches!(kw, Some(Keyword::FROM | Keyword::USING));
        let mut j = i + 1;
        // IF [NOT] EXISTS / ONLY
        while matches!(
            keyword(tokens.get(j)),
            Some(Keyword::IF | Keyword::NOT | Keyword::EXISTS | Keyword::ONLY)
        ) {
            j += 1;
        }
        loop {
            let Some((table, next)) = read_table(tokens, j) else {
                break;
            };
            consumed.extend(j..next);
            tables.push(table);
            j = next;
            if list && is_token(tokens.get(j), &Token::Comma) {
                j += 1;
            } else {
                break;
            }
        }
        i = j.max(i + 1);
    }
    tables
}

fn scan_ctes(
    tokens: &[Tok],
    clauses: &[Clause],
    text_len: usize,
    consumed: &mut HashSet<usize>,
) -> Vec<CteDef> {
    let Some(with) = clauses.iter().find(|c| c.kind == ClauseKind::With) else {
        return Vec::new();
    };
    let region = with.span();
    let mut ctes = Vec::new();
    let mut i = tokens
        .iter()
        .position(|t| t.span.start >= with.keyword.end)
        .unwrap_or(tokens.len());
    if is_keyword(tokens.get(i), Keyword::RECURSIVE) {
        i += 1;
    }

    while i < tokens.len() && tokens[i].span.start < region.end {
        let Some(name) = ident(tokens.get(i)) else {
            i += 1;
            continue;
        };
        let name_idx = i;
        let mut j = i + 1;
        let mut columns = Vec::new();
        if is_token(tokens.get(j), &Token::LParen) {
            j += 1;
            while let Some(col) = ident(tokens.get(j)) {
                columns.push(col.to_string());
                j += 1;
                if is_token(tokens.get(j), &Token::Comma) {
                    j += 1;
                }
            }
            if !is_token(tokens.get(j), &Token::RParen) {
                i = j.max(i + 1);
                continue;
            }
            j += 1;
        }
        if !is_keyword(tokens.get(j), Keyword::AS) {
            i = j.max(i + 1);
            continue;
        }
        j += 1;
        while matches!(
            keyword(tokens.get(j)),
            Some(Keyword::NOT | Keyword::MATERIALIZED)
        ) {
            j += 1;
        }
        if !is_token(tokens.get(j), &Token::LParen) {
            i = j;
            continue;
        }

        let open = j;
        let mut depth = 0usize;
        let mut close = None;
        for (k, tok) in tokens.iter().enumerate().skip(open) {
            match tok.token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(k);
                        break;
                    }
                }
                _ => {}
            }
        }
        let body_end = close.map(|k| tokens[k].span.end).unwrap_or(text_len);
        consumed.insert(name_idx);
        ctes.push(CteDef {
            name: name.to_string(),
            columns,
            span: tokens[name_idx].span,
            body: Some(Span::new(tokens[open].span.start, body_end)),
            referenced: false,
        });
        match close {
            Some(k) => {
                i = k + 1;
                if is_token(tokens.get(i), &Token::Comma) {
                    i += 1;
                }
            }
            None => break,
        }
    }
    ctes
}

fn ends_expression(tok: Option<&Tok>) -> bool {
    match tok.map(|t| &t.token) {
        Some(Token::RParen | Token::Number(_, _) | Token::SingleQuotedString(_)) => true,
        Some(Token::Word(_)) => {
            ident(tok).is_some()
                || matches!(
                    keyword(tok),
                    Some(Keyword::END | Keyword::NULL | Keyword::TRUE | Keyword::FALSE)
                )
        }
        _ => false,
    }
}

fn scan_columns(
    tokens: &[Tok],
    clauses: &[Clause],
    consumed: &HashSet<usize>,
) -> (Vec<ColumnRef>, Vec<String>) {
    let clause_of = |offset: usize| {
        clauses
            .iter()
            .filter(|c| c.keyword.start <= offset)
            .max_by_key(|c| c.keyword.start)
            .map(|c| c.kind)
    };

    let mut columns = Vec::new();
    let mut aliases = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let Some(name) = ident(tokens.get(i)) else {
            i += 1;
            continue;
        };
        let clause = clause_of(tokens[i].span.start);
        let in_expression = clause.map(|c| c.expects_expression()).unwrap_or(false);
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        if consumed.contains(&i)
            || !in_expression
            || is_token(tokens.get(i + 1), &Token::LParen)
            || is_token(prev, &Token::DoubleColon)
            || is_token(prev, &Token::Period)
        {
            i += 1;
            continue;
        }

        let projection = matches!(clause, Some(ClauseKind::Select | ClauseKind::Returning));
        if is_keyword(prev, Keyword::AS) || (projection && ends_expression(prev)) {
            aliases.push(name.to_string());
            i += 1;
            continue;
        }

        if is_token(tokens.get(i + 1), &Token::Period) {
            // qualified reference: keep the last two parts
            let mut parts = vec![(name.to_string(), tokens[i].span)];
            let mut j = i + 1;
            while is_token(tokens.get(j), &Token::Period) {
                match ident(tokens.get(j + 1)) {
                    Some(part) => {
                        parts.push((part.to_string(), tokens[j + 1].span));
                        j += 2;
                    }
                    None => break,
                }
            }
            if parts.len() >= 2 && !is_token(tokens.get(j), &Token::Period) {
                let span = parts[0].1.cover(&parts[parts.len() - 1].1);
                let (col, _) = parts.pop().unwrap_or_default();
                let (qualifier, _) = parts.pop().unwrap_or_default();
                if !is_token(tokens.get(j), &Token::LParen) {
                    columns.push(ColumnRef {
                        qualifier: Some(qualifier),
                        name: col,
                        span,
                        clause,
                    });
                }
            }
            i = j.max(i + 1);
            continue;
        }

        columns.push(ColumnRef {
            qualifier: None,
            name: name.to_string(),
            span: tokens[i].span,
            clause,
        });
        i += 1;
    }
    (columns, aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::PostgreSqlDialect;

    fn scan_text(sql: &str) -> Scan {
        let lexed = lex(&PostgreSqlDialect {}, sql);
        scan(&lexed.tokens, sql.len())
    }

    fn kinds(scan: &Scan) -> Vec<ClauseKind> {
        scan.clauses.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_select_clauses() {
        let scan = scan_text("SELECT a FROM t WHERE a > 1 GROUP BY a ORDER BY a LIMIT 5");
        assert_eq!(
            kinds(&scan),
            vec![
                ClauseKind::Select,
                ClauseKind::From,
                ClauseKind::Where,
                ClauseKind::GroupBy,
                ClauseKind::OrderBy,
                ClauseKind::Limit
            ]
        );
        assert_eq!(scan.kind, Some(StatementKind::Select));
    }

    #[test]
    fn test_nested_select_is_not_a_clause() {
        let scan = scan_text("SELECT a FROM t WHERE a IN (SELECT b FROM u)");
        assert_eq!(
            kinds(&scan),
            vec![ClauseKind::Select, ClauseKind::From, ClauseKind::Where]
        );
        // tables inside the subquery are still collected
        let names: Vec<_> = scan.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["t", "u"]);
    }

    #[test]
    fn test_delete_from_is_one_clause() {
        let scan = scan_text("DELETE FROM accounts WHERE id = 1");
        assert_eq!(kinds(&scan), vec![ClauseKind::Delete, ClauseKind::Where]);
        assert_eq!(scan.clauses[0].keyword, Span::new(0, 11));
        assert_eq!(scan.tables[0].name, "accounts");
    }

    #[test]
    fn test_table_aliases() {
        let scan = scan_text("SELECT * FROM public.users u JOIN orders AS o ON o.user_id = u.id");
        assert_eq!(scan.tables[0].schema.as_deref(), Some("public"));
        assert_eq!(scan.tables[0].alias.as_deref(), Some("u"));
        assert_eq!(scan.tables[1].alias.as_deref(), Some("o"));
        assert_eq!(scan.columns.len(), 2);
        assert_eq!(scan.columns[0].qualifier.as_deref(), Some("o"));
        assert_eq!(scan.columns[0].clause, Some(ClauseKind::On));
    }

    #[test]
    fn test_functions_and_aliases_are_not_columns() {
        let scan = scan_text("SELECT count(id) total, name AS n FROM t");
        let names: Vec<_> = scan.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(scan.output_aliases, vec!["total", "n"]);
    }

    #[test]
    fn test_cte_bodies() {
        let scan = scan_text("WITH recent (id) AS (SELECT id FROM orders) SELECT id FROM recent");
        assert_eq!(scan.ctes.len(), 1);
        assert_eq!(scan.ctes[0].name, "recent");
        assert_eq!(scan.ctes[0].columns, vec!["id"]);
        assert!(scan.ctes[0].body.is_some());
        assert_eq!(scan.kind, Some(StatementKind::Select));
    }

    #[test]
    fn test_placeholders() {
        let scan = scan_text("UPDATE t SET a = $1 WHERE id = $2");
        let params: Vec<_> = scan.parameters.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(params, vec!["$1", "$2"]);
        assert_eq!(
            kinds(&scan),
            vec![ClauseKind::Update, ClauseKind::Set, ClauseKind::Where]
        );
    }

    #[test]
    fn test_on_conflict_update_is_not_a_clause() {
        let scan = scan_text(
            "INSERT INTO t (id) VALUES (1) ON CONFLICT (id) DO UPDATE SET id = excluded.id",
        );
        assert_eq!(kinds(&scan), vec![ClauseKind::Insert, ClauseKind::Values]);
        assert_eq!(scan.kind, Some(StatementKind::Insert));
    }

    #[test]
    fn test_unterminated_string_keeps_prefix() {
        let sql = "SELECT * FROM t WHERE name = 'abc";
        let lexed = lex(&PostgreSqlDialect {}, sql);
        let err = lexed.error.expect("tokenizer error");
        assert_eq!(err.offset, sql.find('\'').unwrap());
        let scan = scan(&lexed.tokens, sql.len());
        assert_eq!(
            kinds(&scan),
            vec![ClauseKind::Select, ClauseKind::From, ClauseKind::Where]
        );
    }
}
