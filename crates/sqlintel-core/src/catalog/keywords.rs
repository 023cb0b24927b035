//! Keyword entries

use super::Position::{self, In, Start};
use crate::parser::ClauseKind::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub keyword: &'static str,
    pub detail: &'static str,
    pub positions: &'static [Position],
}

const fn kw(
    keyword: &'static str,
    detail: &'static str,
    positions: &'static [Position],
) -> KeywordEntry {
    KeywordEntry {
        keyword,
        detail,
        positions,
    }
}

const PREDICATE: &[Position] = &[In(Where), In(On), In(Having)];
const AFTER_SOURCE: &[Position] = &[In(From), In(Join), In(On), In(Where)];

pub(super) static COMMON: &[KeywordEntry] = &[
    kw("SELECT", "Start a query", &[Start, In(With), In(Insert)]),
    kw("WITH", "Define common table expressions", &[Start]),
    kw("INSERT INTO", "Insert rows", &[Start]),
    kw("UPDATE", "Modify rows", &[Start]),
    kw("DELETE FROM", "Remove rows", &[Start]),
    kw("DISTINCT", "Deduplicate rows", &[In(Select)]),
    kw("FROM", "Choose a table or view", &[In(Select), In(Update)]),
    kw("AS", "Name an expression or table", &[In(Select), In(From), In(Join)]),
    kw("CASE", "Conditional expression", &[In(Select), In(Where), In(OrderBy)]),
    kw(
        "WHERE",
        "Filter rows",
        &[In(From), In(Join), In(On), In(Set), In(Delete)],
    ),
    kw("JOIN", "Combine rows from another table", &[In(From), In(Join), In(On)]),
    kw("LEFT JOIN", "Keep unmatched rows on the left", &[In(From), In(Join), In(On)]),
    kw("INNER JOIN", "Keep matching rows only", &[In(From), In(Join), In(On)]),
    kw("ON", "Join condition", &[In(Join)]),
    kw("AND", "Both conditions hold", PREDICATE),
    kw("OR", "Either condition holds", PREDICATE),
    kw("NOT", "Negate a condition", PREDICATE),
    kw("IN", "Match any value in a list", PREDICATE),
    kw("LIKE", "Pattern match", PREDICATE),
    kw("BETWEEN", "Range check", PREDICATE),
    kw("IS NULL", "Value is missing", PREDICATE),
    kw("IS NOT NULL", "Value is present", PREDICATE),
    kw("EXISTS", "Subquery returns rows", PREDICATE),
    kw("GROUP BY", "Aggregate rows", AFTER_SOURCE),
    kw("HAVING", "Filter aggregates", &[In(GroupBy)]),
    kw(
        "ORDER BY",
        "Sort result set",
        &[In(From), In(Join), In(On), In(Where), In(GroupBy), In(Having)],
    ),
    kw("ASC", "Ascending order", &[In(OrderBy)]),
    kw("DESC", "Descending order", &[In(OrderBy)]),
    kw(
        "LIMIT",
        "Restrict row count",
        &[In(Select), In(From), In(Join), In(On), In(Where), In(OrderBy), In(Having)],
    ),
    kw("OFFSET", "Skip rows", &[In(Limit)]),
    kw("UNION", "Combine result sets", &[In(From), In(Where)]),
    kw("VALUES", "Rows to insert", &[In(Insert)]),
    kw("SET", "Assign columns", &[In(Update)]),
    kw("NULL", "Missing value", &[In(Values), In(Set)]),
    kw("DEFAULT", "Column default", &[In(Values), In(Set)]),
];

pub(super) static POSTGRES: &[KeywordEntry] = &[
    kw("ILIKE", "Case-insensitive pattern match", PREDICATE),
    kw("DISTINCT ON", "One row per distinct key", &[In(Select)]),
    kw("ON CONFLICT", "Handle unique violations", &[In(Values)]),
    kw(
        "RETURNING",
        "Return affected rows",
        &[In(Values), In(Set), In(Where), In(Delete)],
    ),
    kw("FULL JOIN", "Keep unmatched rows on both sides", &[In(From), In(Join), In(On)]),
    kw("LATERAL", "Subquery that sees preceding tables", &[In(From), In(Join)]),
];

pub(super) static MYSQL: &[KeywordEntry] = &[
    kw("REPLACE INTO", "Insert or replace rows", &[Start]),
    kw("ON DUPLICATE KEY UPDATE", "Handle unique violations", &[In(Values)]),
    kw("RIGHT JOIN", "Keep unmatched rows on the right", &[In(From), In(Join), In(On)]),
    kw("REGEXP", "Regular expression match", PREDICATE),
];

pub(super) static SQLITE: &[KeywordEntry] = &[
    kw("INSERT OR REPLACE INTO", "Insert or replace rows", &[Start]),
    kw(
        "RETURNING",
        "Return affected rows",
        &[In(Values), In(Set), In(Where), In(Delete)],
    ),
    kw("GLOB", "Case-sensitive glob match", PREDICATE),
];
