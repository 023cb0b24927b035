//! Function entries

use super::Position::{self, In};
use crate::parser::ClauseKind::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: &'static str,
    pub signature: &'static str,
    pub detail: &'static str,
    pub positions: &'static [Position],
}

const fn func(
    name: &'static str,
    signature: &'static str,
    detail: &'static str,
    positions: &'static [Position],
) -> FunctionEntry {
    FunctionEntry {
        name,
        signature,
        detail,
        positions,
    }
}

const AGGREGATE: &[Position] = &[In(Select), In(Having), In(OrderBy), In(Returning)];
const SCALAR: &[Position] = &[
    In(Select),
    In(Where),
    In(On),
    In(Having),
    In(GroupBy),
    In(OrderBy),
    In(Set),
    In(Values),
    In(Returning),
];
const VALUE: &[Position] = &[
    In(Select),
    In(Where),
    In(OrderBy),
    In(Set),
    In(Values),
    In(Limit),
    In(Returning),
];

pub(super) static COMMON: &[FunctionEntry] = &[
    func("COUNT", "COUNT(expression)", "Aggregate: number of rows/expression values", AGGREGATE),
    func("SUM", "SUM(numeric)", "Aggregate: total of numeric column", AGGREGATE),
    func("AVG", "AVG(numeric)", "Aggregate: average of numeric column", AGGREGATE),
    func("MIN", "MIN(expression)", "Aggregate: smallest value", AGGREGATE),
    func("MAX", "MAX(expression)", "Aggregate: largest value", AGGREGATE),
    func("COALESCE", "COALESCE(value, ...)", "Return first non-null argument", VALUE),
    func("LOWER", "LOWER(text)", "Lowercase text, handy for case-insensitive filters", SCALAR),
    func("UPPER", "UPPER(text)", "Uppercase text", SCALAR),
    func("LENGTH", "LENGTH(text)", "Number of characters", SCALAR),
    func("ROUND", "ROUND(numeric, digits)", "Round to a number of digits", SCALAR),
    func("ABS", "ABS(numeric)", "Absolute value", SCALAR),
];

pub(super) static POSTGRES: &[FunctionEntry] = &[
    func("NOW", "NOW()", "Timestamp for current transaction", VALUE),
    func(
        "DATE_TRUNC",
        "DATE_TRUNC('unit', timestamp)",
        "Bucket timestamps by unit (day/week/month)",
        SCALAR,
    ),
    func("STRING_AGG", "STRING_AGG(text, delimiter)", "Aggregate: join strings", AGGREGATE),
    func("TO_CHAR", "TO_CHAR(value, format)", "Format a value as text", SCALAR),
    func("ARRAY_AGG", "ARRAY_AGG(expression)", "Aggregate: collect into an array", AGGREGATE),
];

pub(super) static MYSQL: &[FunctionEntry] = &[
    func("NOW", "NOW()", "Current date and time", VALUE),
    func("IFNULL", "IFNULL(value, fallback)", "Fallback for NULL", VALUE),
    func("GROUP_CONCAT", "GROUP_CONCAT(expression)", "Aggregate: join strings", AGGREGATE),
    func("DATE_FORMAT", "DATE_FORMAT(date, format)", "Format a date as text", SCALAR),
    func("CONCAT", "CONCAT(text, ...)", "Join strings", SCALAR),
];

pub(super) static SQLITE: &[FunctionEntry] = &[
    func("IFNULL", "IFNULL(value, fallback)", "Fallback for NULL", VALUE),
    func("GROUP_CONCAT", "GROUP_CONCAT(expression, separator)", "Aggregate: join strings", AGGREGATE),
    func("DATETIME", "DATETIME(timestring, modifier, ...)", "Date and time as text", VALUE),
    func("STRFTIME", "STRFTIME(format, timestring)", "Format a date as text", SCALAR),
];
