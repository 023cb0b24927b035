//! Statement boundaries within a multi-statement buffer

use crate::error::Span;

/// Split SQL text into statement ranges by semicolons, respecting string
/// literals, quoted identifiers, dollar-quoted strings and comments.
///
/// Every `;` ends a range, so blank statements between separators are
/// kept; each range excludes its terminating semicolon.
pub fn statement_ranges(sql: &str) -> Vec<Span> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < len {
                    if bytes[i] == quote {
                        i += 1;
                        if i < len && bytes[i] == quote {
                            i += 1; // doubled quote
                        } else {
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
            b'$' => {
                if let Some(tag_end) = find_dollar_tag_end(sql, i) {
                    let tag = &sql[i..=tag_end];
                    i = tag_end + 1;
                    match sql[i..].find(tag) {
                        Some(close) => i += close + tag.len(),
                        None => i = len,
                    }
                } else {
                    i += 1;
                }
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i < len {
                    if i + 1 < len && bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b';' => {
                ranges.push(Span::new(start, i));
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }

    ranges.push(Span::new(start, len));
    ranges
}

/// Range of the statement containing `cursor`. A cursor sitting right
/// after a statement's last character (before its `;`) belongs to it.
pub fn statement_range_at(sql: &str, cursor: usize) -> Span {
    let cursor = cursor.min(sql.len());
    let ranges = statement_ranges(sql);
    ranges
        .iter()
        .copied()
        .find(|r| r.touches(cursor))
        .or_else(|| ranges.last().copied())
        .unwrap_or_default()
}

/// Index of the closing `$` of a dollar-quote tag opening at `start`
fn find_dollar_tag_end(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;
    if i < len && bytes[i] == b'$' {
        return Some(i);
    }
    // a tag cannot start with a digit, or `$1` would open one
    if i < len && bytes[i].is_ascii_digit() {
        return None;
    }
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < len && bytes[i] == b'$' {
        Some(i)
    } else {
        None
    }
}
