//! Base query validation.
//!
//! A base query is wrapped as a derived table, so it may filter, join and
//! group freely but must leave ordering and row limits to the paginator.

use crate::{PgError, PgResult};

/// Clauses a base query may not carry at the top level.
const FORBIDDEN_CLAUSES: [&[u8]; 4] = [b"ORDER BY", b"LIMIT", b"OFFSET", b"FETCH"];

/// Validates a base query and returns it without trailing semicolons or
/// line comments.
///
/// Rejects empty queries and top-level `ORDER BY`, `LIMIT`, `OFFSET` and
/// `FETCH` clauses. Clauses inside parentheses, string literals, quoted
/// identifiers and comments are allowed.
pub fn validate_base_query(query: &str) -> PgResult<&str> {
    let mut trimmed = query.trim();
    loop {
        let stripped = strip_trailing_comment(trimmed)
            .trim_end_matches(';')
            .trim_end();
        if stripped.len() == trimmed.len() {
            break;
        }
        trimmed = stripped;
    }
    if trimmed.is_empty() {
        return Err(PgError::invalid_sql("base query cannot be empty"));
    }

    let forbidden = scan_top_level(trimmed, |bytes, i| {
        FORBIDDEN_CLAUSES
            .iter()
            .find(|keyword| is_keyword_at(bytes, i, keyword))
            .copied()
    });

    if let Some(keyword) = forbidden {
        return Err(PgError::invalid_sql(format!(
            "base query cannot contain a top-level {} clause",
            String::from_utf8_lossy(keyword)
        )));
    }

    Ok(trimmed)
}

/// Removes a line comment that runs to the end of `query`.
fn strip_trailing_comment(query: &str) -> &str {
    let bytes = query.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_quoted(bytes, i, bytes[i]),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = skip_line_comment(bytes, i);
                if end >= bytes.len() {
                    return query[..i].trim_end();
                }
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            _ => {}
        }
        i += 1;
    }
    query
}

/// Returns whether `keyword` starts at `i` as a standalone word.
fn is_keyword_at(bytes: &[u8], i: usize, keyword: &[u8]) -> bool {
    let end = i + keyword.len();
    if end > bytes.len() || &bytes[i..end] != keyword {
        return false;
    }

    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let before_ok = i == 0 || !is_word(bytes[i - 1]);
    let after_ok = end == bytes.len() || !is_word(bytes[end]);
    before_ok && after_ok
}

/// Returns the index of the closing quote, or the last index if unterminated.
fn skip_quoted(bytes: &[u8], i: usize, quote: u8) -> usize {
    let mut j = i + 1;
    while j < bytes.len() {
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return j;
        }
        j += 1;
    }
    bytes.len().saturating_sub(1)
}

fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 2;
    while j < bytes.len() && bytes[j] != b'\n' {
        j += 1;
    }
    j
}

fn skip_block_comment(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 2;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            return j + 1;
        }
        j += 1;
    }
    bytes.len().saturating_sub(1)
}

/// Calls `on_position` at each position outside parentheses, quotes and
/// comments until it returns `Some`.
fn scan_top_level<T>(
    query: &str,
    mut on_position: impl FnMut(&[u8], usize) -> Option<T>,
) -> Option<T> {
    let upper = query.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut depth: usize = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b'\'' | b'"' => i = skip_quoted(bytes, i, bytes[i]),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            _ if depth == 0 => {
                if let Some(found) = on_position(bytes, i) {
                    return Some(found);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_query() {
        let sql = "SELECT id, region FROM orders WHERE status = 'open';";
        assert_eq!(
            validate_base_query(sql).expect("valid"),
            "SELECT id, region FROM orders WHERE status = 'open'"
        );
    }

    #[test]
    fn rejects_top_level_ordering_and_limits() {
        for sql in [
            "SELECT * FROM orders ORDER BY id",
            "SELECT * FROM orders LIMIT 5",
            "SELECT * FROM orders OFFSET 5",
            "SELECT * FROM orders FETCH FIRST 5 ROWS ONLY",
            "SELECT * FROM (SELECT * FROM orders) o order by id",
        ] {
            assert!(validate_base_query(sql).is_err(), "{sql} accepted");
        }
    }

    #[test]
    fn allows_clauses_in_subqueries() {
        let sql = "SELECT * FROM orders WHERE id IN (SELECT id FROM hot ORDER BY score LIMIT 10)";
        assert!(validate_base_query(sql).is_ok());
    }

    #[test]
    fn ignores_keywords_in_literals_and_comments() {
        for sql in [
            "SELECT 'ORDER BY' AS label FROM orders",
            "SELECT 'it''s LIMIT' AS label FROM orders",
            "SELECT \"limit\" FROM orders",
            "SELECT * FROM orders -- ORDER BY id",
            "SELECT * FROM orders /* LIMIT 5 */",
        ] {
            assert!(validate_base_query(sql).is_ok(), "{sql} rejected");
        }
    }

    #[test]
    fn strips_trailing_line_comments() {
        for (sql, expected) in [
            ("SELECT id FROM orders -- open orders only", "SELECT id FROM orders"),
            ("SELECT id FROM orders; -- trailing", "SELECT id FROM orders"),
            ("SELECT id FROM orders -- a\n; -- b\n", "SELECT id FROM orders"),
            ("SELECT '--' AS dash FROM orders", "SELECT '--' AS dash FROM orders"),
            (
                "SELECT id -- key\nFROM orders",
                "SELECT id -- key\nFROM orders",
            ),
        ] {
            assert_eq!(validate_base_query(sql).expect("valid"), expected);
        }
    }

    #[test]
    fn rejects_comment_only_query() {
        assert!(validate_base_query("-- nothing here").is_err());
    }

    #[test]
    fn detects_clause_after_comment() {
        assert!(validate_base_query("SELECT * FROM orders /* x */ LIMIT 5").is_err());
        assert!(validate_base_query("SELECT * FROM orders -- x\nORDER BY id").is_err());
    }

    #[test]
    fn does_not_match_inside_identifiers() {
        assert!(validate_base_query("SELECT order_by_hint, limits FROM orders").is_ok());
    }

    #[test]
    fn rejects_empty_query() {
        assert!(validate_base_query("  ;").is_err());
    }
}
