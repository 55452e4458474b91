//! SQL identifier checks for names that are spliced into statement text.
//!
//! Column and table names come from static descriptors, but builder methods
//! like `eq` and `order_by` also accept caller strings, so those are checked
//! before they reach SQL.

use crate::error::{OrmError, OrmResult};

/// Validate a possibly qualified identifier (`column` or `table.column`).
pub fn validate_ident(s: &str) -> OrmResult<()> {
    if s.is_empty() {
        return Err(OrmError::malformed("identifier cannot be empty"));
    }
    for segment in s.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            Some(c) => {
                return Err(OrmError::malformed(format!(
                    "invalid identifier start character '{c}' in '{s}'"
                )));
            }
            None => {
                return Err(OrmError::malformed(format!(
                    "empty identifier segment in '{s}'"
                )));
            }
        }
        if let Some(c) = chars.find(|c| !(*c == '_' || *c == '$' || c.is_ascii_alphanumeric())) {
            return Err(OrmError::malformed(format!(
                "invalid character '{c}' in identifier '{s}'"
            )));
        }
    }
    Ok(())
}

/// Validate an ORDER BY list such as `title ASC, id DESC NULLS LAST`.
pub fn validate_order_by(expr: &str) -> OrmResult<()> {
    for item in expr.split(',') {
        let mut words = item.split_whitespace();
        let Some(column) = words.next() else {
            return Err(OrmError::malformed(format!(
                "empty ORDER BY item in '{expr}'"
            )));
        };
        validate_ident(column)?;

        let rest: Vec<String> = words.map(|w| w.to_ascii_uppercase()).collect();
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        let ok = matches!(
            rest.as_slice(),
            [] | ["ASC"]
                | ["DESC"]
                | ["NULLS", "FIRST" | "LAST"]
                | ["ASC" | "DESC", "NULLS", "FIRST" | "LAST"]
        );
        if !ok {
            return Err(OrmError::malformed(format!(
                "invalid ORDER BY item '{}'",
                item.trim()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_qualified_names() {
        assert!(validate_ident("title").is_ok());
        assert!(validate_ident("books.published_year").is_ok());
        assert!(validate_ident("_x$1").is_ok());
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(validate_ident("title; DROP TABLE books").is_err());
        assert!(validate_ident("1abc").is_err());
        assert!(validate_ident("a..b").is_err());
        assert!(validate_ident("").is_err());
    }

    #[test]
    fn order_by_lists() {
        assert!(validate_order_by("title ASC").is_ok());
        assert!(validate_order_by("created_at desc, id").is_ok());
        assert!(validate_order_by("id DESC NULLS LAST").is_ok());
        assert!(validate_order_by("title ASC; DELETE FROM books").is_err());
        assert!(validate_order_by("title, ").is_err());
    }
}
