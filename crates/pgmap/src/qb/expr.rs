//! Predicate expressions for WHERE clauses.
//!
//! `Expr::build()` appends bound values to the parameter list and renders
//! `$n` placeholders numbered from the list's current length, so fragments
//! compose in any order without renumbering.

use crate::error::{OrmError, OrmResult};
use crate::ident::validate_ident;
use crate::value::Value;

/// A single predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `column op $n`
    Compare {
        column: String,
        op: &'static str,
        value: Value,
    },

    /// `column IS [NOT] NULL`
    NullCheck { column: String, is_null: bool },

    /// `column IN ($1, $2, ...)`
    InList { column: String, values: Vec<Value> },

    /// Caller SQL with `?` placeholders, one argument per placeholder.
    Template { sql: String, args: Vec<Value> },

    /// Always false (an empty IN list).
    False,
}

impl Expr {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Compare {
            column: column.into(),
            op: "=",
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    /// `column IN (...)`; an empty list matches nothing.
    pub fn in_list(column: impl Into<String>, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column: column.into(),
            values,
        }
    }

    pub fn template(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Expr::Template {
            sql: sql.into(),
            args,
        }
    }

    /// Render this predicate, appending its values to `params`.
    pub fn build(&self, params: &mut Vec<Value>) -> OrmResult<String> {
        match self {
            Expr::Compare { column, op, value } => {
                validate_ident(column)?;
                params.push(value.clone());
                Ok(format!("{} {} ${}", column, op, params.len()))
            }
            Expr::NullCheck { column, is_null } => {
                validate_ident(column)?;
                Ok(if *is_null {
                    format!("{column} IS NULL")
                } else {
                    format!("{column} IS NOT NULL")
                })
            }
            Expr::InList { column, values } => {
                validate_ident(column)?;
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        format!("${}", params.len())
                    })
                    .collect();
                Ok(format!("{} IN ({})", column, placeholders.join(", ")))
            }
            Expr::Template { sql, args } => build_template(sql, args, params),
            Expr::False => Ok("1=0".to_string()),
        }
    }
}

/// Tracks whether the scan is inside a `'literal'` or a `"quoted identifier"`.
#[derive(Default)]
struct QuoteState {
    open: Option<char>,
}

impl QuoteState {
    /// Feed the next character; true when it is a placeholder.
    fn is_placeholder(&mut self, ch: char) -> bool {
        match (self.open, ch) {
            (None, '\'' | '"') => self.open = Some(ch),
            (Some(open), _) if open == ch => self.open = None,
            (None, '?') => return true,
            _ => {}
        }
        false
    }
}

/// Number of `?` placeholders outside literals and quoted identifiers.
pub fn count_placeholders(sql: &str) -> usize {
    let mut quotes = QuoteState::default();
    sql.chars().filter(|ch| quotes.is_placeholder(*ch)).count()
}

fn build_template(sql: &str, args: &[Value], params: &mut Vec<Value>) -> OrmResult<String> {
    let expected = count_placeholders(sql);
    if expected != args.len() {
        return Err(OrmError::malformed(format!(
            "predicate '{sql}' has {expected} placeholders but {} arguments",
            args.len()
        )));
    }

    let mut result = String::with_capacity(sql.len() + args.len() * 2);
    let mut args = args.iter();
    let mut quotes = QuoteState::default();
    for ch in sql.chars() {
        // Counted above, so an argument is always available here.
        if quotes.is_placeholder(ch)
            && let Some(arg) = args.next()
        {
            params.push(arg.clone());
            result.push('$');
            result.push_str(&params.len().to_string());
            continue;
        }
        result.push(ch);
    }
    Ok(result)
}

/// Predicates combined with AND.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn push(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    /// Render the conjunction; empty groups render as an empty string.
    pub fn build(&self, params: &mut Vec<Value>) -> OrmResult<String> {
        let wrap = self.exprs.len() > 1;
        let parts = self
            .exprs
            .iter()
            .map(|e| {
                let sql = e.build(params)?;
                // Caller predicates may contain OR; keep them grouped.
                Ok(if wrap && matches!(e, Expr::Template { .. }) {
                    format!("({sql})")
                } else {
                    sql
                })
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(parts.join(" AND "))
    }

    /// Render as ` WHERE ...`, or nothing when empty.
    pub fn build_where(&self, params: &mut Vec<Value>) -> OrmResult<String> {
        if self.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(" WHERE {}", self.build(params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_numbers_placeholders_from_current_params() {
        let mut params = vec![Value::Int(1)];
        let args = vec!["%a%".into(), "%b%".into()];
        let sql = Expr::template("title LIKE ? OR author LIKE ?", args)
            .build(&mut params)
            .unwrap();
        assert_eq!(sql, "title LIKE $2 OR author LIKE $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn template_argument_mismatch_is_malformed() {
        let mut params = Vec::new();
        let err = Expr::template("title = ? AND author = ?", vec!["x".into()])
            .build(&mut params)
            .unwrap_err();
        assert!(matches!(err, OrmError::MalformedQuery(_)));

        let err = Expr::template("title = ?", vec!["x".into(), "y".into()])
            .build(&mut params)
            .unwrap_err();
        assert!(matches!(err, OrmError::MalformedQuery(_)));
    }

    #[test]
    fn question_marks_in_literals_are_not_placeholders() {
        assert_eq!(count_placeholders("title = 'why?' AND id = ?"), 1);
        let mut params = Vec::new();
        let sql = Expr::template("title = 'why?' AND id = ?", vec![Value::Int(3)])
            .build(&mut params)
            .unwrap();
        assert_eq!(sql, "title = 'why?' AND id = $1");
    }

    #[test]
    fn question_marks_in_quoted_identifiers_are_not_placeholders() {
        assert_eq!(count_placeholders("\"why?\" = ?"), 1);
        assert_eq!(count_placeholders("title = 'it''s?' AND \"a\"\"?\" = ?"), 1);
        let mut params = Vec::new();
        let sql = Expr::template("\"why?\" = ?", vec![Value::Int(1)])
            .build(&mut params)
            .unwrap();
        assert_eq!(sql, "\"why?\" = $1");
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn group_ands_and_parenthesizes_templates() {
        let mut group = ExprGroup::new();
        let args = vec!["a".into(), "b".into()];
        group.push(Expr::template("title LIKE ? OR author LIKE ?", args));
        group.push(Expr::eq("published_year", 2020_i32));
        let mut params = Vec::new();
        let sql = group.build_where(&mut params).unwrap();
        assert_eq!(
            sql,
            " WHERE (title LIKE $1 OR author LIKE $2) AND published_year = $3"
        );
    }

    #[test]
    fn single_template_is_not_wrapped() {
        let mut group = ExprGroup::new();
        group.push(Expr::template("id = ?", vec![Value::Int(1)]));
        let mut params = Vec::new();
        assert_eq!(group.build(&mut params).unwrap(), "id = $1");
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let mut params = Vec::new();
        let sql = Expr::in_list("user_id", vec![]).build(&mut params).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn invalid_column_is_rejected() {
        let mut params = Vec::new();
        assert!(Expr::eq("id; --", 1_i32).build(&mut params).is_err());
    }
}
