//! SQL text for single-entity and slice writes.

use crate::value::Value;

fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `a = $start AND b = $start+1`
fn key_match(pk: &[&str], start: usize) -> String {
    pk.iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c, start + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn returning(sql: &mut String, columns: &[&str]) {
    if !columns.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&columns.join(", "));
    }
}

fn insert_head(table: &str, insert: &[&str]) -> String {
    if insert.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            insert.join(", "),
            placeholders(1, insert.len())
        )
    }
}

pub(crate) fn insert_sql(table: &str, insert: &[&str], returning_cols: &[&str]) -> String {
    let mut sql = insert_head(table, insert);
    returning(&mut sql, returning_cols);
    sql
}

/// `update` of `None` renders `DO NOTHING`.
pub(crate) fn upsert_sql(
    table: &str,
    insert: &[&str],
    conflict: &[&str],
    update: Option<&[&str]>,
    returning_cols: &[&str],
) -> String {
    let mut sql = insert_head(table, insert);
    sql.push_str(&format!(" ON CONFLICT ({})", conflict.join(", ")));
    match update {
        Some(columns) => {
            let set = columns
                .iter()
                .map(|c| format!("{c} = EXCLUDED.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" DO UPDATE SET ");
            sql.push_str(&set);
        }
        None => sql.push_str(" DO NOTHING"),
    }
    returning(&mut sql, returning_cols);
    sql
}

pub(crate) fn update_sql(table: &str, set: &[&str], pk: &[&str]) -> String {
    let assignments = set
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ${}", c, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments,
        key_match(pk, set.len() + 1)
    )
}

pub(crate) fn delete_sql(table: &str, pk: &[&str]) -> String {
    format!("DELETE FROM {} WHERE {}", table, key_match(pk, 1))
}

pub(crate) fn select_by_key_sql(select_list: &str, table: &str, pk: &[&str]) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        select_list,
        table,
        key_match(pk, 1)
    )
}

/// `id IN ($n, ...)` or `(a, b) IN (($n, $n+1), ...)` over `keys`,
/// appending key values to `params`.
pub(crate) fn key_in(pk: &[&str], keys: &[Vec<Value>], params: &mut Vec<Value>) -> String {
    let tuples = keys
        .iter()
        .map(|key| {
            let start = params.len() + 1;
            params.extend(key.iter().cloned());
            if pk.len() == 1 {
                format!("${start}")
            } else {
                format!("({})", placeholders(start, key.len()))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    if pk.len() == 1 {
        format!("{} IN ({})", pk[0], tuples)
    } else {
        format!("({}) IN ({})", pk.join(", "), tuples)
    }
}
