//! Scripted in-memory client and test models shared by the integration tests.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use pgmap::{Entity, GenericClient, OrmError, OrmResult, Row, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "books")]
pub struct Book {
    #[orm(id, default)]
    pub id: i32,
    #[orm(sql_type = "varchar")]
    pub title: String,
    #[orm(sql_type = "varchar")]
    pub author: String,
    pub published_year: i32,
    #[orm(default)]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "users")]
pub struct User {
    #[orm(id, default)]
    pub id: i32,
    pub name: String,
    #[orm(has_many(Movie, foreign_key = "user_id", name = "FavoriteMovies"))]
    pub favorite_movies: Option<Vec<Movie>>,
}

#[derive(Debug, Clone, Default, PartialEq, Entity)]
#[orm(table = "movies")]
pub struct Movie {
    #[orm(id, default)]
    pub id: i32,
    pub title: String,
    pub user_id: i32,
}

pub fn timestamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn book_row(id: i32, title: &str, author: &str, year: i32) -> Row {
    Row::from_pairs([
        ("id", Value::Int(id)),
        ("title", Value::from(title)),
        ("author", Value::from(author)),
        ("published_year", Value::Int(year)),
        ("created_at", Value::Timestamp(timestamp("2024-01-01 00:00:00"))),
    ])
}

pub fn movie_row(id: i32, title: &str, user_id: i32) -> Row {
    Row::from_pairs([
        ("id", Value::Int(id)),
        ("title", Value::from(title)),
        ("user_id", Value::Int(user_id)),
    ])
}

pub fn user_row(id: i32, name: &str) -> Row {
    Row::from_pairs([("id", Value::Int(id)), ("name", Value::from(name))])
}

/// What the next statement answers with.
pub enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(OrmError),
}

/// A `GenericClient` that records every statement and answers from a script.
///
/// Statements without a scripted reply get no rows / zero affected rows.
#[derive(Default)]
pub struct MockClient {
    log: Mutex<Vec<(String, Vec<Value>)>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn rows(&self, rows: Vec<Row>) -> &Self {
        self.reply(Reply::Rows(rows))
    }

    pub fn affected(&self, n: u64) -> &Self {
        self.reply(Reply::Affected(n))
    }

    pub fn fail(&self, err: OrmError) -> &Self {
        self.reply(Reply::Fail(err))
    }

    /// Every statement seen so far, in order.
    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn last(&self) -> (String, Vec<Value>) {
        self.statements().pop().expect("no statement was issued")
    }

    pub fn round_trips(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
    }

    fn next(&self, sql: &str, params: &[Value]) -> Option<Reply> {
        self.record(sql, params);
        self.replies.lock().unwrap().pop_front()
    }

    /// Start a recorded transaction, as `tokio_postgres::Client::transaction` would.
    pub async fn transaction(&self) -> OrmResult<MockTransaction<'_>> {
        self.record("BEGIN", &[]);
        Ok(MockTransaction { client: self })
    }
}

impl GenericClient for MockClient {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        match self.next(sql, params) {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
            Some(Reply::Fail(err)) => Err(err),
        }
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        match self.next(sql, params) {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            None => Ok(0),
            Some(Reply::Fail(err)) => Err(err),
        }
    }
}

pub struct MockTransaction<'a> {
    client: &'a MockClient,
}

impl MockTransaction<'_> {
    pub async fn commit(self) -> OrmResult<()> {
        self.client.record("COMMIT", &[]);
        Ok(())
    }

    pub async fn rollback(self) -> OrmResult<()> {
        self.client.record("ROLLBACK", &[]);
        Ok(())
    }
}

impl GenericClient for MockTransaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        self.client.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.client.execute(sql, params).await
    }
}
