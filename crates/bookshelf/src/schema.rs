//! DDL for the bookshelf tables.

use pgmap::{Context, OrmResult};
use tokio_postgres::Client;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id SERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    author VARCHAR(255) NOT NULL,
    published_year INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS movies (
    id SERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS movies_user_id_idx ON movies (user_id);
"#;

pub const DROP_TABLES: &str = "DROP TABLE IF EXISTS movies, users, books";

/// Create the tables when they do not exist yet.
pub async fn create_tables(ctx: &Context, client: &Client) -> OrmResult<()> {
    ctx.check()?;
    tracing::debug!("creating bookshelf tables");
    client.batch_execute(CREATE_TABLES).await?;
    Ok(())
}

pub async fn drop_tables(ctx: &Context, client: &Client) -> OrmResult<()> {
    ctx.check()?;
    client.batch_execute(DROP_TABLES).await?;
    Ok(())
}
