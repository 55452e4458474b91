//! # pgmap
//!
//! A typed data-mapping core for PostgreSQL.
//!
//! ## Features
//!
//! - **Static descriptors**: `#[derive(Entity)]` binds a struct to a table
//!   through a compile-time column table, no runtime reflection
//! - **Query builder**: `filter` / `order_by` / `limit` / `load`, executed
//!   with `all`, `one`, `count`, `exists`, `delete_all` or `update_all`
//! - **Mapper**: insert, update, upsert, delete and reload with inferred or
//!   explicit column selection and store defaults written back
//! - **Eager and lazy relations**: one batched query per loaded relation
//! - **Hooks**: per-mapper before/after callbacks that can mutate or abort
//! - **Context**: cancellation and deadlines on every round trip
//! - **Transaction-friendly**: pass a transaction anywhere a `GenericClient` is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgmap::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[orm(table = "books")]
//! pub struct Book {
//!     #[orm(id, default)]
//!     pub id: i32,
//!     pub title: String,
//!     pub author: String,
//! }
//!
//! let ctx = Context::background();
//! let books = Mapper::<Book>::new();
//!
//! let mut book = Book { title: "Sample Book".into(), author: "John Doe".into(), ..Default::default() };
//! books.insert(&ctx, &client, &mut book, ColumnSelection::Infer).await?;
//!
//! let found = books
//!     .query()
//!     .filter("title LIKE ?", ["%Sample%"])
//!     .order_by("title ASC")
//!     .all(&ctx, &client)
//!     .await?;
//! ```

extern crate self as pgmap;

pub mod client;
pub mod context;
pub mod eager;
pub mod entity;
pub mod error;
pub mod hooks;
pub mod ident;
pub mod mapper;
pub mod monitor;
pub mod prelude;
pub mod qb;
pub mod row;
pub mod schema;
pub mod transaction;
pub mod value;

mod exec;

pub use client::{DynClient, GenericClient};
pub use context::Context;
pub use eager::{HasMany, Relation};
pub use entity::{Column, Entity};
pub use error::{ConstraintKind, OrmError, OrmResult};
pub use hooks::{Hook, HookEvent, Hooks};
pub use mapper::{ColumnSelection, Mapper, UpsertOptions};
pub use monitor::{InstrumentedClient, MonitorConfig, QueryStats};
pub use qb::{ColumnValues, Expr, Query};
pub use row::Row;
pub use schema::{SqlType, TableSchema};
pub use transaction::{IsolationLevel, TransactionOptions, begin};
pub use value::{FromValue, Value};

pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{PoolConfig, create_pool, create_pool_with_config};

#[cfg(feature = "derive")]
pub use pgmap_derive::Entity;

#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
