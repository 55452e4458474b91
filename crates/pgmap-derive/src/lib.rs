//! Derive macros for pgmap
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;
mod syn_types;

/// Derive `pgmap::Entity` for a struct.
///
/// # Example
///
/// ```ignore
/// use pgmap::Entity;
///
/// #[derive(Debug, Clone, Default, Entity)]
/// #[orm(table = "users")]
/// pub struct User {
///     #[orm(id, default)]
///     pub id: i32,
///     #[orm(sql_type = "varchar")]
///     pub name: String,
///     #[orm(has_many(Movie, foreign_key = "user_id", name = "FavoriteMovies"))]
///     pub favorite_movies: Option<Vec<Movie>>,
/// }
/// ```
///
/// # Generated
///
/// - `impl pgmap::Entity` with a static `TableSchema` and column table
/// - per relation, an associated `HasMany` const (`User::FAVORITE_MOVIES`)
///   and a lazy accessor (`user.select_favorite_movies()`)
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (required)
/// - `#[orm(id)]` - Primary key column (at least one required)
/// - `#[orm(default)]` - Column has a database-side default
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(sql_type = "varchar")]` - Override the inferred column type
/// - `#[orm(skip)]` - Not a column; the field keeps its `Default` value
/// - `#[orm(has_many(Child, foreign_key = "...", name = "...", local_key = "..."))]` -
///   Relation slot on an `Option<Vec<Child>>` field
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
