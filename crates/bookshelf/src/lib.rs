//! Models for the bookshelf schema (`books`, `users`, `movies`) and the
//! helpers the demo binary builds on.

pub mod models;
pub mod schema;

pub use models::{Book, Movie, User, book_hooks, search_books};
