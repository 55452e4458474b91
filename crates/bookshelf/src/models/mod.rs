mod book;
mod movie;
mod user;

pub use book::{Book, book_hooks, search_books};
pub use movie::Movie;
pub use user::User;
