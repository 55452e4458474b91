use chrono::NaiveDateTime;
use pgmap::{Context, Entity, HookEvent, Hooks, Mapper, OrmError, OrmResult, Query};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Entity)]
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

fn normalize(_ctx: &Context, book: &mut Book) -> OrmResult<()> {
    book.title = book.title.trim().to_string();
    book.author = book.author.trim().to_string();
    if book.title.is_empty() {
        return Err(OrmError::Other("book title must not be empty".into()));
    }
    Ok(())
}

/// Trims title and author before every write and rejects untitled books.
pub fn book_hooks() -> Hooks<Book> {
    Hooks::new()
        .on(HookEvent::BeforeInsert, normalize)
        .on(HookEvent::BeforeUpdate, normalize)
        .on(HookEvent::BeforeUpsert, normalize)
}

/// Books whose title or author contains `keyword`, case-insensitively,
/// ordered by title. Selected books pass through `books`' after-select hooks.
pub fn search_books(books: &Mapper<Book>, keyword: &str) -> Query<Book> {
    let pattern = format!("%{}%", keyword.replace('%', "\\%").replace('_', "\\_"));
    let args = [pattern.clone(), pattern];
    books
        .query()
        .filter("title ILIKE ? OR author ILIKE ?", args)
        .order_by("title ASC")
}
