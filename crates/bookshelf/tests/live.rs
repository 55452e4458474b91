//! Round trips against a real PostgreSQL. Every test runs inside a
//! transaction that is rolled back, so the database is left untouched.
//!
//! Skipped unless DATABASE_URL is set.

use bookshelf::{Book, Movie, User, book_hooks, schema, search_books};
use pgmap::{
    ColumnSelection, ColumnValues, ConstraintKind, Context, Mapper, OrmError, TransactionOptions,
    UpsertOptions, begin,
};
use tokio_postgres::Transaction;

async fn try_connect() -> Option<tokio_postgres::Client> {
    let _ = dotenvy::dotenv();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

/// Create the tables inside `tx` and empty them.
async fn fresh_tables(tx: &Transaction<'_>) {
    tx.batch_execute(schema::CREATE_TABLES).await.unwrap();
    tx.batch_execute("DELETE FROM movies; DELETE FROM users; DELETE FROM books")
        .await
        .unwrap();
}

fn sample_book() -> Book {
    Book {
        title: "Sample Book".into(),
        author: "John Doe".into(),
        published_year: 2024,
        ..Default::default()
    }
}

#[tokio::test]
async fn sample_book_lifecycle() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let ctx = Context::background();
    let tx = begin(&ctx, &mut client, TransactionOptions::new()).await.unwrap();
    fresh_tables(&tx).await;
    let books = Mapper::with_hooks(book_hooks());

    let mut book = sample_book();
    books
        .insert(&ctx, &tx, &mut book, ColumnSelection::Infer)
        .await
        .unwrap();
    assert!(book.id > 0);
    assert_ne!(book.created_at, Default::default());
    assert_eq!(books.query().count(&ctx, &tx).await.unwrap(), 1);

    let search = search_books(&books, "sample");
    let found = search.all(&ctx, &tx).await.unwrap();
    assert_eq!(found, vec![book.clone()]);

    assert_eq!(books.delete(&ctx, &tx, &mut book).await.unwrap(), 1);
    assert!(!books.exists(&ctx, &tx, book.id).await.unwrap());
    assert_eq!(books.query().count(&ctx, &tx).await.unwrap(), 0);

    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn insert_then_reload_matches() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let ctx = Context::background();
    let tx = begin(&ctx, &mut client, TransactionOptions::new()).await.unwrap();
    fresh_tables(&tx).await;
    let books = Mapper::<Book>::new();

    let mut book = sample_book();
    books
        .insert(&ctx, &tx, &mut book, ColumnSelection::Infer)
        .await
        .unwrap();
    let mut stored = Book {
        id: book.id,
        ..Default::default()
    };
    books.reload(&ctx, &tx, &mut stored).await.unwrap();
    assert_eq!(stored, book);

    let mut several = vec![
        sample_book(),
        Book {
            title: "Second".into(),
            ..sample_book()
        },
    ];
    for b in &mut several {
        books
            .insert(&ctx, &tx, b, ColumnSelection::Infer)
            .await
            .unwrap();
    }
    assert_eq!(books.query().count(&ctx, &tx).await.unwrap(), 3);

    let n = books
        .update_all(
            &ctx,
            &tx,
            &several,
            ColumnValues::new().set("published_year", 1999),
        )
        .await
        .unwrap();
    assert_eq!(n, 2);
    books.reload_all(&ctx, &tx, &mut several).await.unwrap();
    assert!(several.iter().all(|b| b.published_year == 1999));

    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn upsert_respects_conflict_policy() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let ctx = Context::background();
    let tx = begin(&ctx, &mut client, TransactionOptions::new()).await.unwrap();
    fresh_tables(&tx).await;
    let books = Mapper::<Book>::new();

    let mut book = sample_book();
    books
        .insert(&ctx, &tx, &mut book, ColumnSelection::Infer)
        .await
        .unwrap();

    let mut ignored = Book {
        title: "Ignored".into(),
        ..book.clone()
    };
    let columns = ["id", "title", "author", "published_year"];
    let insert = ColumnSelection::explicit(columns);
    let options = UpsertOptions::do_nothing().insert(insert);
    let touched = books
        .upsert(&ctx, &tx, &mut ignored, options)
        .await
        .unwrap();
    assert_eq!(touched, 0);
    assert_eq!(
        books.find(&ctx, &tx, book.id).await.unwrap().title,
        "Sample Book"
    );

    let mut renamed = Book {
        title: "Renamed".into(),
        author: "Someone Else".into(),
        ..book.clone()
    };
    let options = UpsertOptions::new()
        .insert(ColumnSelection::explicit(columns))
        .update(ColumnSelection::explicit(["title"]));
    let touched = books
        .upsert(&ctx, &tx, &mut renamed, options)
        .await
        .unwrap();
    assert_eq!(touched, 1);
    let stored = books.find(&ctx, &tx, book.id).await.unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.author, "John Doe");
    assert_eq!(books.query().count(&ctx, &tx).await.unwrap(), 1);

    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn favorite_movies_load_eagerly_and_lazily() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let ctx = Context::background();
    let tx = begin(&ctx, &mut client, TransactionOptions::new()).await.unwrap();
    fresh_tables(&tx).await;
    let users = Mapper::<User>::new();
    let movies = Mapper::<Movie>::new();

    let mut ann = User {
        name: "Ann".into(),
        ..Default::default()
    };
    let mut bob = User {
        name: "Bob".into(),
        ..Default::default()
    };
    users
        .insert(&ctx, &tx, &mut ann, ColumnSelection::Infer)
        .await
        .unwrap();
    users
        .insert(&ctx, &tx, &mut bob, ColumnSelection::Infer)
        .await
        .unwrap();
    User::FAVORITE_MOVIES
        .add(
            &ctx,
            &tx,
            &movies,
            &mut ann,
            vec![
                Movie {
                    title: "Alien".into(),
                    ..Default::default()
                },
                Movie {
                    title: "Brazil".into(),
                    ..Default::default()
                },
            ],
            true,
        )
        .await
        .unwrap();

    let loaded = users
        .query()
        .order_by("id")
        .load("FavoriteMovies")
        .all(&ctx, &tx)
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].favorite_movies.as_ref().map(Vec::len), Some(2));
    assert_eq!(loaded[1].favorite_movies, Some(vec![]));

    let lazy = ann
        .select_favorite_movies()
        .order_by("title")
        .all(&ctx, &tx)
        .await
        .unwrap();
    let titles: Vec<_> = lazy.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, ["Alien", "Brazil"]);

    tx.rollback().await.unwrap();
}

#[tokio::test]
async fn foreign_key_violation_is_classified() {
    let Some(mut client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let ctx = Context::background();
    let tx = begin(&ctx, &mut client, TransactionOptions::new()).await.unwrap();
    fresh_tables(&tx).await;

    let mut orphan = Movie {
        title: "Orphan".into(),
        user_id: -1,
        ..Default::default()
    };
    let err = Mapper::<Movie>::new()
        .insert(&ctx, &tx, &mut orphan, ColumnSelection::Infer)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::ConstraintViolation {
            kind: ConstraintKind::ForeignKey,
            ..
        }
    ));

    tx.rollback().await.unwrap();
}
