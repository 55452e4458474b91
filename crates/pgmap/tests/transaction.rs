mod common;

use common::{Book, MockClient};
use pgmap::{ColumnSelection, Context, HookEvent, Hooks, Mapper, OrmError, OrmResult, Row, Value};

async fn insert_in_transaction(client: &MockClient, books: &Mapper<Book>) -> OrmResult<i32> {
    let ctx = Context::background();
    pgmap::transaction!(client, tx, {
        let mut book = Book {
            title: "Sample Book".into(),
            author: "John Doe".into(),
            ..Default::default()
        };
        books
            .insert(&ctx, &tx, &mut book, ColumnSelection::Infer)
            .await?;
        Ok(book.id)
    })
}

#[tokio::test]
async fn commits_on_ok() {
    let client = MockClient::new();
    client.rows(vec![Row::from_pairs([("id", Value::Int(1))])]);

    let id = insert_in_transaction(&client, &Mapper::new()).await.unwrap();

    assert_eq!(id, 1);
    let sql = client.sql();
    assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
    assert!(sql[1].starts_with("INSERT INTO books"));
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
}

#[tokio::test]
async fn rolls_back_on_store_error() {
    let client = MockClient::new();
    client.fail(OrmError::Connection("connection reset".into()));

    let err = insert_in_transaction(&client, &Mapper::new())
        .await
        .unwrap_err();

    assert!(matches!(err, OrmError::Connection(_)));
    assert_eq!(client.sql().last().map(String::as_str), Some("ROLLBACK"));
    assert!(!client.sql().iter().any(|s| s == "COMMIT"));
}

#[tokio::test]
async fn rolls_back_on_hook_error() {
    let client = MockClient::new();
    let books = Mapper::with_hooks(Hooks::new().on(
        HookEvent::BeforeInsert,
        |_ctx: &Context, _book: &mut Book| -> OrmResult<()> {
            Err(OrmError::Other("rejected".into()))
        },
    ));

    let err = insert_in_transaction(&client, &books).await.unwrap_err();

    assert!(matches!(err, OrmError::Other(m) if m == "rejected"));
    assert_eq!(client.sql(), ["BEGIN", "ROLLBACK"]);
}

async fn insert_and_count(
    client: &MockClient,
    books: &Mapper<Book>,
    titles: &[&str],
) -> OrmResult<i64> {
    let ctx = Context::background();
    pgmap::transaction!(client, tx, {
        for title in titles {
            let mut book = Book {
                title: title.to_string(),
                ..Default::default()
            };
            books
                .insert(&ctx, &tx, &mut book, ColumnSelection::Infer)
                .await?;
        }
        books.query().count(&ctx, &tx).await
    })
}

#[tokio::test]
async fn count_sees_inserts_within_transaction() {
    let client = MockClient::new();
    client
        .rows(vec![Row::from_pairs([("id", Value::Int(1))])])
        .rows(vec![Row::from_pairs([("id", Value::Int(2))])])
        .rows(vec![Row::from_pairs([("count", Value::BigInt(2))])]);

    let count = insert_and_count(&client, &Mapper::new(), &["One", "Two"])
        .await
        .unwrap();

    assert_eq!(count, 2);
    let sql = client.sql();
    assert_eq!(sql.len(), 5);
    assert_eq!(sql[3], "SELECT COUNT(*) FROM books");
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
}
