mod common;

use common::{MockClient, Movie, User, movie_row, user_row};
use pgmap::{Context, Entity, Mapper, OrmError, Row, Value};

const SELECT_MOVIES: &str = "SELECT movies.id, movies.title, movies.user_id FROM movies";

#[test]
fn relation_is_registered_by_name() {
    assert!(User::relation("FavoriteMovies").is_some());
    assert!(User::relation("favorite_movies").is_none());
    assert_eq!(User::FAVORITE_MOVIES.local_key(), "id");
    assert_eq!(User::FAVORITE_MOVIES.foreign_key(), "user_id");
}

#[tokio::test]
async fn eager_load_issues_one_extra_query() {
    let client = MockClient::new();
    client
        .rows(vec![user_row(1, "ann"), user_row(2, "bob"), user_row(3, "cid")])
        .rows(vec![
            movie_row(10, "Alien", 1),
            movie_row(11, "Heat", 3),
            movie_row(12, "Brazil", 1),
        ]);

    let users = Mapper::<User>::new()
        .query()
        .load("FavoriteMovies")
        .all(&Context::background(), &client)
        .await
        .unwrap();

    assert_eq!(client.round_trips(), 2);
    let (sql, params) = client.last();
    assert_eq!(
        sql,
        format!("{SELECT_MOVIES} WHERE user_id IN ($1, $2, $3)")
    );
    assert_eq!(params, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    let titles = |u: &User| -> Vec<String> {
        u.favorite_movies
            .as_ref()
            .unwrap()
            .iter()
            .map(|m| m.title.clone())
            .collect()
    };
    assert_eq!(titles(&users[0]), ["Alien", "Brazil"]);
    assert!(titles(&users[1]).is_empty());
    assert_eq!(titles(&users[2]), ["Heat"]);
}

#[tokio::test]
async fn eager_load_without_children_yields_empty_slots() {
    let client = MockClient::new();
    client
        .rows(vec![user_row(1, "ann"), user_row(2, "bob")])
        .rows(vec![]);

    let users = Mapper::<User>::new()
        .query()
        .load("FavoriteMovies")
        .all(&Context::background(), &client)
        .await
        .unwrap();

    assert_eq!(client.round_trips(), 2);
    assert!(users.iter().all(|u| u.favorite_movies == Some(vec![])));
}

#[tokio::test]
async fn eager_load_without_parents_skips_query() {
    let client = MockClient::new();
    client.rows(vec![]);

    let users = Mapper::<User>::new()
        .query()
        .load("FavoriteMovies")
        .all(&Context::background(), &client)
        .await
        .unwrap();

    assert!(users.is_empty());
    assert_eq!(client.round_trips(), 1);
}

#[tokio::test]
async fn unloaded_slot_stays_none() {
    let client = MockClient::new();
    client.rows(vec![user_row(1, "ann")]);

    let user = Mapper::<User>::new()
        .query()
        .one(&Context::background(), &client)
        .await
        .unwrap();
    assert_eq!(user.favorite_movies, None);
}

#[tokio::test]
async fn lazy_accessor_queries_one_parent() {
    let user = User {
        id: 4,
        name: "dee".into(),
        favorite_movies: Some(vec![Movie::default()]),
    };
    let (sql, params) = user.select_favorite_movies().to_sql().unwrap();
    assert_eq!(sql, format!("{SELECT_MOVIES} WHERE user_id = $1"));
    assert_eq!(params, vec![Value::Int(4)]);

    let client = MockClient::new();
    client.rows(vec![movie_row(1, "Alien", 4), movie_row(2, "Heat", 4)]);
    let movies = user
        .select_favorite_movies()
        .order_by("title")
        .limit(10)
        .all(&Context::background(), &client)
        .await
        .unwrap();
    assert_eq!(movies.len(), 2);
    // The eager slot is untouched by the lazy query.
    assert_eq!(user.favorite_movies.as_ref().map(Vec::len), Some(1));
}

#[tokio::test]
async fn add_inserts_children_and_appends_them() {
    let client = MockClient::new();
    client
        .rows(vec![Row::from_pairs([("id", Value::Int(20))])])
        .rows(vec![Row::from_pairs([("id", Value::Int(21))])]);
    let ctx = Context::background();
    let mut user = User {
        id: 7,
        name: "eve".into(),
        favorite_movies: None,
    };
    let children = vec![
        Movie {
            title: "Alien".into(),
            ..Default::default()
        },
        Movie {
            title: "Heat".into(),
            ..Default::default()
        },
    ];

    User::FAVORITE_MOVIES
        .add(&ctx, &client, &Mapper::new(), &mut user, children, true)
        .await
        .unwrap();

    let (sql, params) = client.last();
    assert_eq!(
        sql,
        "INSERT INTO movies (title, user_id) VALUES ($1, $2) RETURNING id"
    );
    assert_eq!(params, vec![Value::from("Heat"), Value::Int(7)]);
    let movies = user.favorite_movies.unwrap();
    assert_eq!(movies.len(), 2);
    assert_eq!((movies[0].id, movies[0].user_id), (20, 7));
    assert_eq!((movies[1].id, movies[1].user_id), (21, 7));
}

#[tokio::test]
async fn add_keeps_children_persisted_before_a_failure() {
    let client = MockClient::new();
    client
        .rows(vec![Row::from_pairs([("id", Value::Int(20))])])
        .fail(OrmError::Connection("connection reset".into()));
    let ctx = Context::background();
    let mut user = User {
        id: 7,
        ..Default::default()
    };
    let children = vec![
        Movie {
            title: "Alien".into(),
            ..Default::default()
        },
        Movie {
            title: "Heat".into(),
            ..Default::default()
        },
    ];

    let err = User::FAVORITE_MOVIES
        .add(&ctx, &client, &Mapper::new(), &mut user, children, true)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)));
    assert_eq!(client.round_trips(), 2);

    let movies = user.favorite_movies.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].title, "Alien");
    assert_eq!((movies[0].id, movies[0].user_id), (20, 7));
}

#[tokio::test]
async fn add_existing_children_updates_foreign_key() {
    let client = MockClient::new();
    client.affected(1).affected(0);
    let ctx = Context::background();
    let mut user = User {
        id: 7,
        ..Default::default()
    };
    let existing = Movie {
        id: 3,
        title: "Brazil".into(),
        user_id: 1,
    };

    User::FAVORITE_MOVIES
        .add(
            &ctx,
            &client,
            &Mapper::new(),
            &mut user,
            vec![existing.clone()],
            false,
        )
        .await
        .unwrap();
    let (sql, params) = client.last();
    assert_eq!(sql, "UPDATE movies SET user_id = $1 WHERE id = $2");
    assert_eq!(params, vec![Value::Int(7), Value::Int(3)]);
    assert_eq!(user.favorite_movies.as_ref().map(Vec::len), Some(1));

    let err = User::FAVORITE_MOVIES
        .add(
            &ctx,
            &client,
            &Mapper::new(),
            &mut user,
            vec![existing],
            false,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::NotFound(_)));
}
