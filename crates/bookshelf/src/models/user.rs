use super::Movie;
use pgmap::Entity;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Entity)]
#[orm(table = "users")]
pub struct User {
    #[orm(id, default)]
    pub id: i32,
    pub name: String,
    /// `None` until loaded with `Query::load("FavoriteMovies")` or `add`.
    #[orm(has_many(Movie, foreign_key = "user_id", name = "FavoriteMovies"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_movies: Option<Vec<Movie>>,
}
