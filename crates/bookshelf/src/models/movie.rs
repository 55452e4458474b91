use pgmap::Entity;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Entity)]
#[orm(table = "movies")]
pub struct Movie {
    #[orm(id, default)]
    pub id: i32,
    pub title: String,
    pub user_id: i32,
}
