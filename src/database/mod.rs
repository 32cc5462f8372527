pub mod models;
pub mod sqlx;
