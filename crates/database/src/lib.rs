mod env;
mod postgres_connect;
pub mod sqlx_postgres;

pub use env::DatabaseEnv;
pub use postgres_connect::PostgresClient;
pub use sqlx_postgres::*;
