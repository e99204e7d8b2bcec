mod env;
mod postgres_connect;
mod sqlx_postgres;

pub use env::DatabaseEnv;
pub use paperhub_db_macros::SqlxObject;
pub use postgres_connect::{list_public_tables, prepare_table, test_connection};
pub use sqlx_postgres::*;
