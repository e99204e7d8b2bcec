use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::SqlxSchema;

/// Drops and/or creates the table of `T` together with its indexes.
pub async fn prepare_table<T: SqlxSchema>(pool: &PgPool, drop_tables: bool, create_tables: bool) -> Result<()> {
    if drop_tables {
        if let Err(e) = sqlx::query(&T::drop_table_sql()).execute(pool).await {
            tracing::warn!("[prepare_table] Failed to drop table '{}': {:?}", T::TABLE_NAME, e);
        }
    }

    if create_tables {
        let create_table_sql = T::create_table_sql();
        sqlx::query(&create_table_sql).execute(pool).await
            .with_context(|| format!("Failed to create table '{}'. SQL: {}", T::TABLE_NAME, create_table_sql))?;

        for index_sql in T::INDEXES_SQL {
            sqlx::query(index_sql).execute(pool).await
                .with_context(|| format!("Failed to create index for '{}'. SQL: {}", T::TABLE_NAME, index_sql))?;
        }
        tracing::debug!("[prepare_table] Table '{}' is ready", T::TABLE_NAME);
    }

    Ok(())
}

pub async fn test_connection(pool: &PgPool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("[test_connection] Database is unreachable: {:?}", e);
            false
        }
    }
}

pub async fn list_public_tables(pool: &PgPool) -> Result<Vec<String>> {
    let tables = sqlx::query_scalar::<_, String>(
        "SELECT table_name::TEXT FROM information_schema.tables WHERE table_schema = 'public' ORDER BY table_name"
    )
        .fetch_all(pool)
        .await?;
    Ok(tables)
}

/// Initializes the database connection pool for the application.
///
/// Generates `async fn connect(drop_tables: bool, create_tables: bool) -> anyhow::Result<&'static PgPool>`,
/// which connects once to `DATABASE_URL` and prepares the tables of every listed type.
///
/// # Example
/// ```rust,ignore
/// init_databases!(
///     default: [Paper]
/// );
///
/// let pool = connect(false, true).await?;
/// ```
#[macro_export]
macro_rules! init_databases {
    (
        default: [$($default_type:ty),* $(,)?]
    ) => {
        static POOL: ::tokio::sync::OnceCell<::sqlx::PgPool> = ::tokio::sync::OnceCell::const_new();

        #[allow(dead_code)]
        async fn connect(drop_tables: bool, create_tables: bool) -> ::anyhow::Result<&'static ::sqlx::PgPool> {
            POOL.get_or_try_init(|| async {
                use ::paperhub_common::EnvVars;
                let env = $crate::DatabaseEnv::load()?;
                let pool = ::sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(&env.database_url)
                    .await?;

                $(
                    $crate::prepare_table::<$default_type>(&pool, drop_tables, create_tables).await?;
                )*

                Ok::<_, ::anyhow::Error>(pool)
            }).await
        }
    };
}
