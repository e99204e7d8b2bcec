use paperhub_catalog::Paper;
use paperhub_common::define_module_client;
use paperhub_database::init_databases;
use sqlx::PgPool;

init_databases!(
    default: [
        Paper
    ]
);

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: &'static PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        connect(false, true).await
    }
}
