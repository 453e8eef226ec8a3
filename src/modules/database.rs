use crate::config::database::PostgresSettings;
use secrecy::ExposeSecret;
use sqlx::{migrate, PgPool};
use tracing::info;

pub async fn get_postgres_pool(config: PostgresSettings) -> PgPool {
    let pool = PgPool::connect(config.database_url.expose_secret())
        .await
        .expect("Cannot establish postgres connection");
    if config.is_migrating {
        info!("Running migrations");
        migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Auto migration failed");
    }
    pool
}
