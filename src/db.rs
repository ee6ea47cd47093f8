use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(25)
        .min_connections(2)
        .max_lifetime(Duration::from_secs(5 * 60))
        .connect(database_url)
        .await
}
