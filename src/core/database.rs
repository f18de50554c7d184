//! Database - Creazione del pool SQLite e applicazione delle migrations

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, instrument};

/// Migrations embeddate nel binario a compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apre il pool verso `database_url` (creando il file se manca) e applica le migrations
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    info!("Database ready, migrations applied");
    Ok(pool)
}

/// Database in memoria per test e ambienti effimeri
///
/// Ogni connessione sqlite `:memory:` vede un database diverso, quindi il pool
/// tiene una sola connessione che non viene mai chiusa.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
