use std::str::FromStr;

use anyhow::Result;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub type DB = SqlitePool;

pub async fn open(path: &str) -> Result<DB> {
    let opts = SqliteConnectOptions::from_str(path)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database with the schema applied. Single connection, so every
/// query sees the same database.
pub async fn open_in_memory() -> Result<DB> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

async fn init_schema(pool: &DB) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_summaries (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL,
            plan_title   TEXT NOT NULL,
            status       TEXT NOT NULL,
            payload      TEXT NOT NULL,
            save_state   TEXT NOT NULL DEFAULT 'idle',
            last_error   TEXT,
            finished_at  INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
