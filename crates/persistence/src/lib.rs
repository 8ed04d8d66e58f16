#![deny(warnings)]

//! Persistence layer: SQLite storage for game saves.
//!
//! Every repository is stored as key-value rows `(game_id, entity_type, id)`
//! with the entity serialized as JSON. Rows keep their insertion sequence so
//! a reopened repository iterates in the same order as the saved one.

use anyhow::Context;
use sim_core::{Entity, MemoryRepository};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

pub use sqlx::sqlite::SqlitePool as Pool;

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/main.db"
}

/// Connect to `url`, creating the database file if needed, and run migrations.
pub async fn init_db(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid sqlite url {url}"))?
        .create_if_missing(true);
    // a single connection keeps `sqlite::memory:` databases shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open {url}"))?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(%url, "database ready");
    Ok(pool)
}

/// Register a save slot, or refresh its note if the name exists. Returns its row id.
pub async fn create_save(pool: &SqlitePool, name: &str, note: Option<&str>) -> anyhow::Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO saves (name, note) VALUES (?, ?) \
         ON CONFLICT(name) DO UPDATE SET note = excluded.note RETURNING id",
    )
    .bind(name)
    .bind(note)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Names of all save slots, oldest first.
pub async fn list_saves(pool: &SqlitePool) -> anyhow::Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM saves ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

/// Replace the stored rows of `E` for `game_id` with the repository's content.
pub async fn save_repository<E: Entity>(
    pool: &SqlitePool,
    game_id: &str,
    repo: &MemoryRepository<E>,
) -> anyhow::Result<usize> {
    let entities = repo.snapshot().await?;
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM entities WHERE game_id = ? AND entity_type = ?")
        .bind(game_id)
        .bind(E::ENTITY_TYPE)
        .execute(&mut *tx)
        .await?;
    for (seq, entity) in entities.iter().enumerate() {
        let body = serde_json::to_string(entity)?;
        sqlx::query(
            "INSERT INTO entities (game_id, entity_type, id, seq, body) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(game_id)
        .bind(E::ENTITY_TYPE)
        .bind(entity.id().as_str())
        .bind(seq as i64)
        .bind(body)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    debug!(game_id, entity_type = E::ENTITY_TYPE, rows = entities.len(), "saved");
    Ok(entities.len())
}

/// Load the stored rows of `E` for `game_id` into `repo`, replacing its content.
pub async fn open_repository<E: Entity>(
    pool: &SqlitePool,
    game_id: &str,
    repo: &MemoryRepository<E>,
) -> anyhow::Result<usize> {
    let rows = sqlx::query(
        "SELECT body FROM entities WHERE game_id = ? AND entity_type = ? ORDER BY seq",
    )
    .bind(game_id)
    .bind(E::ENTITY_TYPE)
    .fetch_all(pool)
    .await?;
    let mut entities = Vec::with_capacity(rows.len());
    for row in rows {
        let body: String = row.try_get("body")?;
        let entity: E = serde_json::from_str(&body)
            .with_context(|| format!("corrupt {} row in save {game_id}", E::ENTITY_TYPE))?;
        entities.push(entity);
    }
    let n = entities.len();
    repo.restore(entities).await?;
    debug!(game_id, entity_type = E::ENTITY_TYPE, rows = n, "opened");
    Ok(n)
}
