//! Schema bootstrap for the harvester's SQLite database.

use geoharvest_core::AppError;
use sqlx::SqlitePool;

/// Idempotent schema statements, applied in order on startup.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS raw_records (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        source      TEXT NOT NULL,
        uuid        TEXT NOT NULL,
        title_en    TEXT,
        title_fr    TEXT,
        state       TEXT NOT NULL,
        payload_en  TEXT,
        payload_fr  TEXT,
        created     TEXT,
        updated     TEXT,
        edited      TEXT,
        scanned_at  TEXT NOT NULL,
        UNIQUE (source, uuid)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS package_updates (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid     TEXT NOT NULL,
        source   TEXT NOT NULL,
        created  TEXT NOT NULL,
        updated  TEXT NOT NULL,
        payload  TEXT NOT NULL,
        UNIQUE (uuid, source)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        setting_name   TEXT NOT NULL UNIQUE,
        setting_value  TEXT
    )
    "#,
];

/// Creates the tables if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
