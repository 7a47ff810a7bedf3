//! Named setting storage, used for scan and conversion watermarks.

use geoharvest_core::error::AppError;
use geoharvest_core::traits::WatermarkStore;
use sqlx::SqlitePool;

/// Key/value settings table. Each watermark the pipeline tracks (monitor
/// links, last-run timestamps) lives under its own setting name.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The value column is nullable; a row holding NULL reads as absent.
    pub async fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT setting_value FROM settings WHERE setting_name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;

        Ok(row.and_then(|(value,)| value))
    }

    pub async fn set(&self, name: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO settings (setting_name, setting_value)
            VALUES (?, ?)
            ON CONFLICT (setting_name)
            DO UPDATE SET setting_value = excluded.setting_value
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        Ok(())
    }
}

// =============================================================================
// Trait Implementation: WatermarkStore
// =============================================================================

impl WatermarkStore for SettingsRepository {
    async fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        SettingsRepository::get(self, name).await
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), AppError> {
        SettingsRepository::set(self, name, value).await
    }
}
