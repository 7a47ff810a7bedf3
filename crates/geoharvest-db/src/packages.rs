//! Package update repository for SQLite.

use chrono::Utc;
use geoharvest_core::error::AppError;
use geoharvest_core::model::{NewPackageUpdate, PackageUpdate, SourceKind};
use geoharvest_core::pipeline::WATERMARK_FORMAT;
use geoharvest_core::traits::{PackageStore, UpsertOutcome};
use sqlx::SqlitePool;

const PACKAGE_COLUMNS: &str = "id, uuid, source, created, updated, payload";

const MAX_BATCH_LIMIT: u32 = 1000;

/// Repository for converted package updates in SQLite.
#[derive(Clone)]
pub struct PackageRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: i64,
    uuid: String,
    source: String,
    created: String,
    updated: String,
    payload: String,
}

impl TryFrom<PackageRow> for PackageUpdate {
    type Error = AppError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        Ok(PackageUpdate {
            id: row.id,
            uuid: row.uuid,
            source: row.source.parse::<SourceKind>()?,
            created: row.created,
            updated: row.updated,
            payload: row.payload,
        })
    }
}

impl PackageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Looks up the single package row for a source and catalog identifier.
    pub async fn get(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> Result<Option<PackageUpdate>, AppError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM package_updates WHERE source = ? AND uuid = ?"
        ))
        .bind(source.as_str())
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        row.map(PackageUpdate::try_from).transpose()
    }

    /// Inserts a new package row or overwrites the payload of an existing
    /// one. The creation timestamp survives overwrites, only `updated`
    /// moves forward.
    pub async fn upsert(&self, package: &NewPackageUpdate) -> Result<UpsertOutcome, AppError> {
        let existing = self.get(package.source, &package.uuid).await?;
        // Same layout as the conversion watermark, so monitor-mode dumps
        // can compare the two directly.
        let now = Utc::now().format(WATERMARK_FORMAT).to_string();

        match existing {
            Some(prev) => {
                sqlx::query("UPDATE package_updates SET payload = ?, updated = ? WHERE id = ?")
                    .bind(&package.payload)
                    .bind(&now)
                    .bind(prev.id)
                    .execute(&self.pool)
                    .await
                    .map_err(AppError::DatabaseError)?;

                Ok(UpsertOutcome::Updated)
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO package_updates (uuid, source, created, updated, payload)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&package.uuid)
                .bind(package.source.as_str())
                .bind(&now)
                .bind(&now)
                .bind(&package.payload)
                .execute(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;

                Ok(UpsertOutcome::Created)
            }
        }
    }

    /// Reads one page of package updates ordered by row id, starting after
    /// `limit_id`. When `updated_since` is set, only rows touched at or
    /// after that timestamp are returned.
    pub async fn batch(
        &self,
        source: SourceKind,
        limit_id: i64,
        limit: u32,
        updated_since: Option<&str>,
    ) -> Result<Vec<PackageUpdate>, AppError> {
        let limit = limit.clamp(1, MAX_BATCH_LIMIT);

        let rows = match updated_since {
            Some(since) => {
                sqlx::query_as::<_, PackageRow>(&format!(
                    "SELECT {PACKAGE_COLUMNS} FROM package_updates \
                     WHERE source = ? AND id > ? AND updated >= ? \
                     ORDER BY id LIMIT ?"
                ))
                .bind(source.as_str())
                .bind(limit_id)
                .bind(since)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, PackageRow>(&format!(
                    "SELECT {PACKAGE_COLUMNS} FROM package_updates \
                     WHERE source = ? AND id > ? \
                     ORDER BY id LIMIT ?"
                ))
                .bind(source.as_str())
                .bind(limit_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(AppError::DatabaseError)?;

        rows.into_iter().map(PackageUpdate::try_from).collect()
    }
}

// =============================================================================
// Trait Implementation: PackageStore
// =============================================================================

impl PackageStore for PackageRepository {
    async fn find_by_uuid(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> Result<Option<PackageUpdate>, AppError> {
        PackageRepository::get(self, source, uuid).await
    }

    async fn upsert(&self, package: &NewPackageUpdate) -> Result<UpsertOutcome, AppError> {
        PackageRepository::upsert(self, package).await
    }

    async fn list_batch(
        &self,
        source: SourceKind,
        limit_id: i64,
        limit: u32,
        updated_since: Option<&str>,
    ) -> Result<Vec<PackageUpdate>, AppError> {
        PackageRepository::batch(self, source, limit_id, limit, updated_since).await
    }
}
