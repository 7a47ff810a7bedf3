//! Raw record repository for SQLite.

use chrono::{DateTime, Utc};
use geoharvest_core::error::AppError;
use geoharvest_core::model::{NewRawRecord, RawRecord, RecordState, SourceKind};
use geoharvest_core::traits::{RecordQuery, RecordStore, SaveOutcome};
use sqlx::SqlitePool;

/// Column list for SELECT queries. Kept a const literal so every fetch path
/// reads the same projection.
const RECORD_COLUMNS: &str = "id, source, uuid, title_en, title_fr, state, payload_en, payload_fr, created, updated, edited, scanned_at";

/// Hard cap on batch reads regardless of what the caller asks for.
const MAX_BATCH_LIMIT: u32 = 1000;

/// Repository for harvested raw records in SQLite.
///
/// # Examples
///
/// ```no_run
/// use sqlx::sqlite::SqlitePoolOptions;
/// use geoharvest_db::RecordRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePoolOptions::new()
///     .max_connections(1)
///     .connect("sqlite://geoharvest.db")
///     .await?;
///
/// let repo = RecordRepository::new(pool);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RecordRepository {
    pool: SqlitePool,
}

/// Raw row shape as stored. `source` and `state` are persisted as their
/// short string codes and parsed on the way out.
#[derive(Debug, sqlx::FromRow)]
struct RawRecordRow {
    id: i64,
    source: String,
    uuid: String,
    title_en: Option<String>,
    title_fr: Option<String>,
    state: String,
    payload_en: Option<String>,
    payload_fr: Option<String>,
    created: Option<String>,
    updated: Option<String>,
    edited: Option<String>,
    scanned_at: DateTime<Utc>,
}

impl TryFrom<RawRecordRow> for RawRecord {
    type Error = AppError;

    fn try_from(row: RawRecordRow) -> Result<Self, Self::Error> {
        Ok(RawRecord {
            id: row.id,
            source: row.source.parse::<SourceKind>()?,
            uuid: row.uuid,
            title_en: row.title_en,
            title_fr: row.title_fr,
            state: row.state.parse::<RecordState>()?,
            payload_en: row.payload_en,
            payload_fr: row.payload_fr,
            created: row.created,
            updated: row.updated,
            edited: row.edited,
            scanned_at: row.scanned_at,
        })
    }
}

impl RecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Looks up a single record by its source and catalog identifier.
    pub async fn get(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> Result<Option<RawRecord>, AppError> {
        let row = sqlx::query_as::<_, RawRecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM raw_records WHERE source = ? AND uuid = ?"
        ))
        .bind(source.as_str())
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::DatabaseError)?;

        row.map(RawRecord::try_from).transpose()
    }

    /// Inserts a fresh record or replaces the stored copy of an existing
    /// one, stamping the row with the current scan instant.
    ///
    /// A record that was previously marked deleted is frozen: the stored row
    /// is left untouched and [`SaveOutcome::Frozen`] is returned, so a
    /// deletion observed once can never be undone by a later rescan.
    pub async fn save(&self, record: &NewRawRecord) -> Result<SaveOutcome, AppError> {
        let existing = self.get(record.source, &record.uuid).await?;
        let scanned_at = Utc::now();

        match existing {
            Some(prev) if prev.state == RecordState::Deleted => Ok(SaveOutcome::Frozen),
            Some(prev) => {
                sqlx::query(
                    r#"
                    UPDATE raw_records
                    SET title_en = ?, title_fr = ?, state = ?, payload_en = ?,
                        payload_fr = ?, created = ?, updated = ?, edited = ?,
                        scanned_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&record.title_en)
                .bind(&record.title_fr)
                .bind(record.state.as_str())
                .bind(&record.payload_en)
                .bind(&record.payload_fr)
                .bind(&record.created)
                .bind(&record.updated)
                .bind(&record.edited)
                .bind(scanned_at)
                .bind(prev.id)
                .execute(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;

                Ok(SaveOutcome::Replaced)
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO raw_records (
                        source, uuid, title_en, title_fr, state,
                        payload_en, payload_fr, created, updated, edited, scanned_at
                    )
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(record.source.as_str())
                .bind(&record.uuid)
                .bind(&record.title_en)
                .bind(&record.title_fr)
                .bind(record.state.as_str())
                .bind(&record.payload_en)
                .bind(&record.payload_fr)
                .bind(&record.created)
                .bind(&record.updated)
                .bind(&record.edited)
                .bind(scanned_at)
                .execute(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;

                Ok(SaveOutcome::Created)
            }
        }
    }

    /// Reads one page of records ordered by row id, starting after
    /// `limit_id`. An optional cutoff restricts the page to records scanned
    /// at or after that instant.
    pub async fn batch(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, AppError> {
        let limit = query.limit.clamp(1, MAX_BATCH_LIMIT);

        let rows = match query.cutoff {
            Some(cutoff) => {
                sqlx::query_as::<_, RawRecordRow>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM raw_records \
                     WHERE source = ? AND id > ? AND scanned_at >= ? \
                     ORDER BY id LIMIT ?"
                ))
                .bind(query.source.as_str())
                .bind(query.limit_id)
                .bind(cutoff)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, RawRecordRow>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM raw_records \
                     WHERE source = ? AND id > ? \
                     ORDER BY id LIMIT ?"
                ))
                .bind(query.source.as_str())
                .bind(query.limit_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(AppError::DatabaseError)?;

        rows.into_iter().map(RawRecord::try_from).collect()
    }
}

// =============================================================================
// Trait Implementation: RecordStore
// =============================================================================

impl RecordStore for RecordRepository {
    async fn find_by_uuid(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> Result<Option<RawRecord>, AppError> {
        RecordRepository::get(self, source, uuid).await
    }

    async fn save(&self, record: &NewRawRecord) -> Result<SaveOutcome, AppError> {
        RecordRepository::save(self, record).await
    }

    async fn find_batch(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, AppError> {
        RecordRepository::batch(self, query).await
    }
}
