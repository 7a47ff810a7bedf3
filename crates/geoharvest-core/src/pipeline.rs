//! Convert service: pages raw records through a converter and writes the
//! results to the publish sink.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::convert::{ConversionOutcome, DatasetConverter};
use crate::error::AppError;
use crate::model::{NewPackageUpdate, RecordState, SourceKind};
use crate::stats::{ConvertOutcome, ConvertStats};
use crate::traits::{PackageStore, RecordQuery, RecordStore, WatermarkStore};

/// Timestamp layout shared by the conversion watermarks and the package
/// store's `updated` column. Lexicographic order on this layout matches
/// chronological order, which the incremental dump relies on.
pub const WATERMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_PAGE_SIZE: u32 = 10;

/// Watermark key for a source's last conversion run.
pub fn conversion_watermark_key(source: SourceKind) -> String {
    format!("last_conversion_{}", source.as_str())
}

/// Which raw records a convert run considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertMode {
    /// Every record of the source.
    All,
    /// Records scanned on or after this date.
    Since(chrono::NaiveDate),
    /// Records scanned since the last persisted conversion run.
    Monitor,
}

/// Pages raw records in id order, converts the active ones, and upserts
/// the serialized payloads. The run start instant becomes the new
/// watermark, written only after the run completes, so an interrupted
/// run repeats its window instead of skipping records.
pub struct ConvertService<S, P, W> {
    records: S,
    packages: P,
    watermarks: W,
    page_size: u32,
}

impl<S, P, W> ConvertService<S, P, W>
where
    S: RecordStore,
    P: PackageStore,
    W: WatermarkStore,
{
    pub fn new(records: S, packages: P, watermarks: W) -> Self {
        Self {
            records,
            packages,
            watermarks,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub async fn run<C: DatasetConverter>(
        &self,
        converter: &C,
        source: SourceKind,
        mode: ConvertMode,
    ) -> Result<ConvertStats, AppError> {
        let mut stats = ConvertStats::default();
        let run_started = Utc::now().format(WATERMARK_FORMAT).to_string();
        let watermark_key = conversion_watermark_key(source);

        let cutoff: Option<DateTime<Utc>> = match mode {
            ConvertMode::All => None,
            ConvertMode::Since(date) => Some(date.and_time(chrono::NaiveTime::MIN).and_utc()),
            ConvertMode::Monitor => self
                .watermarks
                .get(&watermark_key)
                .await?
                .and_then(|v| NaiveDateTime::parse_from_str(&v, WATERMARK_FORMAT).ok())
                .map(|t| t.and_utc()),
        };
        info!(source = %source, ?cutoff, "Starting conversion run");

        let mut last_id = 0i64;
        loop {
            let query = RecordQuery {
                source,
                limit_id: last_id,
                limit: self.page_size,
                cutoff,
            };
            let batch = self.records.find_batch(&query).await?;
            if batch.is_empty() {
                break;
            }
            for record in &batch {
                last_id = record.id;
                if record.state != RecordState::Active {
                    stats.record(ConvertOutcome::Skipped);
                    continue;
                }
                match self.convert_one(converter, record).await {
                    Ok(outcome) => stats.record(outcome),
                    Err(e) => {
                        warn!("{} failed to convert: {}", record.uuid, e);
                        stats.record(ConvertOutcome::Failed);
                    }
                }
            }
        }

        self.watermarks.set(&watermark_key, &run_started).await?;
        info!(
            published = stats.published,
            skipped = stats.skipped,
            rejected = stats.rejected,
            failed = stats.failed,
            "Conversion run complete"
        );
        Ok(stats)
    }

    async fn convert_one<C: DatasetConverter>(
        &self,
        converter: &C,
        record: &crate::model::RawRecord,
    ) -> Result<ConvertOutcome, AppError> {
        let mut dataset = match converter.convert(record)? {
            ConversionOutcome::Converted(dataset) => *dataset,
            ConversionOutcome::Rejected(reason) => {
                warn!("{} rejected: {}", record.uuid, reason);
                return Ok(ConvertOutcome::Rejected);
            }
        };
        dataset.portal_release_date = Utc::now().format("%Y-%m-%d").to_string();
        dataset.ready_to_publish = true;

        let package = NewPackageUpdate {
            uuid: record.uuid.clone(),
            source: record.source,
            payload: serde_json::to_string(&dataset.to_package_value())?,
        };
        self.packages.upsert(&package).await?;
        Ok(ConvertOutcome::Published)
    }
}
