//! Scan services: walk the remote catalogs and persist raw records.
//!
//! One service per protocol. Both are generic over the storage traits so
//! they can run against in-memory fakes in tests.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::AppError;
use crate::model::{NewRawRecord, RecordState, SourceKind};
use crate::stats::{ScanOutcome, ScanStats};
use crate::traits::{CatalogFeed, DocumentCatalog, RecordStore, WatermarkStore};

/// Watermark holding the feed's resumption URL.
pub const MONITOR_LINK_KEY: &str = "monitor_link";
/// Watermark holding the instant of the last CSW scan.
pub const CSW_SCAN_DATE_KEY: &str = "csw_last_scan_date";

/// How a feed scan chooses its starting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Walk the whole catalog from the first page.
    Full,
    /// Only products edited on or after this date.
    Since(NaiveDate),
    /// Resume a full walk at an absolute product offset.
    StartIndex(u64),
    /// Resume from the monitor link persisted by the previous run.
    Monitor,
}

/// Walks the paginated product feed and saves each product's dual-locale
/// pair as one raw record.
pub struct FeedScanService<F, S, W> {
    feed: F,
    records: S,
    watermarks: W,
}

impl<F, S, W> FeedScanService<F, S, W>
where
    F: CatalogFeed,
    S: RecordStore,
    W: WatermarkStore,
{
    pub fn new(feed: F, records: S, watermarks: W) -> Self {
        Self {
            feed,
            records,
            watermarks,
        }
    }

    /// Per-product failures are counted and skipped; a page fetch failure
    /// ends the run with the error. The monitor link persisted after the
    /// first page stays valid, so the next monitor run re-covers whatever
    /// this walk did not reach.
    pub async fn run(&self, mode: ScanMode) -> Result<ScanStats, AppError> {
        let mut stats = ScanStats::default();

        let start_url = match mode {
            ScanMode::Monitor => match self.watermarks.get(MONITOR_LINK_KEY).await? {
                Some(link) => link,
                None => self.feed.start_url(&mode),
            },
            _ => self.feed.start_url(&mode),
        };
        info!(url = %start_url, "Starting feed scan");

        let mut page = self.feed.fetch_page(&start_url).await?;
        info!(count = page.count, "Records found");

        // The monitor link is only offered on the first page; persist it
        // up front so the next monitor run resumes past this scan even if
        // this one dies partway through.
        if let Some(monitor) = &page.monitor {
            self.watermarks.set(MONITOR_LINK_KEY, monitor).await?;
            info!(url = %monitor, "Saved next monitor link");
        }

        loop {
            if page.products.is_empty() {
                break;
            }
            for product in &page.products {
                match self.ingest_product(&product.id).await {
                    Ok(outcome) => stats.record(outcome),
                    Err(e) => {
                        warn!("{} failed to load: {}", product.id, e);
                        stats.record(ScanOutcome::Failed);
                    }
                }
            }
            match page.next.take() {
                Some(next) => {
                    page = self.feed.fetch_page(&next).await?;
                }
                None => {
                    warn!("Feed page carried no next link, ending scan");
                    break;
                }
            }
        }

        Ok(stats)
    }

    async fn ingest_product(&self, uuid: &str) -> Result<ScanOutcome, AppError> {
        let en = self
            .feed
            .fetch_product(uuid, "en")
            .await?
            .ok_or_else(|| AppError::ClientError(format!("English record {uuid} is missing")))?;
        let fr = self.feed.fetch_product(uuid, "fr").await?;

        let mut state = if en.get("deleted").and_then(Value::as_str) == Some("false") {
            RecordState::Active
        } else {
            RecordState::Deleted
        };
        let title_fr = match &fr {
            Some(fr) => fr.get("title").and_then(Value::as_str).map(str::to_string),
            None => {
                state = RecordState::MissingFrench;
                None
            }
        };

        // Deleted products no longer expose their real dates.
        let date = |key: &str| {
            if state == RecordState::Deleted {
                Some("2000-01-01".to_string())
            } else {
                en.get(key).and_then(Value::as_str).map(str::to_string)
            }
        };

        let record = NewRawRecord {
            source: SourceKind::Geogratis,
            uuid: en
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or(uuid)
                .to_string(),
            title_en: en.get("title").and_then(Value::as_str).map(str::to_string),
            title_fr,
            state,
            payload_en: Some(en.to_string()),
            payload_fr: fr.as_ref().map(Value::to_string),
            created: date("publishedDate"),
            updated: date("updatedDate"),
            edited: date("editedDate"),
        };
        let outcome = self.records.save(&record).await?;
        Ok(outcome.into())
    }
}

/// How a document scan filters the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CswScanMode {
    /// Every record in the catalog.
    All,
    /// Records modified on or after this date.
    Since(NaiveDate),
    /// Records modified since the last persisted scan instant.
    Monitor,
}

/// Walks the CSW catalog and saves each metadata document as one raw
/// record.
pub struct CswScanService<D, S, W> {
    catalog: D,
    records: S,
    watermarks: W,
}

impl<D, S, W> CswScanService<D, S, W>
where
    D: DocumentCatalog,
    S: RecordStore,
    W: WatermarkStore,
{
    pub fn new(catalog: D, records: S, watermarks: W) -> Self {
        Self {
            catalog,
            records,
            watermarks,
        }
    }

    pub async fn run(&self, mode: CswScanMode) -> Result<ScanStats, AppError> {
        let mut stats = ScanStats::default();

        let modified_since = match mode {
            CswScanMode::All => None,
            CswScanMode::Since(date) => Some(date),
            CswScanMode::Monitor => {
                let saved = self
                    .watermarks
                    .get(CSW_SCAN_DATE_KEY)
                    .await?
                    .and_then(|v| v.parse::<chrono::DateTime<Utc>>().ok())
                    .map(|t| t.date_naive());
                Some(saved.unwrap_or_else(|| Utc::now().date_naive()))
            }
        };
        info!(?modified_since, "Starting document scan");

        let briefs = self.catalog.list_identifiers(modified_since).await?;
        info!(count = briefs.len(), "Records found");
        for brief in &briefs {
            match self.ingest_document(&brief.identifier, brief.title.clone()).await {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    warn!("{} failed to load: {}", brief.identifier, e);
                    stats.record(ScanOutcome::Failed);
                }
            }
        }

        self.watermarks
            .set(
                CSW_SCAN_DATE_KEY,
                &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .await?;
        Ok(stats)
    }

    async fn ingest_document(
        &self,
        identifier: &str,
        title: Option<String>,
    ) -> Result<ScanOutcome, AppError> {
        let document = self
            .catalog
            .fetch_document(identifier)
            .await?
            .ok_or_else(|| AppError::ClientError(format!("Document {identifier} is missing")))?;
        let record = NewRawRecord {
            source: SourceKind::EcCsw,
            uuid: identifier.to_string(),
            title_en: title,
            title_fr: None,
            state: RecordState::Active,
            payload_en: Some(document),
            payload_fr: None,
            created: None,
            updated: None,
            edited: None,
        };
        let outcome = self.records.save(&record).await?;
        Ok(outcome.into())
    }
}
