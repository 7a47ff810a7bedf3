//! Trait abstractions for storage and remote catalogs.
//!
//! The pipeline services are generic over these traits, so the services
//! can be tested against in-memory fakes while the binaries wire in the
//! SQLite repositories and HTTP clients.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::AppError;
use crate::model::{NewPackageUpdate, NewRawRecord, PackageUpdate, RawRecord, SourceKind};
use crate::scan::ScanMode;

/// Outcome of saving one raw record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No prior row existed, a new one was inserted.
    Created,
    /// A prior row existed and was overwritten.
    Replaced,
    /// The prior row is deleted and stays untouched.
    Frozen,
}

/// Outcome of upserting one package update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Cursor query for paging raw records in insertion order.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    pub source: SourceKind,
    /// Only rows with an id strictly greater than this are returned.
    pub limit_id: i64,
    pub limit: u32,
    /// Only rows scanned at or after this instant, when set.
    pub cutoff: Option<DateTime<Utc>>,
}

/// Persistence for raw harvested records.
pub trait RecordStore: Send + Sync + Clone {
    fn find_by_uuid(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> impl Future<Output = Result<Option<RawRecord>, AppError>> + Send;

    /// Saves a record, honoring the deleted-freeze rule: an existing
    /// deleted row is never overwritten.
    fn save(
        &self,
        record: &NewRawRecord,
    ) -> impl Future<Output = Result<SaveOutcome, AppError>> + Send;

    fn find_batch(
        &self,
        query: &RecordQuery,
    ) -> impl Future<Output = Result<Vec<RawRecord>, AppError>> + Send;
}

/// Persistence for published package updates.
pub trait PackageStore: Send + Sync + Clone {
    fn find_by_uuid(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> impl Future<Output = Result<Option<PackageUpdate>, AppError>> + Send;

    /// Inserts or overwrites the single row for (`uuid`, `source`),
    /// preserving the original creation timestamp on overwrite.
    fn upsert(
        &self,
        package: &NewPackageUpdate,
    ) -> impl Future<Output = Result<UpsertOutcome, AppError>> + Send;

    fn list_batch(
        &self,
        source: SourceKind,
        limit_id: i64,
        limit: u32,
        updated_since: Option<&str>,
    ) -> impl Future<Output = Result<Vec<PackageUpdate>, AppError>> + Send;
}

/// Named watermark storage shared by the scan and convert services.
pub trait WatermarkStore: Send + Sync + Clone {
    fn get(&self, name: &str) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    fn set(
        &self,
        name: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// One product reference on a feed page.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedProduct {
    pub id: String,
}

/// One page of the paginated product feed.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub products: Vec<FeedProduct>,
    pub count: u64,
    /// Absolute URL of the next page, absent on the last page.
    pub next: Option<String>,
    /// Absolute URL to resume monitoring from, offered on the first page.
    pub monitor: Option<String>,
}

/// The paginated dual-locale product feed.
pub trait CatalogFeed: Send + Sync + Clone {
    /// Builds the first-page URL for a scan mode.
    fn start_url(&self, mode: &ScanMode) -> String;

    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<FeedPage, AppError>> + Send;

    /// Fetches one product document in the given language (`en`/`fr`).
    /// A missing product yields `None`.
    fn fetch_product(
        &self,
        uuid: &str,
        lang: &str,
    ) -> impl Future<Output = Result<Option<Value>, AppError>> + Send;
}

/// A brief entry returned by a catalog search.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBrief {
    pub identifier: String,
    pub title: Option<String>,
}

/// A searchable catalog of full metadata documents (the CSW endpoint).
pub trait DocumentCatalog: Send + Sync + Clone {
    /// Lists identifiers of records modified on or after `modified_since`,
    /// or all records when it is absent.
    fn list_identifiers(
        &self,
        modified_since: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<DocumentBrief>, AppError>> + Send;

    /// Fetches the full document for one identifier. A missing document
    /// yields `None`.
    fn fetch_document(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;
}
