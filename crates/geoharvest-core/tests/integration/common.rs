//! Test utilities and mock implementations for integration tests.
//!
//! Provides in-memory implementations of the storage and catalog traits
//! for testing the scan, convert, and dump services in isolation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use geoharvest_core::scan::ScanMode;
use geoharvest_core::traits::{
    CatalogFeed, DocumentBrief, DocumentCatalog, FeedPage, PackageStore, RecordQuery, RecordStore,
    SaveOutcome, UpsertOutcome, WatermarkStore,
};
use geoharvest_core::{
    AppError, NewPackageUpdate, NewRawRecord, PackageUpdate, RawRecord, RecordState, SourceKind,
};
use serde_json::{Value, json};

// =============================================================================
// MockRecordStore
// =============================================================================

#[derive(Default)]
struct RecordStoreInner {
    records: Vec<RawRecord>,
    next_id: i64,
    find_batch_calls: u64,
}

/// In-memory record store honoring the deleted-freeze rule.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    inner: Arc<Mutex<RecordStoreInner>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly, returning its assigned id.
    pub fn seed(&self, record: NewRawRecord) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(materialize(id, &record));
        id
    }

    pub fn records(&self) -> Vec<RawRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    /// How many times `find_batch` has been invoked.
    pub fn find_batch_calls(&self) -> u64 {
        self.inner.lock().unwrap().find_batch_calls
    }
}

fn materialize(id: i64, record: &NewRawRecord) -> RawRecord {
    RawRecord {
        id,
        source: record.source,
        uuid: record.uuid.clone(),
        title_en: record.title_en.clone(),
        title_fr: record.title_fr.clone(),
        state: record.state,
        payload_en: record.payload_en.clone(),
        payload_fr: record.payload_fr.clone(),
        created: record.created.clone(),
        updated: record.updated.clone(),
        edited: record.edited.clone(),
        scanned_at: Utc::now(),
    }
}

impl RecordStore for MockRecordStore {
    async fn find_by_uuid(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> Result<Option<RawRecord>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .find(|r| r.source == source && r.uuid == uuid)
            .cloned())
    }

    async fn save(&self, record: &NewRawRecord) -> Result<SaveOutcome, AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .records
            .iter_mut()
            .find(|r| r.source == record.source && r.uuid == record.uuid)
        {
            if existing.state == RecordState::Deleted {
                return Ok(SaveOutcome::Frozen);
            }
            let id = existing.id;
            *existing = materialize(id, record);
            return Ok(SaveOutcome::Replaced);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(materialize(id, record));
        Ok(SaveOutcome::Created)
    }

    async fn find_batch(&self, query: &RecordQuery) -> Result<Vec<RawRecord>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.find_batch_calls += 1;
        let mut batch: Vec<RawRecord> = inner
            .records
            .iter()
            .filter(|r| r.source == query.source && r.id > query.limit_id)
            .filter(|r| query.cutoff.map_or(true, |cutoff| r.scanned_at >= cutoff))
            .cloned()
            .collect();
        batch.sort_by_key(|r| r.id);
        batch.truncate(query.limit as usize);
        Ok(batch)
    }
}

// =============================================================================
// MockPackageStore
// =============================================================================

#[derive(Default)]
struct PackageStoreInner {
    packages: Vec<PackageUpdate>,
    next_id: i64,
}

/// In-memory publish sink enforcing one row per (uuid, source).
#[derive(Clone, Default)]
pub struct MockPackageStore {
    inner: Arc<Mutex<PackageStoreInner>>,
}

impl MockPackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packages(&self) -> Vec<PackageUpdate> {
        self.inner.lock().unwrap().packages.clone()
    }
}

impl PackageStore for MockPackageStore {
    async fn find_by_uuid(
        &self,
        source: SourceKind,
        uuid: &str,
    ) -> Result<Option<PackageUpdate>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .packages
            .iter()
            .find(|p| p.source == source && p.uuid == uuid)
            .cloned())
    }

    async fn upsert(&self, package: &NewPackageUpdate) -> Result<UpsertOutcome, AppError> {
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner
            .packages
            .iter_mut()
            .find(|p| p.source == package.source && p.uuid == package.uuid)
        {
            existing.payload = package.payload.clone();
            existing.updated = now;
            return Ok(UpsertOutcome::Updated);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.packages.push(PackageUpdate {
            id,
            uuid: package.uuid.clone(),
            source: package.source,
            created: now.clone(),
            updated: now,
            payload: package.payload.clone(),
        });
        Ok(UpsertOutcome::Created)
    }

    async fn list_batch(
        &self,
        source: SourceKind,
        limit_id: i64,
        limit: u32,
        updated_since: Option<&str>,
    ) -> Result<Vec<PackageUpdate>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut batch: Vec<PackageUpdate> = inner
            .packages
            .iter()
            .filter(|p| p.source == source && p.id > limit_id)
            .filter(|p| updated_since.map_or(true, |since| p.updated.as_str() >= since))
            .cloned()
            .collect();
        batch.sort_by_key(|p| p.id);
        batch.truncate(limit as usize);
        Ok(batch)
    }
}

// =============================================================================
// MockWatermarkStore
// =============================================================================

/// In-memory watermark store.
#[derive(Clone, Default)]
pub struct MockWatermarkStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MockWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.values.lock().unwrap().get(name).cloned()
    }

    pub fn preset(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }
}

impl WatermarkStore for MockWatermarkStore {
    async fn get(&self, name: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.lock().unwrap().get(name).cloned())
    }

    async fn set(&self, name: &str, value: &str) -> Result<(), AppError> {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// MockFeed
// =============================================================================

#[derive(Default)]
struct FeedInner {
    pages: HashMap<String, FeedPage>,
    products: HashMap<String, (Value, Option<Value>)>,
    fetched_urls: Vec<String>,
}

/// Scripted product feed keyed by page URL.
#[derive(Clone, Default)]
pub struct MockFeed {
    inner: Arc<Mutex<FeedInner>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, page: FeedPage) {
        self.inner.lock().unwrap().pages.insert(url.to_string(), page);
    }

    pub fn add_product(&self, uuid: &str, en: Value, fr: Option<Value>) {
        self.inner
            .lock()
            .unwrap()
            .products
            .insert(uuid.to_string(), (en, fr));
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.inner.lock().unwrap().fetched_urls.clone()
    }
}

impl CatalogFeed for MockFeed {
    fn start_url(&self, _mode: &ScanMode) -> String {
        "page-1".to_string()
    }

    async fn fetch_page(&self, url: &str) -> Result<FeedPage, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetched_urls.push(url.to_string());
        inner
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::ClientError(format!("No page scripted for {url}")))
    }

    async fn fetch_product(&self, uuid: &str, lang: &str) -> Result<Option<Value>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.products.get(uuid).and_then(|(en, fr)| {
            if lang == "en" {
                Some(en.clone())
            } else {
                fr.clone()
            }
        }))
    }
}

// =============================================================================
// MockDocumentCatalog
// =============================================================================

#[derive(Default)]
struct CatalogInner {
    briefs: Vec<DocumentBrief>,
    documents: HashMap<String, String>,
}

/// Scripted document catalog.
#[derive(Clone, Default)]
pub struct MockDocumentCatalog {
    inner: Arc<Mutex<CatalogInner>>,
}

impl MockDocumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(&self, identifier: &str, title: &str, document: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.briefs.push(DocumentBrief {
            identifier: identifier.to_string(),
            title: Some(title.to_string()),
        });
        inner
            .documents
            .insert(identifier.to_string(), document.to_string());
    }
}

impl DocumentCatalog for MockDocumentCatalog {
    async fn list_identifiers(
        &self,
        _modified_since: Option<chrono::NaiveDate>,
    ) -> Result<Vec<DocumentBrief>, AppError> {
        Ok(self.inner.lock().unwrap().briefs.clone())
    }

    async fn fetch_document(&self, identifier: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .documents
            .get(identifier)
            .cloned())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A minimal valid English feed product: one recognized topic, one file.
pub fn feed_product_en(uuid: &str) -> Value {
    json!({
        "id": uuid,
        "title": format!("Product {uuid}"),
        "summary": "A sample product.",
        "deleted": "false",
        "publishedDate": "2014-01-15",
        "updatedDate": "2014-06-01",
        "editedDate": "2014-06-02",
        "categories": [
            {"type": "urn:gc:subject", "terms": [{"label": "Earth Sciences"}]},
            {"type": "urn:iso:place", "terms": [{"label": "Canada"}]}
        ],
        "keywords": ["geology"],
        "topicCategories": ["geoscientificInformation"],
        "geometry": {"type": "Polygon", "coordinates": []},
        "files": [
            {
                "description": "Archive",
                "link": format!("http://geogratis.gc.ca/files/{uuid}.zip"),
                "size": "2 MB",
                "type": "ZIP"
            },
            {
                "description": "Read me",
                "link": format!("http://geogratis.gc.ca/files/{uuid}.txt"),
                "size": "1 KB",
                "type": "ASCII (American Standard Code for Information Interchange)"
            }
        ]
    })
}

/// The matching French product.
pub fn feed_product_fr(uuid: &str) -> Value {
    json!({
        "id": uuid,
        "title": format!("Produit {uuid}"),
        "summary": "Un produit.",
        "categories": [
            {"type": "urn:gc:subject", "terms": [{"label": "Sciences de la terre"}]}
        ],
        "keywords": ["g\u{e9}ologie"],
        "files": [
            {"description": "Archive fr", "link": format!("http://geogratis.gc.ca/files/{uuid}.zip")},
            {"description": "Lisez-moi", "link": format!("http://geogratis.gc.ca/files/{uuid}.txt")}
        ]
    })
}

/// A stored raw record wrapping the standard feed product pair.
pub fn raw_feed_record(uuid: &str, state: RecordState) -> NewRawRecord {
    NewRawRecord {
        source: SourceKind::Geogratis,
        uuid: uuid.to_string(),
        title_en: Some(format!("Product {uuid}")),
        title_fr: Some(format!("Produit {uuid}")),
        state,
        payload_en: Some(feed_product_en(uuid).to_string()),
        payload_fr: Some(feed_product_fr(uuid).to_string()),
        created: Some("2014-01-15".to_string()),
        updated: Some("2014-06-01".to_string()),
        edited: Some("2014-06-02".to_string()),
    }
}
