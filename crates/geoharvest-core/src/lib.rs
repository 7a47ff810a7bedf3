//! Geoharvest Core - Domain types, conversion logic, and services.
//!
//! This crate provides the core functionality for the harvester:
//!
//! - **Domain models**: [`RawRecord`], [`CanonicalDataset`], [`PackageUpdate`]
//! - **Crosswalk**: vocabulary mapping between provider and registry terms
//! - **Converters**: [`GeogratisConverter`] for the dual-locale JSON feed, [`NapConverter`] for namespaced ISO documents
//! - **Services**: [`FeedScanService`] and [`CswScanService`] for harvesting, [`ConvertService`] for publishing, [`DumpService`] for export
//! - **Traits**: [`RecordStore`], [`PackageStore`], [`WatermarkStore`], [`CatalogFeed`], [`DocumentCatalog`] for dependency injection
//!
//! # Architecture
//!
//! Business logic is decoupled from I/O concerns through traits: the
//! services in this crate never talk to SQLite or HTTP directly, the
//! `geoharvest-db` and `geoharvest-client` crates provide those
//! implementations.
//!
//! # Example
//!
//! ```ignore
//! use geoharvest_core::{ConvertMode, ConvertService, SourceConverter, SourceKind};
//!
//! let service = ConvertService::new(records, packages, watermarks);
//! let converter = SourceConverter::for_source(crosswalk, SourceKind::Geogratis);
//! let stats = service
//!     .run(&converter, SourceKind::Geogratis, ConvertMode::Monitor)
//!     .await?;
//! ```

pub mod config;
pub mod convert;
pub mod crosswalk;
pub mod error;
pub mod export;
pub mod fields;
pub mod model;
pub mod pipeline;
pub mod scan;
pub mod stats;
pub mod traits;

// Configuration
pub use config::{
    CswConfig, GeogratisConfig, HarvesterConfig, HttpConfig, ScanConfig, default_config_path,
    load_harvester_config,
};

// Error handling
pub use error::AppError;

// Domain models
pub use model::{
    CanonicalDataset, DatasetResource, NewPackageUpdate, NewRawRecord, PackageUpdate, RawRecord,
    RecordState, SourceKind,
};

// Vocabulary crosswalk
pub use crosswalk::{Crosswalk, TopicResolution};

// Converters
pub use convert::{
    ConversionOutcome, DatasetConverter, GeogratisConverter, NapConverter, RejectReason,
    SourceConverter,
};

// Run statistics
pub use stats::{ConvertOutcome, ConvertStats, ScanOutcome, ScanStats};

// Traits for dependency injection
pub use traits::{
    CatalogFeed, DocumentBrief, DocumentCatalog, FeedPage, FeedProduct, PackageStore, RecordQuery,
    RecordStore, SaveOutcome, UpsertOutcome, WatermarkStore,
};

// Services (generic over trait implementations)
pub use export::{DumpMode, DumpService};
pub use pipeline::{ConvertMode, ConvertService, conversion_watermark_key};
pub use scan::{
    CSW_SCAN_DATE_KEY, CswScanMode, CswScanService, FeedScanService, MONITOR_LINK_KEY, ScanMode,
};
