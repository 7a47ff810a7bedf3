//! Geoharvest DB - SQLite repository layer for the harvest pipeline
//!
//! This crate provides the repository pattern for raw record, package
//! update, and watermark persistence on SQLite.
//!
//! # Overview
//!
//! The main components are:
//! - [`RecordRepository`] - Raw harvested records with the deleted-freeze rule
//! - [`PackageRepository`] - Converted package updates keyed by (uuid, source)
//! - [`SettingsRepository`] - Named watermarks for incremental runs
//! - [`init_schema`] - Idempotent schema creation at startup

mod packages;
mod records;
mod schema;
mod settings;

pub use packages::PackageRepository;
pub use records::RecordRepository;
pub use schema::init_schema;
pub use settings::SettingsRepository;
