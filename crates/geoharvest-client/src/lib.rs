//! Geoharvest Client - HTTP clients for the remote catalogs
//!
//! This crate provides HTTP clients for interacting with:
//!
//! - [`geogratis`] - the paginated Geogratis product feed
//! - [`csw`] - a CSW 2.0.2 catalog serving ISO 19139 documents
//!
//! # Overview
//!
//! The clients handle request building, response parsing, pacing between
//! requests, and error handling for their respective endpoints. Both
//! implement the catalog traits from `geoharvest-core`, so the scan
//! services stay independent of HTTP details.

pub mod csw;
pub mod geogratis;

// Re-export main client types
pub use csw::CswClient;
pub use geogratis::GeogratisClient;
