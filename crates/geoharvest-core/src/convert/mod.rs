//! Source-specific converters turning raw records into the canonical
//! dataset shape.
//!
//! Conversion is pure: it reads one raw record plus the crosswalk tables
//! and never touches the network or the database. Records that fail a
//! validity rule come back as [`ConversionOutcome::Rejected`] with the
//! rule that failed, so callers can log and count them without treating
//! them as errors.

use std::fmt;
use std::sync::Arc;

use crate::crosswalk::Crosswalk;
use crate::error::AppError;
use crate::model::{CanonicalDataset, RawRecord, SourceKind};

mod geogratis;
mod nap;

pub use geogratis::GeogratisConverter;
pub use nap::NapConverter;

/// Why a record could not be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingEnglishRecord,
    MissingEnglishTitle,
    MissingFrenchTitle,
    MissingKeywords,
    NoRecognizedTopics,
    NoResources,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingEnglishRecord => "missing English record",
            RejectReason::MissingEnglishTitle => "missing English title",
            RejectReason::MissingFrenchTitle => "missing French title",
            RejectReason::MissingKeywords => "missing keywords",
            RejectReason::NoRecognizedTopics => "no recognized topic categories",
            RejectReason::NoResources => "no resources",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of converting one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    Converted(Box<CanonicalDataset>),
    Rejected(RejectReason),
}

/// A converter for one source's raw payload format.
pub trait DatasetConverter {
    fn convert(&self, record: &RawRecord) -> Result<ConversionOutcome, AppError>;
}

/// Dispatching converter covering every supported source.
#[derive(Clone)]
pub enum SourceConverter {
    Geogratis(GeogratisConverter),
    Nap(NapConverter),
}

impl SourceConverter {
    pub fn for_source(crosswalk: Arc<Crosswalk>, source: SourceKind) -> Self {
        match source {
            SourceKind::Geogratis => {
                SourceConverter::Geogratis(GeogratisConverter::new(crosswalk))
            }
            SourceKind::EcCsw => SourceConverter::Nap(NapConverter::new(crosswalk)),
        }
    }
}

impl DatasetConverter for SourceConverter {
    fn convert(&self, record: &RawRecord) -> Result<ConversionOutcome, AppError> {
        match self {
            SourceConverter::Geogratis(converter) => converter.convert(record),
            SourceConverter::Nap(converter) => converter.convert(record),
        }
    }
}
