//! Domain models: raw harvested records, the canonical dataset shape, and
//! published package updates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Fixed publication boilerplate carried by every canonical dataset.
pub const AUTHOR_EMAIL: &str = "open-ouvert@tbs-sct.gc.ca";
pub const LICENSE_ID: &str = "ca-ogl-lgo";
pub const ATTRIBUTION_EN: &str =
    "Contains information licensed under the Open Government Licence \u{2013} Canada.";
pub const ATTRIBUTION_FR: &str =
    "Contient des informations autoris\u{e9}es sous la Licence du gouvernement ouvert- Canada";
pub const DEFAULT_BROWSE_GRAPHIC: &str = "/static/img/canada_default.png";

/// Which external catalog a record was harvested from.
///
/// The short tag (`gr` for the product feed, `ec` for the CSW documents)
/// is the value stored in the database and accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Dual-locale JSON product feed.
    Geogratis,
    /// Namespaced ISO documents served over CSW.
    EcCsw,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Geogratis => "gr",
            SourceKind::EcCsw => "ec",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gr" => Ok(SourceKind::Geogratis),
            "ec" => Ok(SourceKind::EcCsw),
            _ => Err(AppError::ConfigError(format!(
                "Unknown source: '{}'. Valid options: gr, ec",
                s
            ))),
        }
    }
}

/// Lifecycle state of a harvested record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Present in the catalog and publishable.
    Active,
    /// The provider marked the record deleted. Deleted records are frozen
    /// and never replaced by later scans.
    Deleted,
    /// The record exists but cannot be published (no resources, or the
    /// English record was absent).
    Missing,
    /// The English record exists but the French counterpart was absent.
    MissingFrench,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Active => "active",
            RecordState::Deleted => "deleted",
            RecordState::Missing => "missing",
            RecordState::MissingFrench => "missing_french",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecordState::Active),
            "deleted" => Ok(RecordState::Deleted),
            "missing" => Ok(RecordState::Missing),
            "missing_french" => Ok(RecordState::MissingFrench),
            _ => Err(AppError::Generic(format!("Unknown record state: '{}'", s))),
        }
    }
}

/// A raw record as harvested, before conversion.
///
/// For the feed source the payloads are the English and French JSON
/// documents; for the CSW source `payload_en` holds the full namespaced
/// XML document and `payload_fr` is unused. Provider date strings are
/// stored verbatim since the feed emits `2014`, `2014-03`, and full
/// dates interchangeably.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: i64,
    pub source: SourceKind,
    pub uuid: String,
    pub title_en: Option<String>,
    pub title_fr: Option<String>,
    pub state: RecordState,
    pub payload_en: Option<String>,
    pub payload_fr: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub edited: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// A raw record about to be stored. The id and scan timestamp are
/// assigned by the record store.
#[derive(Debug, Clone)]
pub struct NewRawRecord {
    pub source: SourceKind,
    pub uuid: String,
    pub title_en: Option<String>,
    pub title_fr: Option<String>,
    pub state: RecordState,
    pub payload_en: Option<String>,
    pub payload_fr: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub edited: Option<String>,
}

/// One downloadable resource of a canonical dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetResource {
    pub name: String,
    pub name_fra: String,
    pub url: String,
    pub format: String,
    pub size: u64,
    pub language: String,
    pub resource_type: String,
}

impl Default for DatasetResource {
    fn default() -> Self {
        Self {
            name: String::new(),
            name_fra: String::new(),
            url: String::new(),
            format: String::new(),
            size: 0,
            language: "eng; CAN | fra; CAN".to_string(),
            resource_type: "file".to_string(),
        }
    }
}

impl DatasetResource {
    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("format".to_string(), Value::from(self.format.as_str()));
        map.insert("language".to_string(), Value::from(self.language.as_str()));
        map.insert("name".to_string(), Value::from(self.name.as_str()));
        map.insert("name_fra".to_string(), Value::from(self.name_fra.as_str()));
        map.insert(
            "resource_type".to_string(),
            Value::from(self.resource_type.as_str()),
        );
        map.insert("url".to_string(), Value::from(self.url.as_str()));
        Value::Object(map)
    }
}

/// The canonical Open Data dataset shape, independent of source protocol.
///
/// Conversion is a pure function of one [`RawRecord`] plus the crosswalk
/// tables, so converting unchanged input reproduces an identical value.
/// [`CanonicalDataset::to_package_value`] is the stable publish contract
/// with the downstream system.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalDataset {
    pub id: String,
    pub url: String,
    pub url_fra: String,
    pub title: String,
    pub title_fra: String,
    pub notes: String,
    pub notes_fra: String,
    pub date_modified: String,
    pub date_published: String,
    pub data_series_name: String,
    pub data_series_name_fra: String,
    pub data_series_issue_identification: String,
    pub data_series_issue_identification_fra: String,
    /// Cleaned, deduped, lowercased, sorted.
    pub keywords: Vec<String>,
    pub keywords_fra: Vec<String>,
    /// GeoJSON Polygon, serialized to a string for the publish contract.
    pub spatial: String,
    pub spatial_representation_type: String,
    pub presentation_form: String,
    pub digital_object_identifier: String,
    pub geographic_region: Vec<String>,
    pub browse_graphic_url: String,
    pub topic_category: Vec<String>,
    /// Derived from the resolved topics, never read from raw input.
    pub subject: Vec<String>,
    pub state: RecordState,
    /// Sorted by url.
    pub resources: Vec<DatasetResource>,
    pub maintenance_and_update_frequency: String,
    pub time_period_coverage_start: String,
    pub time_period_coverage_end: String,
    pub catalog_type: String,
    pub owner_org: String,
    pub endpoint_url: String,
    pub endpoint_url_fra: String,
    pub language: String,
    pub ready_to_publish: bool,
    pub portal_release_date: String,
}

impl Default for CanonicalDataset {
    fn default() -> Self {
        Self {
            id: String::new(),
            url: String::new(),
            url_fra: String::new(),
            title: String::new(),
            title_fra: String::new(),
            notes: String::new(),
            notes_fra: String::new(),
            date_modified: String::new(),
            date_published: String::new(),
            data_series_name: String::new(),
            data_series_name_fra: String::new(),
            data_series_issue_identification: String::new(),
            data_series_issue_identification_fra: String::new(),
            keywords: Vec::new(),
            keywords_fra: Vec::new(),
            spatial: String::new(),
            spatial_representation_type: String::new(),
            presentation_form: String::new(),
            digital_object_identifier: String::new(),
            geographic_region: Vec::new(),
            browse_graphic_url: String::new(),
            topic_category: Vec::new(),
            subject: Vec::new(),
            state: RecordState::Active,
            resources: Vec::new(),
            maintenance_and_update_frequency: String::new(),
            time_period_coverage_start: String::new(),
            time_period_coverage_end: String::new(),
            catalog_type: "Data | Donn\u{e9}es".to_string(),
            owner_org: String::new(),
            endpoint_url: String::new(),
            endpoint_url_fra: String::new(),
            language: "eng; CAN | fra; CAN".to_string(),
            ready_to_publish: false,
            portal_release_date: String::new(),
        }
    }
}

impl CanonicalDataset {
    /// Serializes the dataset into the flat package object expected by the
    /// downstream publishing system.
    ///
    /// Keywords are comma-joined; the `resources` array is only included
    /// when non-empty. `serde_json::Map` keeps keys sorted, so serializing
    /// the result yields byte-identical output for identical datasets.
    pub fn to_package_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("attribution".to_string(), Value::from(ATTRIBUTION_EN));
        map.insert("attribution_fra".to_string(), Value::from(ATTRIBUTION_FR));
        map.insert("author_email".to_string(), Value::from(AUTHOR_EMAIL));
        map.insert(
            "browse_graphic_url".to_string(),
            Value::from(self.browse_graphic_url.as_str()),
        );
        map.insert(
            "catalog_type".to_string(),
            Value::from(self.catalog_type.as_str()),
        );
        map.insert(
            "data_series_issue_identification".to_string(),
            Value::from(self.data_series_issue_identification.as_str()),
        );
        map.insert(
            "data_series_issue_identification_fra".to_string(),
            Value::from(self.data_series_issue_identification_fra.as_str()),
        );
        map.insert(
            "data_series_name".to_string(),
            Value::from(self.data_series_name.as_str()),
        );
        map.insert(
            "data_series_name_fra".to_string(),
            Value::from(self.data_series_name_fra.as_str()),
        );
        map.insert(
            "date_modified".to_string(),
            Value::from(self.date_modified.as_str()),
        );
        map.insert(
            "date_published".to_string(),
            Value::from(self.date_published.as_str()),
        );
        map.insert(
            "digital_object_identifier".to_string(),
            Value::from(self.digital_object_identifier.as_str()),
        );
        map.insert(
            "endpoint_url".to_string(),
            Value::from(self.endpoint_url.as_str()),
        );
        map.insert(
            "endpoint_url_fra".to_string(),
            Value::from(self.endpoint_url_fra.as_str()),
        );
        map.insert("id".to_string(), Value::from(self.id.as_str()));
        map.insert("keywords".to_string(), Value::from(self.keywords.join(",")));
        map.insert(
            "keywords_fra".to_string(),
            Value::from(self.keywords_fra.join(",")),
        );
        map.insert("language".to_string(), Value::from(self.language.as_str()));
        map.insert("license_id".to_string(), Value::from(LICENSE_ID));
        map.insert(
            "maintenance_and_update_frequency".to_string(),
            Value::from(self.maintenance_and_update_frequency.as_str()),
        );
        map.insert("name".to_string(), Value::from(self.id.as_str()));
        map.insert("notes".to_string(), Value::from(self.notes.as_str()));
        map.insert(
            "notes_fra".to_string(),
            Value::from(self.notes_fra.as_str()),
        );
        map.insert(
            "owner_org".to_string(),
            Value::from(self.owner_org.as_str()),
        );
        map.insert(
            "portal_release_date".to_string(),
            Value::from(self.portal_release_date.as_str()),
        );
        map.insert(
            "presentation_form".to_string(),
            Value::from(self.presentation_form.as_str()),
        );
        map.insert(
            "ready_to_publish".to_string(),
            Value::from(self.ready_to_publish),
        );
        map.insert(
            "regions".to_string(),
            Value::from(self.geographic_region.clone()),
        );
        map.insert("spatial".to_string(), Value::from(self.spatial.as_str()));
        map.insert(
            "spatial_representation_type".to_string(),
            Value::from(self.spatial_representation_type.as_str()),
        );
        map.insert("state".to_string(), Value::from(self.state.as_str()));
        map.insert("subject".to_string(), Value::from(self.subject.clone()));
        map.insert(
            "time_period_coverage_end".to_string(),
            Value::from(self.time_period_coverage_end.as_str()),
        );
        map.insert(
            "time_period_coverage_start".to_string(),
            Value::from(self.time_period_coverage_start.as_str()),
        );
        map.insert("title".to_string(), Value::from(self.title.as_str()));
        map.insert(
            "title_fra".to_string(),
            Value::from(self.title_fra.as_str()),
        );
        map.insert(
            "topic_category".to_string(),
            Value::from(self.topic_category.clone()),
        );
        map.insert("type".to_string(), Value::from("dataset"));
        map.insert("url".to_string(), Value::from(self.url.as_str()));
        map.insert("url_fra".to_string(), Value::from(self.url_fra.as_str()));
        if !self.resources.is_empty() {
            let resources: Vec<Value> = self.resources.iter().map(|r| r.to_value()).collect();
            map.insert("resources".to_string(), Value::Array(resources));
        }
        Value::Object(map)
    }
}

/// A published package update row.
///
/// At most one row exists per (`uuid`, `source`); `created` is preserved
/// across overwrites while `updated` is refreshed on every write.
#[derive(Debug, Clone)]
pub struct PackageUpdate {
    pub id: i64,
    pub uuid: String,
    pub source: SourceKind,
    pub created: String,
    pub updated: String,
    pub payload: String,
}

/// A package update about to be upserted. Timestamps are stamped by the
/// publish sink.
#[derive(Debug, Clone)]
pub struct NewPackageUpdate {
    pub uuid: String,
    pub source: SourceKind,
    pub payload: String,
}
