//! Crosswalk tables mapping provider vocabulary onto the Open Data
//! registry vocabulary: topic categories with their derived subjects,
//! geographic regions, resource formats, maintenance frequencies, and
//! presentation forms.
//!
//! The registry schema is compiled into the binary; converters share a
//! single loaded [`Crosswalk`] behind an `Arc`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::AppError;

const OD_SCHEMA: &str = include_str!("../data/od_schema.json");

static CAMEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").expect("camel-case regex must compile"));

#[derive(Debug, Deserialize)]
struct SchemaFile {
    dataset_sections: Vec<SchemaSection>,
    resource_fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
struct SchemaSection {
    fields: Vec<SchemaField>,
}

#[derive(Debug, Deserialize)]
struct SchemaField {
    id: String,
    #[serde(default)]
    choices: Vec<SchemaChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaChoice {
    #[serde(default)]
    id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    eng: String,
    #[serde(default)]
    subject_ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct TopicEntry {
    key: String,
    subject_ids: Vec<String>,
}

/// Topic keys plus the subject keys they imply, both in registry
/// vocabulary. Subjects are deduplicated and sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicResolution {
    pub topics: Vec<String>,
    pub subjects: Vec<String>,
}

/// Loaded vocabulary tables. Lookups are by the exact provider string
/// after [`Crosswalk::normalize_topic`] style cleanup where applicable.
#[derive(Debug)]
pub struct Crosswalk {
    topics: HashMap<String, TopicEntry>,
    subjects: HashMap<String, String>,
    regions: HashMap<String, String>,
    formats: HashMap<String, String>,
}

impl Crosswalk {
    pub fn load() -> Result<Self, AppError> {
        let schema: SchemaFile = serde_json::from_str(OD_SCHEMA)?;

        let mut topics = HashMap::new();
        let mut subjects = HashMap::new();
        let mut regions = HashMap::new();
        for section in &schema.dataset_sections {
            for field in &section.fields {
                match field.id.as_str() {
                    "topic_category" => {
                        for choice in &field.choices {
                            topics.insert(
                                choice.eng.clone(),
                                TopicEntry {
                                    key: choice.key.clone(),
                                    subject_ids: choice.subject_ids.clone(),
                                },
                            );
                        }
                    }
                    "subject" => {
                        for choice in &field.choices {
                            subjects.insert(choice.id.clone(), choice.key.clone());
                        }
                    }
                    "geographic_region" => {
                        for choice in &field.choices {
                            regions.insert(choice.eng.clone(), choice.key.clone());
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut formats = HashMap::new();
        for field in &schema.resource_fields {
            if field.id == "format" {
                for choice in &field.choices {
                    formats.insert(choice.eng.clone(), choice.key.clone());
                }
            }
        }
        for (alias, key) in FORMAT_ALIASES {
            formats.insert((*alias).to_string(), (*key).to_string());
        }

        Ok(Self {
            topics,
            subjects,
            regions,
            formats,
        })
    }

    /// Normalizes one provider topic token into the registry's English
    /// label: known irregular spellings are substituted directly, anything
    /// else gets its camel-case humps split and is title-cased.
    pub fn normalize_topic(raw: &str) -> String {
        if let Some(label) = substitute(raw) {
            return label.to_string();
        }
        let spaced = CAMEL_RE.replace_all(raw, "$1 $2");
        let titled = title_case(&spaced);
        match substitute(&titled) {
            Some(label) => label.to_string(),
            None => titled,
        }
    }

    /// Resolves raw topic tokens into registry topic keys and the subject
    /// keys those topics imply. Unknown tokens are dropped; subjects are
    /// accumulated uniquely and sorted. Token order does not affect the
    /// result beyond topic order itself.
    pub fn resolve_topics(&self, raw: &[String]) -> TopicResolution {
        let mut topics = Vec::new();
        let mut subjects: Vec<String> = Vec::new();
        for token in raw {
            let label = Self::normalize_topic(token);
            if let Some(entry) = self.topics.get(&label) {
                topics.push(entry.key.clone());
                for id in &entry.subject_ids {
                    if let Some(subject_key) = self.subjects.get(id) {
                        if !subjects.contains(subject_key) {
                            subjects.push(subject_key.clone());
                        }
                    }
                }
            }
        }
        subjects.sort();
        TopicResolution { topics, subjects }
    }

    pub fn region(&self, label: &str) -> Option<&str> {
        self.regions.get(label).map(String::as_str)
    }

    /// Maps a provider format label to a registry format key, falling back
    /// to `other`.
    pub fn resource_format(&self, label: &str) -> &str {
        self.formats.get(label).map(String::as_str).unwrap_or("other")
    }

    /// Maps an ISO maintenance frequency code onto its bilingual label.
    /// Unknown and empty codes collapse to unknown.
    pub fn frequency(code: &str) -> &'static str {
        match code {
            "asNeeded" => "As Needed | Au besoin",
            "continual" => "Continual | Continue",
            "daily" => "Daily | Quotidien",
            "weekly" => "Weekly | Hebdomadaire",
            "fortnightly" => "Fortnightly | Quinzomadaire",
            "monthly" => "Monthly | Mensuel",
            "semimonthly" => "Semimonthly | Bimensuel",
            "quarterly" => "Quarterly | Trimestriel",
            "biannually" => "Biannually | Semestriel",
            "annually" => "Annually | Annuel",
            "irregular" => "Irregular | Irr\u{e9}gulier",
            "notPlanned" => "Not Planned | Non planifi\u{e9}",
            _ => "Unknown | Inconnu",
        }
    }

    /// Maps an ISO presentation form code onto its bilingual label. The
    /// misspelled codes are what the provider actually emits.
    pub fn presentation_form(code: &str) -> Option<&'static str> {
        let label = match code {
            "documentDigital" => "Document Digital | Document num\u{e9}rique",
            "documentHardcopy" => "Document Hardcopy | Document papier",
            "imageDigital" => "Image Digital | Image num\u{e9}rique",
            "imageHardcopy" => "Image Hardcopy | Image papier",
            "mapDigital" => "Map Digital | Carte num\u{e9}rique",
            "mapHardcopy" => "Map Hardcopy | Carte papier",
            "modelDigital" => "Model Digital | Mod\u{e8}le num\u{e9}rique",
            "modelHardcopy" => "Model Hardcopy | Maquette",
            "profileDigital" => "Profile Digital | Profil num\u{e9}rique",
            "profileHardcopy" => "Profile Hardcopy | Profil papier",
            "tableDigital" => "Table Digital | Table num\u{e9}rique",
            "tableHardcopy" => "Table Hardcopy | Table papier",
            "videoDigital" => "Video Digital | Vid\u{e9}o num\u{e9}rique",
            "videoHardcopy" | "videalHardcopy" => "Video Hardcopy | Vid\u{e9}o film",
            "audioDigital" => "Audio Digital | Audio num\u{e9}rique",
            "audioHardcopy" => "Audio Hardcopy | Audio analogique",
            "multimediaDigital" => "Multimedia Digital | Multim\u{e9}dia num\u{e9}rique",
            "multimediaHardcopy" => "Multimedia Hardcopy | Multim\u{e9}dia analogique",
            "diagramDigital" | "diagramDigial" => "Diagram Digital | Diagramme num\u{e9}rique",
            "diagramHardcopy" => "Diagram Hardcopy | Diagramme papier",
            _ => return None,
        };
        Some(label)
    }
}

/// Provider format labels that do not appear verbatim in the registry
/// schema.
const FORMAT_ALIASES: &[(&str, &str)] = &[
    ("GeoTIFF (Georeferenced Tag Image File Format)", "geotif"),
    ("TIFF (Tag Image File Format)", "tiff"),
    ("GeoTIFF", "geotif"),
    ("Adobe PDF", "PDF"),
    ("PDF - Portable Document Format", "PDF"),
    (
        "ASCII (American Standard Code for Information Interchange)",
        "TXT",
    ),
    ("GML (Geography Markup Language)", "gml"),
    ("Shape", "SHAPE"),
    ("gzip (GNU zip)", "ZIP"),
    ("ZIP", "ZIP"),
    ("ESRI Shapefile", "SHAPE"),
    ("JPEG", "jpg"),
    ("Jpeg 2000", "jpeg 2000"),
];

/// Irregular provider spellings that bypass the mechanical cleanup.
fn substitute(token: &str) -> Option<&'static str> {
    match token {
        "society; soci\u{e9}t\u{e9}" => Some("Society"),
        "farming; agriculture" => Some("Farming"),
        "Climatology Meteorology Atmosphere" | "Climatologymeteorologyatmosphere" => {
            Some("Climatology / Meteorology / Atmosphere")
        }
        "Geoscientificinformation" => Some("Geoscientific Information"),
        "Inlandwaters" => Some("Inland Waters"),
        _ => None,
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
