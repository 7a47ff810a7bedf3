//! Converter for the dual-locale JSON product feed.

use std::sync::Arc;

use serde_json::Value;

use crate::convert::{ConversionOutcome, DatasetConverter, RejectReason};
use crate::crosswalk::Crosswalk;
use crate::error::AppError;
use crate::fields::{clean_keyword, coerce_date, merge_keywords, parse_file_size, DateBound};
use crate::model::{
    CanonicalDataset, DatasetResource, RawRecord, RecordState, DEFAULT_BROWSE_GRAPHIC,
};

const PRODUCT_URL_BASE: &str = "http://geogratis.gc.ca/api";
const PRODUCT_PATH: &str = "nrcan-rncan/ess-sst";

/// Builds canonical datasets from the feed's paired English/French JSON
/// documents. The English document is mandatory; the French one fills in
/// the `_fra` fields when present.
#[derive(Clone)]
pub struct GeogratisConverter {
    crosswalk: Arc<Crosswalk>,
}

impl GeogratisConverter {
    pub fn new(crosswalk: Arc<Crosswalk>) -> Self {
        Self { crosswalk }
    }

    fn apply_english(&self, ds: &mut CanonicalDataset, en: &Value) {
        ds.url = format!("{PRODUCT_URL_BASE}/en/{PRODUCT_PATH}/{}", ds.id);
        if let Some(title) = str_field(en, "title") {
            ds.title = title.to_string();
        }
        if let Some(summary) = str_field(en, "summary") {
            ds.notes = summary.to_string();
        }
        ds.date_modified = str_field(en, "updatedDate")
            .unwrap_or("2000-01-01")
            .to_string();

        let citation = en.get("citation");
        if let Some(series) = citation.and_then(|c| c.get("series")).and_then(Value::as_str) {
            ds.data_series_name = series.to_string();
        }
        if let Some(issue) = citation
            .and_then(|c| c.get("seriesIssue"))
            .and_then(Value::as_str)
        {
            ds.data_series_issue_identification = issue.to_string();
        }
        if let Some(doi) = citation
            .and_then(|c| c.get("otherCitationDetails"))
            .and_then(Value::as_str)
        {
            ds.digital_object_identifier = doi.to_string();
        }

        // Keywords come from two places: the gc:subject category terms
        // and the keyword hierarchy list.
        let seed: Vec<String> = category_terms(en, "urn:gc:subject")
            .iter()
            .map(|label| clean_keyword(label))
            .filter(|k| !k.is_empty())
            .collect();
        let raw_keywords: Vec<String> = en
            .get("keywords")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        ds.keywords = merge_keywords(&raw_keywords, seed);

        // The downstream system stores GeoJSON as an opaque string.
        if let Some(geometry) = en.get("geometry").filter(|g| !g.is_null()) {
            ds.spatial = geometry.to_string();
        }

        if let Some(forms) = citation
            .and_then(|c| c.get("presentationForm"))
            .and_then(Value::as_str)
        {
            for form in forms.split_whitespace() {
                if let Some(label) = Crosswalk::presentation_form(form.trim_matches(';')) {
                    ds.presentation_form = label.to_string();
                }
            }
        }

        ds.browse_graphic_url = en
            .get("browseImages")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(|image| image.get("link"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BROWSE_GRAPHIC)
            .to_string();

        for label in category_terms(en, "urn:iso:place") {
            if let Some(key) = self.crosswalk.region(&label) {
                ds.geographic_region.push(key.to_string());
            }
        }

        let published = str_field(en, "publishedDate")
            .or_else(|| {
                citation
                    .and_then(|c| c.get("publicationDate"))
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty())
            })
            .or_else(|| str_field(en, "createdDate"))
            .unwrap_or("");
        ds.date_published = coerce_date(published, DateBound::Start).unwrap_or_default();

        let raw_topics: Vec<String> = en
            .get("topicCategories")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let resolution = self.crosswalk.resolve_topics(&raw_topics);
        ds.topic_category = resolution.topics;
        ds.subject = resolution.subjects;

        if let Some(files) = en.get("files").and_then(Value::as_array) {
            for file in files {
                let format = str_field(file, "type")
                    .map(|t| self.crosswalk.resource_format(t))
                    .unwrap_or("other");
                ds.resources.push(DatasetResource {
                    name: str_field(file, "description").unwrap_or("").to_string(),
                    url: str_field(file, "link").unwrap_or("").to_string(),
                    size: parse_file_size(str_field(file, "size").unwrap_or("")),
                    format: format.to_string(),
                    ..Default::default()
                });
            }
        }

        ds.maintenance_and_update_frequency = "As Needed | Au besoin".to_string();
    }

    fn apply_french(&self, ds: &mut CanonicalDataset, fr: &Value) {
        if let Some(id) = str_field(fr, "id") {
            ds.url_fra = format!("{PRODUCT_URL_BASE}/fr/{PRODUCT_PATH}/{id}");
        }
        if let Some(title) = str_field(fr, "title") {
            ds.title_fra = title.to_string();
        }
        if let Some(summary) = str_field(fr, "summary") {
            ds.notes_fra = summary.to_string();
        }
        let citation = fr.get("citation");
        if let Some(series) = citation.and_then(|c| c.get("series")).and_then(Value::as_str) {
            ds.data_series_name_fra = series.to_string();
        }
        if let Some(issue) = citation
            .and_then(|c| c.get("seriesIssue"))
            .and_then(Value::as_str)
        {
            ds.data_series_issue_identification_fra = issue.to_string();
        }

        let seed: Vec<String> = category_terms(fr, "urn:gc:subject")
            .iter()
            .map(|label| clean_keyword(label))
            .filter(|k| !k.is_empty())
            .collect();
        let raw_keywords: Vec<String> = fr
            .get("keywords")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        ds.keywords_fra = merge_keywords(&raw_keywords, seed);

        // Display names can only be paired when both locales list the
        // same number of files.
        if let Some(files) = fr.get("files").and_then(Value::as_array) {
            if files.len() == ds.resources.len() {
                for (resource, file) in ds.resources.iter_mut().zip(files) {
                    if let Some(description) = str_field(file, "description") {
                        resource.name_fra = description.to_string();
                    }
                }
            }
        }
    }
}

impl DatasetConverter for GeogratisConverter {
    fn convert(&self, record: &RawRecord) -> Result<ConversionOutcome, AppError> {
        let en: Value = match &record.payload_en {
            Some(payload) => serde_json::from_str(payload)?,
            None => return Ok(ConversionOutcome::Rejected(RejectReason::MissingEnglishRecord)),
        };
        if en.is_null() {
            return Ok(ConversionOutcome::Rejected(RejectReason::MissingEnglishRecord));
        }
        let fr: Option<Value> = match &record.payload_fr {
            Some(payload) => {
                let value: Value = serde_json::from_str(payload)?;
                (!value.is_null()).then_some(value)
            }
            None => None,
        };

        let mut ds = CanonicalDataset {
            id: record.uuid.clone(),
            owner_org: "nrcan-rncan".to_string(),
            catalog_type: "Geo Data | G\u{e9}o".to_string(),
            state: RecordState::Active,
            ..Default::default()
        };

        self.apply_english(&mut ds, &en);
        if ds.topic_category.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::NoRecognizedTopics));
        }
        if ds.resources.is_empty() {
            return Ok(ConversionOutcome::Rejected(RejectReason::NoResources));
        }

        if let Some(fr) = &fr {
            self.apply_french(&mut ds, fr);
        }
        ds.resources.sort_by(|a, b| a.url.cmp(&b.url));

        Ok(ConversionOutcome::Converted(Box::new(ds)))
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Terms of the first category entry with the given type.
fn category_terms(value: &Value, category_type: &str) -> Vec<String> {
    let Some(categories) = value.get("categories").and_then(Value::as_array) else {
        return Vec::new();
    };
    for category in categories {
        if category.get("type").and_then(Value::as_str) == Some(category_type) {
            return category
                .get("terms")
                .and_then(Value::as_array)
                .map(|terms| {
                    terms
                        .iter()
                        .filter_map(|t| t.get("label").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
        }
    }
    Vec::new()
}
