//! CSW 2.0.2 catalog client.
//!
//! Talks to a GeoNetwork CSW endpoint with POSTed XML requests: paginated
//! `GetRecords` searches for brief records, then `GetRecordById` for the
//! full ISO 19139 document of each hit. The full document is handed back
//! as a standalone `gmd:MD_Metadata` document, which the converter parses.

use std::time::Duration;

use chrono::NaiveDate;
use geoharvest_core::config::{CswConfig, HttpConfig};
use geoharvest_core::error::AppError;
use geoharvest_core::traits::{DocumentBrief, DocumentCatalog};
use reqwest::Client;
use tokio::time::sleep;
use tracing::debug;

const CSW_NS: &str = "http://www.opengis.net/cat/csw/2.0.2";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const GMD_NS: &str = "http://www.isotc211.org/2005/gmd";

/// Brief records requested per GetRecords page.
const PAGE_SIZE: u32 = 10;

/// HTTP client for a CSW 2.0.2 catalog endpoint.
#[derive(Clone)]
pub struct CswClient {
    client: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    delay: Duration,
}

impl CswClient {
    pub fn new(config: &CswConfig, http: &HttpConfig, delay: Duration) -> Result<Self, AppError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| AppError::ConfigError("csw.url is not configured".to_string()))?;

        let client = Client::builder()
            .user_agent(concat!("geoharvest/", env!("CARGO_PKG_VERSION")))
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            url,
            username: config.username.clone(),
            password: config.password.clone(),
            delay,
        })
    }

    async fn post_xml(&self, body: String) -> Result<String, AppError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/xml")
            .body(body);

        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        sleep(self.delay).await;

        if !response.status().is_success() {
            return Err(AppError::ClientError(format!(
                "HTTP {} from {}",
                response.status().as_u16(),
                self.url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))
    }
}

/// Builds one paginated GetRecords request for brief records, optionally
/// constrained to records modified on or after a date.
fn get_records_request(start_position: u32, modified_since: Option<NaiveDate>) -> String {
    let constraint = match modified_since {
        Some(date) => format!(
            r#"<csw:Constraint version="1.1.0"><ogc:Filter><ogc:PropertyIsGreaterThanOrEqualTo><ogc:PropertyName>Modified</ogc:PropertyName><ogc:Literal>{}</ogc:Literal></ogc:PropertyIsGreaterThanOrEqualTo></ogc:Filter></csw:Constraint>"#,
            date.format("%Y-%m-%d")
        ),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecords xmlns:csw="{CSW_NS}" xmlns:ogc="http://www.opengis.net/ogc" service="CSW" version="2.0.2" resultType="results" startPosition="{start_position}" maxRecords="{PAGE_SIZE}">
  <csw:Query typeNames="csw:Record">
    <csw:ElementSetName>brief</csw:ElementSetName>
    {constraint}
  </csw:Query>
</csw:GetRecords>"#
    )
}

/// Builds a GetRecordById request for the full ISO 19139 document.
fn get_record_by_id_request(identifier: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordById xmlns:csw="{CSW_NS}" service="CSW" version="2.0.2" outputSchema="{GMD_NS}">
  <csw:Id>{identifier}</csw:Id>
  <csw:ElementSetName>full</csw:ElementSetName>
</csw:GetRecordById>"#
    )
}

/// One parsed GetRecords response page.
struct SearchPage {
    briefs: Vec<DocumentBrief>,
    returned: u32,
    /// Position of the next record, 0 when the result set is exhausted.
    next_record: u32,
}

fn parse_search_response(xml: &str) -> Result<SearchPage, AppError> {
    let doc = roxmltree::Document::parse(xml)?;

    let results = doc
        .descendants()
        .find(|n| n.has_tag_name((CSW_NS, "SearchResults")))
        .ok_or_else(|| {
            AppError::XmlError("GetRecords response without SearchResults".to_string())
        })?;

    let attr_u32 = |name: &str| {
        results
            .attribute(name)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0)
    };

    let briefs = results
        .children()
        .filter(|n| n.has_tag_name((CSW_NS, "BriefRecord")))
        .filter_map(|record| {
            let identifier = record
                .children()
                .find(|n| n.has_tag_name((DC_NS, "identifier")))
                .and_then(|n| n.text())?;
            let title = record
                .children()
                .find(|n| n.has_tag_name((DC_NS, "title")))
                .and_then(|n| n.text())
                .map(str::to_string);
            Some(DocumentBrief {
                identifier: identifier.to_string(),
                title,
            })
        })
        .collect();

    Ok(SearchPage {
        briefs,
        returned: attr_u32("numberOfRecordsReturned"),
        next_record: attr_u32("nextRecord"),
    })
}

/// Cuts the `gmd:MD_Metadata` document out of a GetRecordById response.
/// Servers declare the namespaces on the response envelope, outside the
/// sliced element, so every in-scope namespace missing from the element's
/// own start tag is re-declared on it. The stored payload must parse as a
/// standalone document.
/// Returns None when the response carries no metadata document.
fn extract_metadata_document(xml: &str) -> Result<Option<String>, AppError> {
    let doc = roxmltree::Document::parse(xml)?;

    let Some(node) = doc
        .descendants()
        .find(|n| n.has_tag_name((GMD_NS, "MD_Metadata")))
    else {
        return Ok(None);
    };

    let slice = &xml[node.range()];
    let name_end = slice[1..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .map(|i| i + 1)
        .unwrap_or(slice.len());
    let start_tag = &slice[..slice.find('>').unwrap_or(slice.len())];

    let mut declarations = String::new();
    for ns in node.namespaces() {
        let attribute = match ns.name() {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        // A declaration already on the start tag must not be duplicated.
        if !start_tag.contains(&format!("{attribute}=")) {
            declarations.push_str(&format!(" {}=\"{}\"", attribute, ns.uri()));
        }
    }

    Ok(Some(format!(
        "{}{}{}",
        &slice[..name_end],
        declarations,
        &slice[name_end..]
    )))
}

// =============================================================================
// Trait Implementation: DocumentCatalog
// =============================================================================

impl DocumentCatalog for CswClient {
    async fn list_identifiers(
        &self,
        modified_since: Option<NaiveDate>,
    ) -> Result<Vec<DocumentBrief>, AppError> {
        let mut briefs = Vec::new();
        let mut start_position = 1u32;

        loop {
            let request = get_records_request(start_position, modified_since);
            let response = self.post_xml(request).await?;
            let page = parse_search_response(&response)?;

            debug!(
                "GetRecords returned {} briefs from position {}",
                page.returned, start_position
            );

            if page.returned == 0 {
                break;
            }
            briefs.extend(page.briefs);

            if page.next_record == 0 {
                break;
            }
            start_position = page.next_record;
        }

        Ok(briefs)
    }

    async fn fetch_document(&self, identifier: &str) -> Result<Option<String>, AppError> {
        let response = self.post_xml(get_record_by_id_request(identifier)).await?;
        extract_metadata_document(&response)
    }
}
