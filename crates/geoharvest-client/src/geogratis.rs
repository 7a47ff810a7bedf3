//! Geogratis Atom/JSON feed client.
//!
//! The feed exposes the catalog as pages of product references with
//! `next` and `monitor` links, plus per-product JSON documents in either
//! locale. The feed hands out absolute page URLs, so after building the
//! first-page URL the client just follows links.

use std::time::Duration;

use geoharvest_core::config::{GeogratisConfig, HttpConfig};
use geoharvest_core::error::AppError;
use geoharvest_core::scan::ScanMode;
use geoharvest_core::traits::{CatalogFeed, FeedPage, FeedProduct};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::time::sleep;

/// Product collection path below the API root, shared by the feed and the
/// per-product documents.
const COLLECTION_PATH: &str = "nrcan-rncan/ess-sst";

/// Cutoff date used when monitoring starts with no saved resumption link.
const MONITOR_FALLBACK_DATE: &str = "2015-01-01";

/// HTTP client for the Geogratis product feed.
///
/// # Examples
///
/// ```no_run
/// use geoharvest_client::GeogratisClient;
/// use geoharvest_core::config::{GeogratisConfig, HttpConfig};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GeogratisConfig::default();
/// let client = GeogratisClient::new(&config, &HttpConfig::default(), Duration::from_millis(300))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeogratisClient {
    client: Client,
    base_url: Url,
    page_size: u32,
    delay: Duration,
}

impl GeogratisClient {
    pub fn new(
        config: &GeogratisConfig,
        http: &HttpConfig,
        delay: Duration,
    ) -> Result<Self, AppError> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|_| AppError::InvalidUrl(config.base_url.clone()))?;
        // A trailing slash keeps Url::join from eating the last path segment.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let client = Client::builder()
            .user_agent(concat!("geoharvest/", env!("CARGO_PKG_VERSION")))
            .timeout(http.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size,
            delay,
        })
    }

    fn feed_root(&self) -> String {
        format!("{}en/{}", self.base_url, COLLECTION_PATH)
    }

    async fn get_json(&self, url: &str) -> Result<Option<Value>, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        // Pause after each request so the catalog is not hammered.
        sleep(self.delay).await;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::ClientError(format!(
                "HTTP {} from {}",
                response.status().as_u16(),
                url
            )));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;
        Ok(Some(value))
    }
}

/// Extracts the page structure from a raw feed document.
fn parse_page(doc: &Value) -> FeedPage {
    let products = doc["products"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str())
                .map(|id| FeedProduct { id: id.to_string() })
                .collect()
        })
        .unwrap_or_default();

    let mut page = FeedPage {
        products,
        count: doc["count"].as_u64().unwrap_or(0),
        next: None,
        monitor: None,
    };

    if let Some(links) = doc["links"].as_array() {
        for link in links {
            let href = link["href"].as_str();
            match (link["rel"].as_str(), href) {
                (Some("next"), Some(href)) => page.next = Some(href.to_string()),
                (Some("monitor"), Some(href)) => page.monitor = Some(href.to_string()),
                _ => {}
            }
        }
    }

    page
}

// =============================================================================
// Trait Implementation: CatalogFeed
// =============================================================================

impl CatalogFeed for GeogratisClient {
    fn start_url(&self, mode: &ScanMode) -> String {
        let root = self.feed_root();
        let max = self.page_size;
        match mode {
            ScanMode::Full => format!("{root}?alt=json&max-results={max}"),
            ScanMode::Since(date) => {
                format!(
                    "{root}?edited-min={}&alt=json&max-results={max}",
                    date.format("%Y-%m-%d")
                )
            }
            ScanMode::StartIndex(index) => {
                format!("{root}/?start-index={index}&alt=json&max-results={max}")
            }
            ScanMode::Monitor => {
                format!("{root}?edited-min={MONITOR_FALLBACK_DATE}&alt=json&max-results={max}")
            }
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<FeedPage, AppError> {
        let doc = self
            .get_json(url)
            .await?
            .ok_or_else(|| AppError::ClientError(format!("Feed page not found: {url}")))?;
        Ok(parse_page(&doc))
    }

    async fn fetch_product(&self, uuid: &str, lang: &str) -> Result<Option<Value>, AppError> {
        let url = format!("{}{lang}/{COLLECTION_PATH}/{uuid}.json", self.base_url);
        self.get_json(&url).await
    }
}
