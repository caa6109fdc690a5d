//! Visual Studio Marketplace gallery client.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::MarketplaceConfig;

use super::{ExtensionRecord, MarketplaceClient, MarketplaceError, PackageStream, SearchRequest};

/// Gallery query flags. The query API returns only what the flags ask for.
const FLAG_INCLUDE_VERSIONS: u32 = 0x1;
const FLAG_INCLUDE_FILES: u32 = 0x2;
const FLAG_INCLUDE_CATEGORIES: u32 = 0x4;
const FLAG_INCLUDE_VERSION_PROPERTIES: u32 = 0x10;
const FLAG_INCLUDE_INSTALLATION_TARGETS: u32 = 0x40;
const FLAG_INCLUDE_ASSET_URI: u32 = 0x80;
const FLAG_INCLUDE_STATISTICS: u32 = 0x100;
const FLAG_INCLUDE_LATEST_VERSION: u32 = 0x200;

/// Flags for a search query: latest version plus statistics.
const FLAGS_SEARCH: u32 = FLAG_INCLUDE_LATEST_VERSION | FLAG_INCLUDE_STATISTICS;

/// Flags for a detailed single-extension query.
#[allow(dead_code)]
const FLAGS_DETAILED: u32 = FLAG_INCLUDE_VERSIONS
    | FLAG_INCLUDE_FILES
    | FLAG_INCLUDE_CATEGORIES
    | FLAG_INCLUDE_VERSION_PROPERTIES
    | FLAG_INCLUDE_INSTALLATION_TARGETS
    | FLAG_INCLUDE_STATISTICS
    | FLAG_INCLUDE_ASSET_URI;

/// Filter type for the installation target criterion.
const FILTER_TYPE_TARGET: u32 = 8;
/// Filter type for the free-text search criterion.
const FILTER_TYPE_SEARCH_TEXT: u32 = 10;

const INSTALLATION_TARGET: &str = "Microsoft.VisualStudio.Code";

/// Some gallery frontends reject requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Marketplace gallery API client.
///
/// Holds two HTTP clients: a short-timeout one for metadata queries and a
/// long-timeout one for package transfers.
pub struct GalleryClient {
    search_client: Client,
    download_client: Client,
    config: MarketplaceConfig,
}

impl GalleryClient {
    /// Create a new gallery client with the given configuration.
    pub fn new(config: MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let search_client = Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs as u64))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketplaceError::ConnectionFailed(e.to_string()))?;

        let download_client = Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs as u64))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| MarketplaceError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            search_client,
            download_client,
            config,
        })
    }

    fn query_url(&self) -> String {
        format!(
            "{}/_apis/public/gallery/extensionquery",
            self.config.url.trim_end_matches('/')
        )
    }

    /// Build the package download URL for one extension version.
    fn package_url(&self, publisher: &str, extension_id: &str, version: &str) -> String {
        format!(
            "{}/_apis/public/gallery/publishers/{}/vsextensions/{}/{}/vspackage",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(publisher),
            urlencoding::encode(extension_id),
            urlencoding::encode(version),
        )
    }

    fn accept_header(&self) -> String {
        format!(
            "application/json; charset=utf-8; api-version={}",
            self.config.api_version
        )
    }
}

/// Build the gallery query payload for a search.
fn build_search_payload(query: &str, page_size: u32) -> serde_json::Value {
    json!({
        "filters": [{
            "criteria": [
                { "filterType": FILTER_TYPE_TARGET, "value": INSTALLATION_TARGET },
                { "filterType": FILTER_TYPE_SEARCH_TEXT, "value": query },
            ],
            "pageNumber": 1,
            "pageSize": page_size,
            "sortBy": 0,
            "sortOrder": 0,
        }],
        "assetTypes": [],
        "flags": FLAGS_SEARCH,
    })
}

/// Map a transport-level reqwest error into the marketplace taxonomy.
fn classify_transport_error(e: reqwest::Error) -> MarketplaceError {
    if e.is_timeout() {
        MarketplaceError::Timeout
    } else if e.is_decode() {
        MarketplaceError::MalformedResponse(e.to_string())
    } else {
        MarketplaceError::ConnectionFailed(e.to_string())
    }
}

/// Convert a parsed gallery response into extension records.
///
/// Records missing required fields are skipped with a warning rather than
/// failing the whole search.
fn records_from_response(response: GalleryResponse) -> Vec<ExtensionRecord> {
    let mut records = Vec::new();

    for page in response.results {
        for ext in page.extensions {
            let publisher = match ext.publisher.and_then(|p| p.publisherName) {
                Some(p) if !p.is_empty() => p,
                _ => {
                    warn!("Skipping result with missing publisher name");
                    continue;
                }
            };
            let extension_id = match ext.extensionName {
                Some(n) if !n.is_empty() => n,
                _ => {
                    warn!(publisher = %publisher, "Skipping result with missing extension name");
                    continue;
                }
            };

            let versions: Vec<String> = ext
                .versions
                .iter()
                .filter_map(|v| v.version.clone())
                .collect();
            if versions.is_empty() {
                warn!(
                    extension = %format!("{}.{}", publisher, extension_id),
                    "Skipping result with no versions"
                );
                continue;
            }

            let last_updated = ext
                .lastUpdated
                .or_else(|| ext.versions.first().and_then(|v| v.lastUpdated.clone()));

            let mut install_count = 0u64;
            let mut average_rating = 0.0f32;
            let mut rating_count = 0u64;
            for stat in &ext.statistics {
                match stat.statisticName.as_str() {
                    "install" => install_count = stat.value.max(0.0) as u64,
                    "averagerating" => average_rating = stat.value.clamp(0.0, 5.0) as f32,
                    "ratingcount" => rating_count = stat.value.max(0.0) as u64,
                    _ => {}
                }
            }

            records.push(ExtensionRecord {
                display_name: ext.displayName.unwrap_or_else(|| extension_id.clone()),
                description: ext.shortDescription.unwrap_or_default(),
                publisher,
                extension_id,
                install_count,
                average_rating,
                rating_count,
                last_updated,
                versions,
            });
        }
    }

    records
}

#[async_trait]
impl MarketplaceClient for GalleryClient {
    fn name(&self) -> &str {
        "gallery"
    }

    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ExtensionRecord>, MarketplaceError> {
        let page_size = request.limit.unwrap_or(self.config.page_size);
        let payload = build_search_payload(&request.query, page_size);

        debug!(query = %request.query, page_size = page_size, "Querying gallery");

        let response = self
            .search_client
            .post(self.query_url())
            .header("Accept", self.accept_header())
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let gallery_response: GalleryResponse = response
            .json()
            .await
            .map_err(|e| MarketplaceError::MalformedResponse(e.to_string()))?;

        let records = records_from_response(gallery_response);
        debug!(results = records.len(), "Gallery search complete");

        Ok(records)
    }

    async fn fetch_package(
        &self,
        publisher: &str,
        extension_id: &str,
        version: &str,
    ) -> Result<PackageStream, MarketplaceError> {
        let url = self.package_url(publisher, extension_id, version);
        debug!(url = %url, "Opening package transfer");

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketplaceError::NotFound(format!(
                "{}.{} version {}",
                publisher, extension_id, version
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let total_size = response.content_length();

        // The gallery does not publish a digest for vspackage responses,
        // so only the size is available for post-transfer verification.
        let bytes = response
            .bytes_stream()
            .map_err(classify_transport_error)
            .boxed();

        Ok(PackageStream {
            bytes,
            total_size,
            expected_sha256: None,
        })
    }
}

// Gallery API response types
#[derive(Debug, Deserialize)]
struct GalleryResponse {
    #[serde(default)]
    results: Vec<GalleryResultPage>,
}

#[derive(Debug, Deserialize)]
struct GalleryResultPage {
    #[serde(default)]
    extensions: Vec<GalleryExtension>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct GalleryExtension {
    publisher: Option<GalleryPublisher>,
    extensionName: Option<String>,
    displayName: Option<String>,
    shortDescription: Option<String>,
    lastUpdated: Option<String>,
    #[serde(default)]
    versions: Vec<GalleryVersion>,
    #[serde(default)]
    statistics: Vec<GalleryStatistic>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct GalleryPublisher {
    publisherName: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct GalleryVersion {
    version: Option<String>,
    lastUpdated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct GalleryStatistic {
    statisticName: String,
    value: f64,
}
