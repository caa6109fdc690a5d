//! Types for the marketplace client boundary.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Publisher and extension identifiers: a leading alphanumeric followed by
/// alphanumerics, dots, underscores or hyphens. Path separators are
/// excluded so identifiers are always safe as filename components.
static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("invalid identifier regex"));

/// Whether a string is a valid publisher/extension/version token.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

/// Query parameters for a marketplace search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text search query.
    pub query: String,
    /// Maximum results to request (default: the configured page size).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }
}

/// One raw search result from the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRecord {
    /// Publisher account name (e.g. "eamodio").
    pub publisher: String,
    /// Extension name within the publisher namespace (e.g. "gitlens").
    pub extension_id: String,
    /// Human-readable display name.
    pub display_name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Total install count.
    pub install_count: u64,
    /// Average rating on a 0.0-5.0 scale.
    pub average_rating: f32,
    /// Number of ratings behind the average.
    pub rating_count: u64,
    /// Raw last-updated timestamp as reported by the gallery.
    /// Format varies and parsing may fail; scoring tolerates both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Known version strings, newest first.
    pub versions: Vec<String>,
}

impl ExtensionRecord {
    /// Full identifier in `publisher.extension` form.
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.publisher, self.extension_id)
    }

    /// Newest known version, if any.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.first().map(|s| s.as_str())
    }
}

/// A package transfer handed out by the marketplace client.
///
/// The stream yields raw chunks of the package body. The caller owns the
/// underlying connection through the stream; dropping it releases the
/// connection.
pub struct PackageStream {
    /// Package body chunks.
    pub bytes: BoxStream<'static, Result<Bytes, MarketplaceError>>,
    /// Server-reported total size, when known.
    pub total_size: Option<u64>,
    /// Server-reported SHA-256 digest (lowercase hex), when known.
    pub expected_sha256: Option<String>,
}

impl std::fmt::Debug for PackageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageStream")
            .field("bytes", &"<stream>")
            .field("total_size", &self.total_size)
            .field("expected_sha256", &self.expected_sha256)
            .finish()
    }
}

/// Errors that can occur talking to the marketplace.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("Marketplace connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Marketplace request timed out")]
    Timeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed marketplace response: {0}")]
    MalformedResponse(String),

    #[error("Marketplace API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },
}

impl MarketplaceError {
    /// Whether a fresh attempt could plausibly succeed.
    /// Connection failures, timeouts and 5xx/429 responses are transient;
    /// not-found and malformed responses are definitive.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed(_) | Self::Timeout => true,
            Self::ApiError { status, .. } => *status == 429 || (500..600).contains(status),
            Self::NotFound(_) | Self::MalformedResponse(_) => false,
        }
    }
}

/// Trait for marketplace backends.
#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Search the marketplace for extensions matching the query.
    ///
    /// Zero results is a successful empty response, not an error.
    async fn search(&self, request: &SearchRequest)
        -> Result<Vec<ExtensionRecord>, MarketplaceError>;

    /// Open a byte stream for one extension package.
    async fn fetch_package(
        &self,
        publisher: &str,
        extension_id: &str,
        version: &str,
    ) -> Result<PackageStream, MarketplaceError>;
}
