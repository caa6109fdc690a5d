use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Marketplace gallery API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
    /// Gallery base URL
    #[serde(default = "default_gallery_url")]
    pub url: String,
    /// API version sent in the Accept header
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Timeout for metadata/search calls in seconds (default: 30)
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u32,
    /// Timeout for package transfers in seconds (default: 120).
    /// Must be long enough for large packages.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u32,
    /// How many search results to request per query
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            url: default_gallery_url(),
            api_version: default_api_version(),
            search_timeout_secs: default_search_timeout(),
            download_timeout_secs: default_download_timeout(),
            page_size: default_page_size(),
        }
    }
}

fn default_gallery_url() -> String {
    "https://marketplace.visualstudio.com".to_string()
}

fn default_api_version() -> String {
    "7.2-preview.1".to_string()
}

fn default_search_timeout() -> u32 {
    30
}

fn default_download_timeout() -> u32 {
    120
}

fn default_page_size() -> u32 {
    25
}

/// Download manager configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    /// Buffer size for the file writer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Emit a progress update roughly every this many bytes
    #[serde(default = "default_progress_interval")]
    pub progress_interval_bytes: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            progress_interval_bytes: default_progress_interval(),
        }
    }
}

fn default_buffer_size() -> usize {
    64 * 1024
}

fn default_progress_interval() -> u64 {
    1024 * 1024
}

/// Retry policy for transient network failures
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts per download, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    /// Upper bound on a single backoff delay in milliseconds
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_cap_ms: default_backoff_cap(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_backoff_cap() -> u64 {
    10_000
}
