pub mod config;
pub mod fetcher;
pub mod marketplace;
pub mod scorer;
pub mod selector;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DownloadConfig,
    MarketplaceConfig, RetryConfig,
};
pub use fetcher::{
    backoff_delay, should_retry, DownloadError, DownloadManager, DownloadProgress, DownloadRequest,
    DownloadedFile,
};
pub use marketplace::{
    is_valid_identifier, ExtensionRecord, GalleryClient, MarketplaceClient, MarketplaceError,
    PackageStream, SearchRequest,
};
pub use scorer::{RelevanceScorer, ScoreBreakdown, ScoredCandidate, ScorerConfig};
pub use selector::{Confirmation, Prompt, SelectionController, SelectionOutcome};
