//! Package download pipeline.
//!
//! Streams an extension package from the marketplace to disk with
//! destination validation, bounded retries, progress reporting, and
//! cleanup of partial files on failure.

mod download;
mod error;
mod retry;
mod types;

pub use download::DownloadManager;
pub use error::DownloadError;
pub use retry::{backoff_delay, should_retry};
pub use types::*;
