//! Errors for the download pipeline.

use thiserror::Error;

use crate::marketplace::MarketplaceError;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Output path escapes the target directory: {0}")]
    PathTraversal(String),

    #[error("Permission denied writing to {0}")]
    PermissionDenied(String),

    #[error("Destination already exists: {0}")]
    DestinationExists(String),

    #[error("Marketplace error: {0}")]
    Marketplace(#[source] MarketplaceError),

    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Downloaded file is empty")]
    EmptyFile,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Transfer corruption (truncation, digest or size mismatch, empty
    /// body) is retried; validation failures and local I/O errors are
    /// definitive. Marketplace errors carry their own verdict.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Marketplace(e) => e.is_retryable(),
            Self::SizeMismatch { .. } | Self::DigestMismatch { .. } | Self::EmptyFile => true,
            Self::InvalidIdentifier(_)
            | Self::PathTraversal(_)
            | Self::PermissionDenied(_)
            | Self::DestinationExists(_)
            | Self::Io(_) => false,
        }
    }
}

impl From<MarketplaceError> for DownloadError {
    fn from(e: MarketplaceError) -> Self {
        Self::Marketplace(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(DownloadError::Marketplace(MarketplaceError::Timeout).is_retryable());
        assert!(DownloadError::SizeMismatch {
            expected: 100,
            actual: 50
        }
        .is_retryable());
        assert!(DownloadError::DigestMismatch {
            expected: "aa".into(),
            actual: "bb".into()
        }
        .is_retryable());
        assert!(DownloadError::EmptyFile.is_retryable());
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!DownloadError::InvalidIdentifier("a/b".into()).is_retryable());
        assert!(!DownloadError::PathTraversal("../x".into()).is_retryable());
        assert!(!DownloadError::PermissionDenied("/root".into()).is_retryable());
        assert!(!DownloadError::DestinationExists("x.vsix".into()).is_retryable());
        assert!(
            !DownloadError::Marketplace(MarketplaceError::NotFound("gone".into())).is_retryable()
        );
        assert!(!DownloadError::Io(std::io::Error::other("disk full")).is_retryable());
    }
}
