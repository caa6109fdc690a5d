//! Types for the download pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A request to download one extension package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub publisher: String,
    pub extension_id: String,
    pub version: String,
    /// Directory the package is written into.
    pub output_dir: PathBuf,
    /// File extension of the package, without the dot.
    #[serde(default = "default_package_extension")]
    pub package_extension: String,
    /// Replace an existing file at the destination.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_package_extension() -> String {
    "vsix".to_string()
}

impl DownloadRequest {
    pub fn new(
        publisher: impl Into<String>,
        extension_id: impl Into<String>,
        version: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            extension_id: extension_id.into(),
            version: version.into(),
            output_dir: output_dir.into(),
            package_extension: default_package_extension(),
            overwrite: false,
        }
    }

    /// Destination filename, `publisher.extension-version.ext`.
    pub fn target_filename(&self) -> String {
        format!(
            "{}.{}-{}.{}",
            self.publisher, self.extension_id, self.version, self.package_extension
        )
    }

    /// Full destination path under the output directory.
    pub fn target_path(&self) -> PathBuf {
        self.output_dir.join(self.target_filename())
    }

    /// Path the transfer streams into before the final rename. Kept next
    /// to the destination so the rename never crosses filesystems.
    pub fn staging_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.part", self.target_filename()))
    }
}

/// Progress snapshot emitted during a transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    /// Server-reported total, when known.
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    /// Completion as a fraction in [0, 1], when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.bytes_downloaded as f64 / total as f64).min(1.0))
            }
            _ => None,
        }
    }
}

/// A successfully downloaded and verified package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the file contents.
    pub sha256: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_filename() {
        let request = DownloadRequest::new("eamodio", "gitlens", "2025.2.2304", "/tmp/out");
        assert_eq!(request.target_filename(), "eamodio.gitlens-2025.2.2304.vsix");
        assert_eq!(
            request.target_path(),
            PathBuf::from("/tmp/out/eamodio.gitlens-2025.2.2304.vsix")
        );
        assert_eq!(
            request.staging_path(),
            PathBuf::from("/tmp/out/eamodio.gitlens-2025.2.2304.vsix.part")
        );
    }

    #[test]
    fn test_progress_fraction() {
        let progress = DownloadProgress {
            bytes_downloaded: 50,
            total_bytes: Some(200),
        };
        assert_eq!(progress.fraction(), Some(0.25));

        let unknown = DownloadProgress {
            bytes_downloaded: 50,
            total_bytes: None,
        };
        assert_eq!(unknown.fraction(), None);

        // Downloaded more than the advertised total; fraction stays capped
        let over = DownloadProgress {
            bytes_downloaded: 300,
            total_bytes: Some(200),
        };
        assert_eq!(over.fraction(), Some(1.0));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: DownloadRequest = serde_json::from_str(
            r#"{"publisher":"p","extension_id":"e","version":"1.0.0","output_dir":"."}"#,
        )
        .unwrap();
        assert_eq!(request.package_extension, "vsix");
        assert!(!request.overwrite);
    }
}
