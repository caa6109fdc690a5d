//! Download manager: validated, retried, verified package transfers.

use std::path::{Component, Path};
use std::sync::Arc;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{DownloadConfig, RetryConfig};
use crate::marketplace::{is_valid_identifier, MarketplaceClient};

use super::error::DownloadError;
use super::retry::{backoff_delay, should_retry};
use super::types::{DownloadProgress, DownloadRequest, DownloadedFile};

/// Downloads extension packages to the local filesystem.
pub struct DownloadManager {
    client: Arc<dyn MarketplaceClient>,
    download: DownloadConfig,
    retry: RetryConfig,
}

impl DownloadManager {
    pub fn new(
        client: Arc<dyn MarketplaceClient>,
        download: DownloadConfig,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client,
            download,
            retry,
        }
    }

    /// Download one package.
    ///
    /// Validates the request and destination before any network traffic,
    /// then transfers with bounded retries. The transfer streams into a
    /// staging file; the destination is only replaced by a rename after
    /// the download verifies, so a failure never leaves a partial file
    /// behind and never disturbs a pre-existing destination. Progress
    /// snapshots are sent through `progress` on a best-effort basis; a
    /// slow receiver drops updates rather than stalling the transfer.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadedFile, DownloadError> {
        validate_request(request)?;
        self.prepare_output_dir(&request.output_dir).await?;

        let target = request.target_path();
        if fs::try_exists(&target).await? && !request.overwrite {
            return Err(DownloadError::DestinationExists(
                target.display().to_string(),
            ));
        }

        info!(
            publisher = %request.publisher,
            extension = %request.extension_id,
            version = %request.version,
            target = %target.display(),
            "Starting download"
        );

        let staging = request.staging_path();
        let mut attempt = 1u32;
        loop {
            match self.transfer(request, &staging, progress.as_ref()).await {
                Ok(file) => {
                    return match self.commit(request, &staging, &target).await {
                        Ok(()) => {
                            info!(
                                path = %target.display(),
                                size_bytes = file.size_bytes,
                                "Download complete"
                            );
                            Ok(DownloadedFile {
                                path: target,
                                size_bytes: file.size_bytes,
                                sha256: file.sha256,
                            })
                        }
                        Err(e) => {
                            let _ = remove_if_exists(&staging).await;
                            Err(e)
                        }
                    };
                }
                Err(e) => {
                    // Failed attempts only ever touch the staging file; a
                    // pre-existing destination stays intact.
                    if let Err(cleanup_err) = remove_if_exists(&staging).await {
                        warn!(
                            path = %staging.display(),
                            error = %cleanup_err,
                            "Failed to clean up staging file"
                        );
                    }

                    if should_retry(attempt, self.retry.max_attempts, &e) {
                        let delay =
                            backoff_delay(attempt, self.retry.backoff_base_ms, self.retry.backoff_cap_ms);
                        warn!(
                            attempt,
                            max_attempts = self.retry.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Download attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Create the output directory and prove it is writable before any
    /// bytes are fetched.
    async fn prepare_output_dir(&self, output_dir: &Path) -> Result<(), DownloadError> {
        if output_dir
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(DownloadError::PathTraversal(
                output_dir.display().to_string(),
            ));
        }

        fs::create_dir_all(output_dir)
            .await
            .map_err(|e| map_permission(e, output_dir))?;

        let probe = output_dir.join(format!(".write-test-{}", std::process::id()));
        fs::write(&probe, b"")
            .await
            .map_err(|e| map_permission(e, output_dir))?;
        let _ = fs::remove_file(&probe).await;
        Ok(())
    }

    /// Move the verified staging file over the destination.
    async fn commit(
        &self,
        request: &DownloadRequest,
        staging: &Path,
        target: &Path,
    ) -> Result<(), DownloadError> {
        if request.overwrite {
            remove_if_exists(target).await?;
        }
        fs::rename(staging, target)
            .await
            .map_err(|e| map_permission(e, target))?;
        Ok(())
    }

    /// One transfer attempt: stream to the staging file, hash inline,
    /// verify on completion.
    async fn transfer(
        &self,
        request: &DownloadRequest,
        target: &Path,
        progress: Option<&mpsc::Sender<DownloadProgress>>,
    ) -> Result<DownloadedFile, DownloadError> {
        let mut package = self
            .client
            .fetch_package(&request.publisher, &request.extension_id, &request.version)
            .await?;

        let file = fs::File::create(target)
            .await
            .map_err(|e| map_permission(e, target))?;
        let mut writer = BufWriter::with_capacity(self.download.buffer_size, file);

        let mut hasher = Sha256::new();
        let mut bytes_downloaded = 0u64;
        let mut last_reported = 0u64;

        while let Some(chunk) = package.bytes.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            writer.write_all(&chunk).await?;
            bytes_downloaded += chunk.len() as u64;

            if let Some(sender) = progress {
                if bytes_downloaded - last_reported >= self.download.progress_interval_bytes {
                    last_reported = bytes_downloaded;
                    let _ = sender.try_send(DownloadProgress {
                        bytes_downloaded,
                        total_bytes: package.total_size,
                    });
                }
            }
        }

        writer.flush().await?;
        drop(writer);

        if bytes_downloaded == 0 {
            return Err(DownloadError::EmptyFile);
        }
        if let Some(expected) = package.total_size {
            if expected != bytes_downloaded {
                return Err(DownloadError::SizeMismatch {
                    expected,
                    actual: bytes_downloaded,
                });
            }
        }

        let sha256 = format!("{:x}", hasher.finalize());
        if let Some(expected) = &package.expected_sha256 {
            if !expected.eq_ignore_ascii_case(&sha256) {
                return Err(DownloadError::DigestMismatch {
                    expected: expected.clone(),
                    actual: sha256,
                });
            }
        }

        if let Some(sender) = progress {
            let _ = sender.try_send(DownloadProgress {
                bytes_downloaded,
                total_bytes: package.total_size,
            });
        }

        debug!(sha256 = %sha256, bytes = bytes_downloaded, "Transfer verified");

        Ok(DownloadedFile {
            path: target.to_path_buf(),
            size_bytes: bytes_downloaded,
            sha256,
        })
    }
}

fn validate_request(request: &DownloadRequest) -> Result<(), DownloadError> {
    for value in [
        &request.publisher,
        &request.extension_id,
        &request.version,
        &request.package_extension,
    ] {
        if !is_valid_identifier(value) {
            return Err(DownloadError::InvalidIdentifier(value.clone()));
        }
    }
    Ok(())
}

fn map_permission(e: std::io::Error, path: &Path) -> DownloadError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        DownloadError::PermissionDenied(path.display().to_string())
    } else {
        DownloadError::Io(e)
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
