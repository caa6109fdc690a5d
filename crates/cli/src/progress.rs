//! Download progress reporting.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use vsixget_core::DownloadProgress;

const MIB: f64 = 1024.0 * 1024.0;

/// Consume progress snapshots and log them until the channel closes.
pub fn spawn_progress_reporter(mut rx: mpsc::Receiver<DownloadProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            info!("{}", format_progress(&progress));
        }
    })
}

fn format_progress(progress: &DownloadProgress) -> String {
    let downloaded = progress.bytes_downloaded as f64 / MIB;
    match (progress.total_bytes, progress.fraction()) {
        (Some(total), Some(fraction)) => format!(
            "Downloaded {:.1} MiB / {:.1} MiB ({:.0}%)",
            downloaded,
            total as f64 / MIB,
            fraction * 100.0
        ),
        _ => format!("Downloaded {:.1} MiB", downloaded),
    }
}
