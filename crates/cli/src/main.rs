mod progress;
mod prompt;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vsixget_core::{
    backoff_delay, load_config, validate_config, Config, Confirmation, DownloadError,
    DownloadManager, DownloadRequest, ExtensionRecord, GalleryClient, MarketplaceClient,
    MarketplaceError, Prompt, RelevanceScorer, RetryConfig, SearchRequest, SelectionController,
    SelectionOutcome,
};

use progress::spawn_progress_reporter;
use prompt::ConsolePrompt;

/// Progress channel capacity. Updates are dropped, not queued, when the
/// reporter falls behind.
const PROGRESS_BUFFER_SIZE: usize = 32;

#[derive(Parser)]
#[command(
    name = "vsixget",
    version,
    about = "Search the VS Code marketplace and download extension packages"
)]
struct Cli {
    /// Search query (extension name or publisher.extension identifier)
    query: Option<String>,

    /// Directory to save the package into
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip prompts: pick the top-ranked result and overwrite existing files
    #[arg(short = 'y', long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(long, env = "VSIXGET_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = resolve_config(args.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let interactive = !args.yes && std::io::stdin().is_terminal();
    let mut prompt = ConsolePrompt;

    let query = match args.query {
        Some(query) => query,
        None if interactive => {
            prompt.display("Search query: ");
            match prompt.read_line()? {
                Some(line) if !line.trim().is_empty() => line.trim().to_string(),
                _ => {
                    println!("Cancelled.");
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
        None => bail!("No search query given (pass one as an argument, or run interactively)"),
    };

    let client: Arc<dyn MarketplaceClient> = Arc::new(
        GalleryClient::new(config.marketplace.clone())
            .context("Failed to create marketplace client")?,
    );

    info!("Searching marketplace for \"{}\"", query);
    let mut request = SearchRequest::new(query.clone());
    request.limit = Some(config.marketplace.page_size);
    let records = search_with_retry(client.as_ref(), &request, &config.retry)
        .await
        .map_err(|e| anyhow::anyhow!("{}", describe_marketplace_error(&e)))?;
    debug!(results = records.len(), "Search returned");

    let ranked = RelevanceScorer::new().rank(&query, &records);

    let controller = SelectionController::new(interactive);
    let selected = match controller.select(&ranked, &mut prompt)? {
        SelectionOutcome::Selected(candidate) => candidate,
        SelectionOutcome::NoMatch => {
            println!("No extensions found for \"{}\".", query);
            return Ok(ExitCode::FAILURE);
        }
        SelectionOutcome::Cancelled => {
            println!("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    };

    let version = selected
        .record
        .latest_version()
        .with_context(|| {
            format!(
                "{} has no published versions",
                selected.record.identifier()
            )
        })?
        .to_string();

    let question = format!(
        "Download {} {}?",
        selected.record.identifier(),
        version
    );
    match controller.confirm(&question, &mut prompt)? {
        Confirmation::Yes => {}
        Confirmation::No | Confirmation::Cancelled => {
            println!("Cancelled.");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let manager = DownloadManager::new(
        Arc::clone(&client),
        config.download.clone(),
        config.retry.clone(),
    );
    let mut download_request = DownloadRequest::new(
        selected.record.publisher.clone(),
        selected.record.extension_id.clone(),
        version,
        args.output_dir.clone(),
    );

    let downloaded = match download(&manager, &download_request).await {
        Ok(file) => file,
        Err(DownloadError::DestinationExists(path)) => {
            let question = format!("{} already exists. Overwrite?", path);
            match controller.confirm(&question, &mut prompt)? {
                Confirmation::Yes => {
                    download_request.overwrite = true;
                    download(&manager, &download_request).await?
                }
                Confirmation::No | Confirmation::Cancelled => {
                    println!("Cancelled.");
                    return Ok(ExitCode::SUCCESS);
                }
            }
        }
        Err(e) => return Err(describe_download_error(e)),
    };

    println!(
        "Saved {} ({} bytes)",
        downloaded.path.display(),
        downloaded.size_bytes
    );
    println!("SHA-256: {}", downloaded.sha256);
    Ok(ExitCode::SUCCESS)
}

/// Load configuration. An explicit path must exist; otherwise
/// `vsixget.toml` in the working directory is used when present, and
/// built-in defaults when not.
fn resolve_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let default_path = std::path::Path::new("vsixget.toml");
            if default_path.exists() {
                load_config(default_path).context("Failed to load vsixget.toml")
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Search with the same bounded backoff the download manager applies.
/// Only errors the marketplace layer reports as transient are retried.
async fn search_with_retry(
    client: &dyn MarketplaceClient,
    request: &SearchRequest,
    retry: &RetryConfig,
) -> Result<Vec<ExtensionRecord>, MarketplaceError> {
    let mut attempt = 1u32;
    loop {
        match client.search(request).await {
            Ok(records) => return Ok(records),
            Err(e) if attempt < retry.max_attempts && e.is_retryable() => {
                let delay = backoff_delay(attempt, retry.backoff_base_ms, retry.backoff_cap_ms);
                warn!(
                    attempt,
                    max_attempts = retry.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Search failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn download(
    manager: &DownloadManager,
    request: &DownloadRequest,
) -> Result<vsixget_core::DownloadedFile, DownloadError> {
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
    let reporter = spawn_progress_reporter(rx);
    let result = manager.download(request, Some(tx)).await;
    let _ = reporter.await;
    result
}

fn describe_marketplace_error(e: &MarketplaceError) -> String {
    match e {
        MarketplaceError::ConnectionFailed(detail) => format!(
            "Could not reach the marketplace ({}). Check your network connection.",
            detail
        ),
        MarketplaceError::Timeout => {
            "The marketplace did not respond in time. Try again later.".to_string()
        }
        MarketplaceError::ApiError { status, message } => format!(
            "The marketplace rejected the request (HTTP {}): {}",
            status, message
        ),
        other => other.to_string(),
    }
}

fn describe_download_error(e: DownloadError) -> anyhow::Error {
    let hint = match &e {
        DownloadError::PermissionDenied(_) => {
            Some("Choose a writable output directory with --output-dir.")
        }
        DownloadError::PathTraversal(_) => {
            Some("The output directory must not contain \"..\" components.")
        }
        DownloadError::Marketplace(MarketplaceError::NotFound(_)) => {
            Some("The version may have been unpublished; try searching again.")
        }
        DownloadError::Marketplace(m) if m.is_retryable() => {
            Some("This looks transient; running the same command again may succeed.")
        }
        _ => None,
    };
    match hint {
        Some(hint) => anyhow::anyhow!("{}. {}", e, hint),
        None => anyhow::anyhow!(e),
    }
}
