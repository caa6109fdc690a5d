//! End-to-end pipeline tests: search, rank, select, download.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use vsixget_core::testing::{fixtures, MockMarketplaceClient, ScriptedPrompt};
use vsixget_core::{
    DownloadConfig, DownloadError, DownloadManager, DownloadRequest, MarketplaceClient,
    MarketplaceError, RelevanceScorer, RetryConfig, SearchRequest, SelectionController,
    SelectionOutcome,
};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff_base_ms: 1,
        backoff_cap_ms: 5,
    }
}

#[tokio::test]
async fn test_full_pipeline_non_interactive() {
    let client = Arc::new(MockMarketplaceClient::new());
    client.set_records(vec![
        fixtures::extension_record("someauthor", "gitlens-helper", "GitLens Helper"),
        fixtures::popular_record("eamodio", "gitlens", "GitLens"),
    ]);
    client.set_package_bytes(b"vsix package body".to_vec());

    // Search
    let records = client.search(&SearchRequest::new("gitlens")).await.unwrap();
    assert_eq!(records.len(), 2);

    // Rank
    let ranked = RelevanceScorer::new().rank("gitlens", &records);
    assert_eq!(ranked[0].record.identifier(), "eamodio.gitlens");

    // Select (non-interactive takes the top candidate)
    let controller = SelectionController::new(false);
    let mut prompt = ScriptedPrompt::new(&[]);
    let selected = match controller.select(&ranked, &mut prompt).unwrap() {
        SelectionOutcome::Selected(c) => c,
        other => panic!("expected selection, got {:?}", other),
    };
    let version = selected.record.latest_version().unwrap().to_string();

    // Download
    let dir = TempDir::new().unwrap();
    let manager = DownloadManager::new(client.clone(), DownloadConfig::default(), fast_retry());
    let request = DownloadRequest::new(
        selected.record.publisher.clone(),
        selected.record.extension_id.clone(),
        version,
        dir.path(),
    );
    let file = manager.download(&request, None).await.unwrap();

    assert_eq!(file.path, dir.path().join("eamodio.gitlens-1.2.3.vsix"));
    assert_eq!(
        std::fs::read(&file.path).unwrap(),
        b"vsix package body".to_vec()
    );
    assert_eq!(
        file.sha256,
        format!("{:x}", Sha256::digest(b"vsix package body"))
    );
    assert_eq!(
        client.recorded_fetches(),
        vec![(
            "eamodio".to_string(),
            "gitlens".to_string(),
            "1.2.3".to_string()
        )]
    );
}

#[tokio::test]
async fn test_full_pipeline_interactive_choice() {
    let client = Arc::new(MockMarketplaceClient::new());
    client.set_records(vec![
        fixtures::popular_record("eamodio", "gitlens", "GitLens"),
        fixtures::extension_record("someauthor", "gitlens-helper", "GitLens Helper"),
    ]);

    let records = client.search(&SearchRequest::new("gitlens")).await.unwrap();
    let ranked = RelevanceScorer::new().rank("gitlens", &records);

    // Pick the second-ranked candidate
    let controller = SelectionController::new(true);
    let mut prompt = ScriptedPrompt::new(&["2"]);
    match controller.select(&ranked, &mut prompt).unwrap() {
        SelectionOutcome::Selected(c) => {
            assert_eq!(c.record.identifier(), "someauthor.gitlens-helper");
        }
        other => panic!("expected selection, got {:?}", other),
    }
    assert!(prompt.output().contains("GitLens Helper"));
}

#[tokio::test]
async fn test_empty_search_yields_no_match() {
    let client = Arc::new(MockMarketplaceClient::new());
    let records = client.search(&SearchRequest::new("nonexistent")).await.unwrap();
    assert!(records.is_empty());

    let ranked = RelevanceScorer::new().rank("nonexistent", &records);
    let controller = SelectionController::new(false);
    let mut prompt = ScriptedPrompt::new(&[]);
    assert!(matches!(
        controller.select(&ranked, &mut prompt).unwrap(),
        SelectionOutcome::NoMatch
    ));
}

#[tokio::test]
async fn test_midstream_failure_leaves_directory_clean() {
    let client = Arc::new(MockMarketplaceClient::new());
    client.set_package_bytes(vec![9u8; 100_000]);
    client.fail_after_bytes(10_000, MarketplaceError::NotFound("version yanked".into()));

    let dir = TempDir::new().unwrap();
    let manager = DownloadManager::new(client.clone(), DownloadConfig::default(), fast_retry());
    let request = DownloadRequest::new("pub", "ext", "1.0.0", dir.path());

    let err = manager.download(&request, None).await.unwrap_err();
    assert!(matches!(err, DownloadError::Marketplace(_)));

    // Nothing left behind, not even the partial file
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "directory not clean: {:?}", leftovers);
}

#[tokio::test]
async fn test_failed_download_preserves_existing_destination() {
    let client = Arc::new(MockMarketplaceClient::new());
    client.set_package_bytes(vec![3u8; 8192]);
    client.fail_after_bytes(2048, MarketplaceError::NotFound("version yanked".into()));

    let dir = TempDir::new().unwrap();
    let manager = DownloadManager::new(client.clone(), DownloadConfig::default(), fast_retry());
    let mut request = DownloadRequest::new("pub", "ext", "1.0.0", dir.path());
    request.overwrite = true;
    std::fs::write(request.target_path(), b"previous good download").unwrap();

    let err = manager.download(&request, None).await.unwrap_err();
    assert!(matches!(err, DownloadError::Marketplace(_)));

    // The confirmed-overwrite target is untouched until a verified
    // replacement exists, and the staging file is gone
    assert_eq!(
        std::fs::read(request.target_path()).unwrap(),
        b"previous good download"
    );
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["pub.ext-1.0.0.vsix".to_string()]);
}

#[tokio::test]
async fn test_transient_search_error_is_reported_retryable() {
    let client = Arc::new(MockMarketplaceClient::new());
    client.set_next_search_error(MarketplaceError::ApiError {
        status: 503,
        message: "unavailable".into(),
    });

    let err = client.search(&SearchRequest::new("x")).await.unwrap_err();
    assert!(err.is_retryable());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unwritable_directory_fails_before_fetch() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let readonly = dir.path().join("readonly");
    std::fs::create_dir(&readonly).unwrap();
    std::fs::set_permissions(&readonly, std::fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users bypass mode bits; nothing to assert in that case
    let probe = readonly.join("probe");
    if std::fs::write(&probe, b"").is_ok() {
        let _ = std::fs::remove_file(&probe);
        return;
    }

    let client = Arc::new(MockMarketplaceClient::new());
    client.set_package_bytes(b"body".to_vec());
    let manager = DownloadManager::new(client.clone(), DownloadConfig::default(), fast_retry());
    let request = DownloadRequest::new("pub", "ext", "1.0.0", &readonly);

    let err = manager.download(&request, None).await.unwrap_err();
    assert!(
        matches!(err, DownloadError::PermissionDenied(_)),
        "got {:?}",
        err
    );
    assert_eq!(client.fetch_count(), 0);

    // Restore so TempDir can clean up
    std::fs::set_permissions(&readonly, std::fs::Permissions::from_mode(0o755)).unwrap();
}
