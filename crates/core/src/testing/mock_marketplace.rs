//! In-memory marketplace client for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::marketplace::{
    ExtensionRecord, MarketplaceClient, MarketplaceError, PackageStream, SearchRequest,
};

/// Chunk size the mock streams package bodies in.
const CHUNK_SIZE: usize = 1024;

/// A scriptable `MarketplaceClient`.
///
/// Records every call it receives and supports injecting failures both
/// up front (the fetch fails before any bytes flow) and mid-stream (the
/// body cuts off after a configured byte count).
#[derive(Default)]
pub struct MockMarketplaceClient {
    records: RwLock<Vec<ExtensionRecord>>,
    searches: RwLock<Vec<SearchRequest>>,
    next_search_error: Mutex<Option<MarketplaceError>>,
    package_bytes: RwLock<Vec<u8>>,
    fetch_failures: Mutex<Vec<MarketplaceError>>,
    fail_after: Mutex<Option<(u64, MarketplaceError)>>,
    total_size_override: Mutex<Option<Option<u64>>>,
    expected_sha256: RwLock<Option<String>>,
    fetch_count: AtomicUsize,
    fetches: RwLock<Vec<(String, String, String)>>,
}

impl MockMarketplaceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records returned by every search.
    pub fn set_records(&self, records: Vec<ExtensionRecord>) {
        *self.records.write().unwrap() = records;
    }

    /// Fail the next search with this error.
    pub fn set_next_search_error(&self, error: MarketplaceError) {
        *self.next_search_error.lock().unwrap() = Some(error);
    }

    /// Body returned by fetches.
    pub fn set_package_bytes(&self, bytes: Vec<u8>) {
        *self.package_bytes.write().unwrap() = bytes;
    }

    /// Queue an error for an upcoming fetch. Errors are consumed in the
    /// order they were pushed, one per fetch, before any bytes flow.
    pub fn push_fetch_failure(&self, error: MarketplaceError) {
        self.fetch_failures.lock().unwrap().push(error);
    }

    /// Make the next streaming fetch cut off with `error` once roughly
    /// `after_bytes` of the body has been delivered.
    pub fn fail_after_bytes(&self, after_bytes: u64, error: MarketplaceError) {
        *self.fail_after.lock().unwrap() = Some((after_bytes, error));
    }

    /// Override the reported total size. `Some(None)` hides the size.
    pub fn set_total_size_override(&self, total: Option<u64>) {
        *self.total_size_override.lock().unwrap() = Some(total);
    }

    pub fn set_expected_sha256(&self, digest: Option<String>) {
        *self.expected_sha256.write().unwrap() = digest;
    }

    /// How many fetches were attempted.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Queries this client has seen.
    pub fn recorded_searches(&self) -> Vec<SearchRequest> {
        self.searches.read().unwrap().clone()
    }

    /// `(publisher, extension_id, version)` triples of attempted fetches.
    pub fn recorded_fetches(&self) -> Vec<(String, String, String)> {
        self.fetches.read().unwrap().clone()
    }
}

#[async_trait]
impl MarketplaceClient for MockMarketplaceClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<ExtensionRecord>, MarketplaceError> {
        self.searches.write().unwrap().push(request.clone());
        if let Some(error) = self.next_search_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.records.read().unwrap().clone())
    }

    async fn fetch_package(
        &self,
        publisher: &str,
        extension_id: &str,
        version: &str,
    ) -> Result<PackageStream, MarketplaceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetches.write().unwrap().push((
            publisher.to_string(),
            extension_id.to_string(),
            version.to_string(),
        ));

        {
            let mut failures = self.fetch_failures.lock().unwrap();
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        let body = self.package_bytes.read().unwrap().clone();
        let total_size = self
            .total_size_override
            .lock()
            .unwrap()
            .unwrap_or(Some(body.len() as u64));
        let fail_after = self.fail_after.lock().unwrap().take();

        let mut chunks: Vec<Result<Bytes, MarketplaceError>> = Vec::new();
        match fail_after {
            Some((after_bytes, error)) => {
                let cutoff = (after_bytes as usize).min(body.len());
                for chunk in body[..cutoff].chunks(CHUNK_SIZE) {
                    chunks.push(Ok(Bytes::copy_from_slice(chunk)));
                }
                chunks.push(Err(error));
            }
            None => {
                for chunk in body.chunks(CHUNK_SIZE) {
                    chunks.push(Ok(Bytes::copy_from_slice(chunk)));
                }
            }
        }

        Ok(PackageStream {
            bytes: futures::stream::iter(chunks).boxed(),
            total_size,
            expected_sha256: self.expected_sha256.read().unwrap().clone(),
        })
    }
}

/// Canned records for tests.
pub mod fixtures {
    use crate::marketplace::ExtensionRecord;

    pub fn extension_record(
        publisher: &str,
        extension_id: &str,
        display_name: &str,
    ) -> ExtensionRecord {
        ExtensionRecord {
            publisher: publisher.to_string(),
            extension_id: extension_id.to_string(),
            display_name: display_name.to_string(),
            description: format!("{} description", display_name),
            install_count: 10_000,
            average_rating: 4.0,
            rating_count: 25,
            last_updated: Some("2025-05-01T00:00:00Z".to_string()),
            versions: vec!["1.2.3".to_string(), "1.2.2".to_string()],
        }
    }

    /// A high-signal record that should win most rankings.
    pub fn popular_record(
        publisher: &str,
        extension_id: &str,
        display_name: &str,
    ) -> ExtensionRecord {
        let mut record = extension_record(publisher, extension_id, display_name);
        record.install_count = 20_000_000;
        record.average_rating = 4.8;
        record.rating_count = 600;
        record
    }
}
