//! Temporary, revocable resources standing in for files handed to the host.
//!
//! A [`TemporaryResource`] is created right before submission and released
//! exactly once: `release` consumes the handle, and dropping an unreleased
//! handle releases it, so early returns and panics cannot leak it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// MIME type of captured pages.
pub const HTML_MIME: &str = "text/html";

/// URL scheme of resources served by [`BlobStore`].
pub const BLOB_SCHEME: &str = "blob";

/// Host facility that turns bytes into an addressable, revocable URL.
pub trait ResourceStore: Send + Sync {
    /// Stores `bytes` and returns the URL addressing them.
    fn create(&self, bytes: Vec<u8>, mime: &str) -> String;

    /// Revokes a URL returned by [`ResourceStore::create`].
    fn revoke(&self, url: &str);
}

/// Bytes and MIME type behind a blob URL.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

/// In-memory [`ResourceStore`] handing out `blob:pagedl/<n>` URLs.
#[derive(Debug, Default)]
pub struct BlobStore {
    next_id: AtomicU64,
    blobs: Mutex<HashMap<String, Blob>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a live blob.
    pub fn get(&self, url: &str) -> Option<Blob> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Number of blobs created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ResourceStore for BlobStore {
    fn create(&self, bytes: Vec<u8>, mime: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("{BLOB_SCHEME}:pagedl/{id}");
        let blob = Blob {
            bytes: bytes.into(),
            mime: mime.to_string(),
        };
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone(), blob);
        url
    }

    fn revoke(&self, url: &str) {
        let removed = self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url);
        if removed.is_none() {
            tracing::warn!(url, "revoke of unknown blob");
        }
    }
}

/// Owned handle to a payload registered in a [`ResourceStore`].
pub struct TemporaryResource {
    url: String,
    store: Option<Arc<dyn ResourceStore>>,
}

impl TemporaryResource {
    /// Wraps an HTML payload as a revocable resource.
    pub fn create(store: Arc<dyn ResourceStore>, payload: String) -> Self {
        let url = store.create(payload.into_bytes(), HTML_MIME);
        tracing::debug!(url = %url, "temporary resource created");
        Self {
            url,
            store: Some(store),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Revokes the resource. Consumes the handle so it cannot be revoked twice.
    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if let Some(store) = self.store.take() {
            store.revoke(&self.url);
            tracing::debug!(url = %self.url, "temporary resource released");
        }
    }
}

impl Drop for TemporaryResource {
    fn drop(&mut self) {
        if self.store.is_some() {
            tracing::debug!(url = %self.url, "temporary resource dropped unreleased");
            self.revoke();
        }
    }
}

impl std::fmt::Debug for TemporaryResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryResource")
            .field("url", &self.url)
            .field("released", &self.store.is_none())
            .finish()
    }
}

/// What the host downloads from: a temporary resource this core owns, or a
/// URL supplied by the producer that needs no cleanup.
#[derive(Debug)]
pub enum DownloadSource {
    Temporary(TemporaryResource),
    External(String),
}

impl DownloadSource {
    pub fn url(&self) -> &str {
        match self {
            DownloadSource::Temporary(resource) => resource.url(),
            DownloadSource::External(url) => url,
        }
    }

    /// Releases the underlying resource, if any.
    pub fn release(self) {
        if let DownloadSource::Temporary(resource) = self {
            resource.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingStore {
        inner: BlobStore,
        revoked: Mutex<Vec<String>>,
    }

    impl ResourceStore for CountingStore {
        fn create(&self, bytes: Vec<u8>, mime: &str) -> String {
            self.inner.create(bytes, mime)
        }

        fn revoke(&self, url: &str) {
            self.revoked.lock().unwrap().push(url.to_string());
            self.inner.revoke(url);
        }
    }

    #[test]
    fn blob_store_serves_html_until_revoked() {
        let store = BlobStore::new();
        let url = store.create(b"<p>hi</p>".to_vec(), HTML_MIME);
        assert!(url.starts_with("blob:pagedl/"));
        let blob = store.get(&url).unwrap();
        assert_eq!(&*blob.bytes, b"<p>hi</p>");
        assert_eq!(blob.mime, "text/html");
        store.revoke(&url);
        assert!(store.get(&url).is_none());
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn urls_are_unique() {
        let store = BlobStore::new();
        let a = store.create(vec![], HTML_MIME);
        let b = store.create(vec![], HTML_MIME);
        assert_ne!(a, b);
        assert_eq!(store.live_count(), 2);
    }

    #[test]
    fn release_revokes_exactly_once() {
        let store = Arc::new(CountingStore::default());
        let resource = TemporaryResource::create(store.clone(), "x".into());
        let url = resource.url().to_string();
        resource.release();
        assert_eq!(*store.revoked.lock().unwrap(), vec![url]);
        assert_eq!(store.inner.live_count(), 0);
    }

    #[test]
    fn dropping_unreleased_handle_revokes() {
        let store = Arc::new(CountingStore::default());
        {
            let _resource = TemporaryResource::create(store.clone(), "x".into());
        }
        assert_eq!(store.revoked.lock().unwrap().len(), 1);
    }

    #[test]
    fn external_source_has_nothing_to_release() {
        let source = DownloadSource::External("https://example.com/a.html".into());
        assert_eq!(source.url(), "https://example.com/a.html");
        source.release();
    }
}
