//! A download host that writes into a local directory.
//!
//! Serves `blob:` URLs from a shared [`BlobStore`] and `file:` URLs from
//! disk. Rejects requests with the same messages strict browser hosts use,
//! so the retry rules apply to it unchanged.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::host::{DownloadDelta, DownloadHost, DownloadId, DownloadState, HostError};
use crate::request::{ConflictAction, DownloadDescriptor};
use crate::resource::{BlobStore, BLOB_SCHEME};

pub const INVALID_FILENAME: &str = "Invalid filename";
pub const INCOGNITO_UNSUPPORTED: &str =
    r#"Type error for parameter options (Property "incognito" is unsupported)"#;
pub const PROMPT_UNSUPPORTED: &str = "conflictAction prompt not yet implemented";
/// Interrupt reason reported when writing the file fails.
pub const FILE_FAILED: &str = "FILE_FAILED";

#[derive(Debug, Clone, Copy, Default)]
pub struct FsHostOptions {
    /// Reject filenames containing non-ASCII characters.
    pub ascii_only: bool,
    /// Accept `incognito: true` in descriptors.
    pub allow_incognito: bool,
}

pub struct FsDownloadHost {
    dir: PathBuf,
    blobs: Arc<BlobStore>,
    options: FsHostOptions,
    next_id: AtomicU64,
    events: broadcast::Sender<DownloadDelta>,
    /// Uniquified targets picked but not yet written.
    reserved: Arc<Mutex<HashSet<PathBuf>>>,
}

/// A target path chosen for one download. Uniquified names stay reserved
/// until the write finishes so concurrent downloads cannot pick them.
struct Target {
    path: PathBuf,
    reserved: Option<Arc<Mutex<HashSet<PathBuf>>>>,
}

impl Target {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Target {
    fn drop(&mut self) {
        if let Some(reserved) = self.reserved.take() {
            reserved
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.path);
        }
    }
}

impl FsDownloadHost {
    pub fn new(
        dir: impl Into<PathBuf>,
        blobs: Arc<BlobStore>,
        options: FsHostOptions,
        event_capacity: usize,
    ) -> Self {
        let (events, _rx) = broadcast::channel(event_capacity.max(1));
        Self {
            dir: dir.into(),
            blobs,
            options,
            next_id: AtomicU64::new(1),
            events,
            reserved: Arc::default(),
        }
    }

    fn validate(&self, descriptor: &DownloadDescriptor) -> Result<(), HostError> {
        if descriptor.incognito == Some(true) && !self.options.allow_incognito {
            return Err(HostError::new(INCOGNITO_UNSUPPORTED));
        }
        if !is_valid_filename(&descriptor.filename, self.options.ascii_only) {
            return Err(HostError::new(INVALID_FILENAME));
        }
        if descriptor.conflict_action == Some(ConflictAction::Prompt) {
            return Err(HostError::new(PROMPT_UNSUPPORTED));
        }
        Ok(())
    }

    async fn fetch(&self, source: &str) -> Result<Vec<u8>, HostError> {
        let parsed = url::Url::parse(source)
            .map_err(|e| HostError::new(format!("Invalid URL {source}: {e}")))?;
        match parsed.scheme() {
            BLOB_SCHEME => self
                .blobs
                .get(source)
                .map(|blob| blob.bytes.to_vec())
                .ok_or_else(|| HostError::new(format!("Download failed: no blob at {source}"))),
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| HostError::new(format!("Invalid file URL {source}")))?;
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| HostError::new(format!("Download failed: {e}")))
            }
            other => Err(HostError::new(format!(
                "Download failed: unsupported URL scheme {other}"
            ))),
        }
    }

    async fn target(&self, filename: &str, action: Option<ConflictAction>) -> Target {
        let path = self.dir.join(filename);
        if action == Some(ConflictAction::Overwrite) {
            return Target {
                path,
                reserved: None,
            };
        }
        let mut n = 1u32;
        let mut candidate = path;
        loop {
            let exists = tokio::fs::try_exists(&candidate).await.unwrap_or(false);
            if !exists && self.reserve(&candidate) {
                return Target {
                    path: candidate,
                    reserved: Some(Arc::clone(&self.reserved)),
                };
            }
            candidate = self.dir.join(numbered_filename(filename, n));
            n += 1;
        }
    }

    fn reserve(&self, path: &Path) -> bool {
        self.reserved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf())
    }
}

#[async_trait]
impl DownloadHost for FsDownloadHost {
    async fn download(&self, descriptor: DownloadDescriptor) -> Result<DownloadId, HostError> {
        self.validate(&descriptor)?;
        if descriptor.save_as {
            tracing::debug!(filename = %descriptor.filename, "no save dialog available, saving directly");
        }
        let bytes = self.fetch(&descriptor.url).await?;
        let target = self
            .target(&descriptor.filename, descriptor.conflict_action)
            .await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let dir = self.dir.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            // A send error only means nobody is listening.
            let _ = events.send(DownloadDelta::state(id, DownloadState::InProgress));
            let written = async {
                tokio::fs::create_dir_all(&dir).await?;
                tokio::fs::write(target.path(), &bytes).await
            }
            .await;
            let delta = match written {
                Ok(()) => {
                    tracing::debug!(id, path = %target.path().display(), "download written");
                    DownloadDelta::state(id, DownloadState::Complete)
                }
                Err(e) => {
                    tracing::warn!(id, path = %target.path().display(), "download write failed: {}", e);
                    DownloadDelta::interrupted(id, FILE_FAILED)
                }
            };
            let _ = events.send(delta);
        });

        Ok(id)
    }

    fn subscribe(&self) -> broadcast::Receiver<DownloadDelta> {
        self.events.subscribe()
    }
}

fn is_valid_filename(name: &str, ascii_only: bool) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ',' || c.is_control())
        && (!ascii_only || name.is_ascii())
}

/// `page.html` → `page (n).html`.
fn numbered_filename(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{filename} ({n})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceStore, HTML_MIME};

    fn descriptor(url: &str, filename: &str) -> DownloadDescriptor {
        DownloadDescriptor {
            url: url.into(),
            save_as: false,
            filename: filename.into(),
            conflict_action: None,
            incognito: None,
        }
    }

    async fn wait_terminal(rx: &mut broadcast::Receiver<DownloadDelta>, id: DownloadId) -> DownloadDelta {
        loop {
            let delta = rx.recv().await.unwrap();
            let terminal = matches!(
                delta.state.as_ref().map(|s| s.current),
                Some(DownloadState::Complete | DownloadState::Interrupted)
            );
            if delta.id == id && terminal {
                return delta;
            }
        }
    }

    #[test]
    fn filename_rules() {
        assert!(is_valid_filename("page.html", false));
        assert!(is_valid_filename("café.html", false));
        assert!(!is_valid_filename("café.html", true));
        assert!(!is_valid_filename(".page.html", false));
        assert!(!is_valid_filename("a,b.html", false));
        assert!(!is_valid_filename("a/b.html", false));
        assert!(!is_valid_filename("", false));
    }

    #[test]
    fn numbered_names() {
        assert_eq!(numbered_filename("page.html", 1), "page (1).html");
        assert_eq!(numbered_filename("archive.tar.gz", 2), "archive.tar (2).gz");
        assert_eq!(numbered_filename("README", 3), "README (3)");
    }

    #[tokio::test]
    async fn writes_blob_and_reports_complete() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(BlobStore::new());
        let url = blobs.create(b"<html>saved</html>".to_vec(), HTML_MIME);
        let host = FsDownloadHost::new(dir.path(), blobs, FsHostOptions::default(), 16);
        let mut rx = host.subscribe();
        let id = host.download(descriptor(&url, "page.html")).await.unwrap();
        let delta = wait_terminal(&mut rx, id).await;
        assert_eq!(delta, DownloadDelta::state(id, DownloadState::Complete));
        let saved = std::fs::read_to_string(dir.path().join("page.html")).unwrap();
        assert_eq!(saved, "<html>saved</html>");
    }

    #[tokio::test]
    async fn uniquifies_existing_names_unless_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.html"), "old").unwrap();
        let blobs = Arc::new(BlobStore::new());
        let url = blobs.create(b"new".to_vec(), HTML_MIME);
        let host = FsDownloadHost::new(dir.path(), blobs, FsHostOptions::default(), 16);
        let mut rx = host.subscribe();

        let id = host.download(descriptor(&url, "page.html")).await.unwrap();
        wait_terminal(&mut rx, id).await;
        assert_eq!(std::fs::read_to_string(dir.path().join("page (1).html")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(dir.path().join("page.html")).unwrap(), "old");

        let mut overwrite = descriptor(&url, "page.html");
        overwrite.conflict_action = Some(ConflictAction::Overwrite);
        let id = host.download(overwrite).await.unwrap();
        wait_terminal(&mut rx, id).await;
        assert_eq!(std::fs::read_to_string(dir.path().join("page.html")).unwrap(), "new");
    }

    #[tokio::test]
    async fn back_to_back_uniquify_downloads_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(BlobStore::new());
        let first = blobs.create(b"first".to_vec(), HTML_MIME);
        let second = blobs.create(b"second".to_vec(), HTML_MIME);
        let host = FsDownloadHost::new(dir.path(), blobs, FsHostOptions::default(), 16);
        let mut rx = host.subscribe();

        let mut a = descriptor(&first, "page.html");
        a.conflict_action = Some(ConflictAction::Uniquify);
        let mut b = descriptor(&second, "page.html");
        b.conflict_action = Some(ConflictAction::Uniquify);
        let id_a = host.download(a).await.unwrap();
        let id_b = host.download(b).await.unwrap();

        let mut done = Vec::new();
        while done.len() < 2 {
            let delta = rx.recv().await.unwrap();
            if delta.state.as_ref().map(|s| s.current) == Some(DownloadState::Complete) {
                done.push(delta.id);
            }
        }
        done.sort_unstable();
        assert_eq!(done, [id_a, id_b]);

        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["page (1).html", "page.html"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("page.html")).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(dir.path().join("page (1).html")).unwrap(), "second");
        assert!(host.reserved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_like_a_strict_host() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(BlobStore::new());
        let url = blobs.create(b"x".to_vec(), HTML_MIME);
        let host = FsDownloadHost::new(dir.path(), blobs, FsHostOptions::default(), 16);

        let err = host.download(descriptor(&url, ".x.html")).await.unwrap_err();
        assert_eq!(err.message, INVALID_FILENAME);

        let mut private = descriptor(&url, "x.html");
        private.incognito = Some(true);
        assert_eq!(host.download(private).await.unwrap_err().message, INCOGNITO_UNSUPPORTED);

        let mut prompt = descriptor(&url, "x.html");
        prompt.conflict_action = Some(ConflictAction::Prompt);
        assert_eq!(host.download(prompt).await.unwrap_err().message, PROMPT_UNSUPPORTED);

        let err = host
            .download(descriptor("https://example.com/x.html", "x.html"))
            .await
            .unwrap_err();
        assert!(err.message.contains("unsupported URL scheme"));
    }

    #[tokio::test]
    async fn reads_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.html");
        std::fs::write(&src, "from disk").unwrap();
        let out = dir.path().join("out");
        let host = FsDownloadHost::new(&out, Arc::new(BlobStore::new()), FsHostOptions::default(), 16);
        let mut rx = host.subscribe();
        let url = url::Url::from_file_path(&src).unwrap();
        let id = host.download(descriptor(url.as_str(), "copy.html")).await.unwrap();
        wait_terminal(&mut rx, id).await;
        assert_eq!(std::fs::read_to_string(out.join("copy.html")).unwrap(), "from disk");
    }
}
