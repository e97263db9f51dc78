//! CLI command handlers. Each command is in its own file.

mod copy;
mod replay;
mod save;

pub use copy::run_copy;
pub use replay::run_replay;
pub use save::{run_save, SaveArgs};

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pagedl_core::clipboard::MemoryClipboard;
use pagedl_core::config::PagedlConfig;
use pagedl_core::fs_host::{FsDownloadHost, FsHostOptions};
use pagedl_core::message::TabId;
use pagedl_core::resource::BlobStore;
use pagedl_core::service::{DownloadService, ErrorReporter, LogErrorReporter, MessageReply};

/// Counts failed saves so the process can exit non-zero.
#[derive(Debug, Default)]
pub struct FailureCounter(AtomicUsize);

impl FailureCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl ErrorReporter for FailureCounter {
    fn on_error(&self, tab_id: TabId) {
        LogErrorReporter.on_error(tab_id);
        self.0.fetch_add(1, Ordering::Relaxed);
        eprintln!("tab {tab_id}: save failed (see log for details)");
    }
}

/// Handler wired to the filesystem host, plus its observable collaborators.
pub struct LocalService {
    pub service: DownloadService,
    pub clipboard: Arc<MemoryClipboard>,
    pub failures: Arc<FailureCounter>,
}

pub fn local_service(cfg: &PagedlConfig, dir: &Path, options: FsHostOptions) -> LocalService {
    let blobs = Arc::new(BlobStore::new());
    let host = Arc::new(FsDownloadHost::new(
        dir,
        Arc::clone(&blobs),
        options,
        cfg.event_capacity,
    ));
    let clipboard = Arc::new(MemoryClipboard::new());
    let failures = Arc::new(FailureCounter::default());
    let service = DownloadService::new(blobs, host, clipboard.clone(), failures.clone())
        .configured(cfg);
    LocalService {
        service,
        clipboard,
        failures,
    }
}

pub fn describe(reply: MessageReply) -> &'static str {
    match reply {
        MessageReply::Ignored => "ignored",
        MessageReply::Pending => "fragment buffered",
        MessageReply::Completed => "saved",
        MessageReply::Cancelled => "cancelled",
        MessageReply::Copied => "copied to clipboard",
        MessageReply::Failed => "failed",
    }
}

/// Split `content` into fragments of at most `size` bytes, on char boundaries.
pub fn split_fragments(content: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut fragments = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end += 1;
        }
        let (head, tail) = rest.split_at(end);
        fragments.push(head);
        rest = tail;
    }
    if fragments.is_empty() {
        fragments.push("");
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_byte_size() {
        assert_eq!(split_fragments("abcdefg", 3), ["abc", "def", "g"]);
        assert_eq!(split_fragments("abc", 10), ["abc"]);
    }

    #[test]
    fn never_splits_inside_a_char() {
        let parts = split_fragments("aé€b", 2);
        assert_eq!(parts.concat(), "aé€b");
        assert!(parts.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn empty_content_is_one_empty_fragment() {
        assert_eq!(split_fragments("", 4), [""]);
    }
}
