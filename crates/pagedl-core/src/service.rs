//! Message handler: the entry point the page-capture producer talks to.
//!
//! Routes each download message through reassembly, then either the
//! clipboard or the submit-and-track chain. Failures are logged, reported
//! to the [`ErrorReporter`] for the sending tab, and swallowed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::aggregator::ChunkAggregator;
use crate::clipboard::{ClipboardHost, ClipboardWriter};
use crate::config::PagedlConfig;
use crate::error::DownloadError;
use crate::host::DownloadHost;
use crate::message::{DownloadMessage, SenderContext, TabId};
use crate::request::DownloadRequest;
use crate::resource::{DownloadSource, ResourceStore, TemporaryResource};
use crate::retry::RetryPolicy;
use crate::submitter::{DownloadSubmitter, Submission};
use crate::tracker::{CompletionTracker, DownloadOutcome};

/// Receives "operation failed" signals for a tab.
pub trait ErrorReporter: Send + Sync {
    fn on_error(&self, tab_id: TabId);
}

/// Reporter that only logs.
#[derive(Debug, Default)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn on_error(&self, tab_id: TabId) {
        tracing::error!(tab_id, "save failed");
    }
}

/// What handling one message led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageReply {
    /// Not a download message.
    Ignored,
    /// Fragment stored; more are expected.
    Pending,
    Completed,
    Cancelled,
    Copied,
    /// The save failed and was reported.
    Failed,
}

pub struct DownloadService {
    aggregator: Mutex<ChunkAggregator>,
    resources: Arc<dyn ResourceStore>,
    host: Arc<dyn DownloadHost>,
    submitter: DownloadSubmitter,
    clipboard: ClipboardWriter,
    reporter: Arc<dyn ErrorReporter>,
    completion_timeout: Option<Duration>,
}

impl DownloadService {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        host: Arc<dyn DownloadHost>,
        clipboard: Arc<dyn ClipboardHost>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            aggregator: Mutex::new(ChunkAggregator::new()),
            resources,
            submitter: DownloadSubmitter::new(Arc::clone(&host), RetryPolicy::default()),
            host,
            clipboard: ClipboardWriter::new(clipboard),
            reporter,
            completion_timeout: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.submitter = DownloadSubmitter::new(Arc::clone(&self.host), policy);
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Applies the retry and timeout settings from `cfg`.
    pub fn configured(self, cfg: &PagedlConfig) -> Self {
        self.with_retry_policy(cfg.retry_policy())
            .with_completion_timeout(cfg.completion_timeout())
    }

    /// Number of tabs with a chunked transfer in progress.
    pub fn pending_transfers(&self) -> usize {
        self.lock_aggregator().pending_transfers()
    }

    /// Handle one message from the producer.
    pub async fn on_message(&self, message: DownloadMessage, sender: SenderContext) -> MessageReply {
        if !message.is_download() {
            return MessageReply::Ignored;
        }
        let tab_id = sender.tab_id;
        let DownloadMessage {
            truncated,
            finished,
            content,
            save_to_clipboard,
            confirm_filename,
            filename_conflict_action,
            url,
            filename,
            ..
        } = message;

        let content = if truncated {
            let joined = self
                .lock_aggregator()
                .append_fragment(tab_id, content, finished);
            match joined {
                Some(payload) => payload,
                None => return MessageReply::Pending,
            }
        } else {
            content
        };

        if save_to_clipboard {
            self.clipboard.write(&content);
            return MessageReply::Copied;
        }

        let source = if truncated || !content.is_empty() {
            DownloadSource::Temporary(TemporaryResource::create(
                Arc::clone(&self.resources),
                content,
            ))
        } else {
            DownloadSource::External(url)
        };
        let request = DownloadRequest {
            url: source.url().to_string(),
            filename,
            save_as: confirm_filename,
            conflict_action: filename_conflict_action,
            incognito: sender.incognito,
        };

        match self.download_page(request, source).await {
            Ok(DownloadOutcome::Completed) => MessageReply::Completed,
            Ok(DownloadOutcome::Cancelled) => MessageReply::Cancelled,
            Err(e) => {
                tracing::error!(tab_id, error = %e, "download failed");
                self.reporter.on_error(tab_id);
                MessageReply::Failed
            }
        }
    }

    /// Submit `request` and wait for the download to finish. `source` is
    /// released exactly once before this returns.
    pub async fn download_page(
        &self,
        request: DownloadRequest,
        source: DownloadSource,
    ) -> Result<DownloadOutcome, DownloadError> {
        let events = self.host.subscribe();
        match self.submitter.submit(request, source).await? {
            Submission::Cancelled => Ok(DownloadOutcome::Cancelled),
            Submission::Started { id, source } => {
                CompletionTracker::new(id, events, source)
                    .wait_with_timeout(self.completion_timeout)
                    .await
            }
        }
    }

    fn lock_aggregator(&self) -> std::sync::MutexGuard<'_, ChunkAggregator> {
        self.aggregator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
