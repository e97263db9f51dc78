//! Submit a request to the host, rewriting and resubmitting it while the
//! host's errors have a known fix.

use std::sync::Arc;

use crate::error::DownloadError;
use crate::host::{DownloadHost, DownloadId};
use crate::request::{DownloadDescriptor, DownloadRequest};
use crate::resource::DownloadSource;
use crate::retry::{self, Resolution, RetryPolicy};

/// Result of a submission chain that did not fail.
#[derive(Debug)]
pub enum Submission {
    /// The host accepted the download; ownership of the source passes on to
    /// whoever tracks it.
    Started {
        id: DownloadId,
        source: DownloadSource,
    },
    /// The user cancelled the save; the source is already released.
    Cancelled,
}

pub struct DownloadSubmitter {
    host: Arc<dyn DownloadHost>,
    policy: RetryPolicy,
}

impl DownloadSubmitter {
    pub fn new(host: Arc<dyn DownloadHost>, policy: RetryPolicy) -> Self {
        Self { host, policy }
    }

    /// Runs the submit loop. On any terminal path other than
    /// [`Submission::Started`] the source is released before returning.
    pub async fn submit(
        &self,
        mut request: DownloadRequest,
        source: DownloadSource,
    ) -> Result<Submission, DownloadError> {
        let mut attempt = 1u32;
        loop {
            tracing::debug!(
                attempt,
                filename = %request.filename,
                incognito = request.incognito,
                "submitting download"
            );
            let error = match self.host.download(DownloadDescriptor::from(&request)).await {
                Ok(id) => {
                    tracing::info!(id, filename = %request.filename, "download started");
                    return Ok(Submission::Started { id, source });
                }
                Err(e) => e,
            };

            match retry::resolve(&error, &request) {
                Resolution::Retry(next) => {
                    if !self.policy.allows_retry_after(attempt) {
                        source.release();
                        return Err(DownloadError::RetriesExhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }
                    tracing::warn!(
                        attempt,
                        error = %error,
                        from = %request.filename,
                        to = %next.filename,
                        "host rejected download, retrying with adjusted request"
                    );
                    request = next;
                    attempt += 1;
                }
                Resolution::Cancelled => {
                    tracing::info!(filename = %request.filename, "save cancelled by user");
                    source.release();
                    return Ok(Submission::Cancelled);
                }
                Resolution::Failed(error) => {
                    source.release();
                    return Err(DownloadError::Host(error));
                }
            }
        }
    }
}
