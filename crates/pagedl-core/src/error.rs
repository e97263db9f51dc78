//! Errors that leave a download chain.
//!
//! Recoverable host errors never appear here: the submitter fixes and
//! retries them. User cancellation is an outcome, not an error.

use std::time::Duration;

use crate::host::{DownloadId, HostError};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The host rejected the submission with an error no rule fixes.
    #[error("download rejected by host: {0}")]
    Host(#[from] HostError),

    /// The submission chain hit the attempt cap.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: HostError },

    /// The host interrupted an accepted download for a reason other than
    /// user cancellation.
    #[error("download {id} interrupted: {reason}")]
    Interrupted { id: DownloadId, reason: String },

    /// The host's event stream ended before the download finished.
    #[error("event stream closed while watching download {id}")]
    EventStreamClosed { id: DownloadId },

    /// The listener fell behind the host's event stream and may have
    /// missed this download's terminal event.
    #[error("lost {skipped} lifecycle events while watching download {id}")]
    EventsLagged { id: DownloadId, skipped: u64 },

    /// No terminal lifecycle event arrived in time.
    #[error("download {id} did not finish within {timeout:?}")]
    Timeout { id: DownloadId, timeout: Duration },
}
