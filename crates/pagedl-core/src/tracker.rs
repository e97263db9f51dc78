//! Watch an accepted download until the host reports a terminal state.
//!
//! The tracker owns both the event subscription and the download source.
//! Waiting consumes it: whichever way the wait ends, the subscription is
//! dropped and the source released exactly once, and later events are never
//! looked at.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::error::DownloadError;
use crate::host::{DownloadDelta, DownloadId, DownloadState, USER_CANCELED};
use crate::resource::DownloadSource;

/// Terminal result of a download that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed,
    Cancelled,
}

/// Terminal transition out of the watching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Completed,
    /// Interrupted because the user cancelled.
    Cancelled,
    /// Interrupted for any other reason.
    Interrupted(String),
}

/// Decide whether `event` ends the watch over download `id`.
///
/// Events for other ids, events without a state change and non-terminal
/// states yield `None`.
pub fn transition(id: DownloadId, event: &DownloadDelta) -> Option<Transition> {
    if event.id != id {
        return None;
    }
    match event.state.as_ref()?.current {
        DownloadState::Complete => Some(Transition::Completed),
        DownloadState::Interrupted => {
            let reason = event.error.as_ref().map(|e| e.current.as_str());
            match reason {
                Some(USER_CANCELED) => Some(Transition::Cancelled),
                Some(reason) => Some(Transition::Interrupted(reason.to_string())),
                None => Some(Transition::Interrupted("interrupted".to_string())),
            }
        }
        DownloadState::InProgress => None,
    }
}

/// Watches one in-flight download.
#[derive(Debug)]
pub struct CompletionTracker {
    id: DownloadId,
    events: broadcast::Receiver<DownloadDelta>,
    source: DownloadSource,
}

impl CompletionTracker {
    /// `events` must have been subscribed before the download was submitted
    /// so no lifecycle event can be missed.
    pub fn new(
        id: DownloadId,
        events: broadcast::Receiver<DownloadDelta>,
        source: DownloadSource,
    ) -> Self {
        Self { id, events, source }
    }

    pub fn id(&self) -> DownloadId {
        self.id
    }

    /// Wait for a terminal state with no time limit.
    pub async fn wait(self) -> Result<DownloadOutcome, DownloadError> {
        self.wait_with_timeout(None).await
    }

    /// Wait for a terminal state, giving up after `timeout` if set.
    pub async fn wait_with_timeout(
        self,
        timeout: Option<Duration>,
    ) -> Result<DownloadOutcome, DownloadError> {
        let CompletionTracker {
            id,
            mut events,
            source,
        } = self;

        let watched = match timeout {
            Some(limit) => tokio::time::timeout(limit, next_transition(id, &mut events))
                .await
                .unwrap_or(Err(DownloadError::Timeout { id, timeout: limit })),
            None => next_transition(id, &mut events).await,
        };

        drop(events);
        source.release();

        match watched? {
            Transition::Completed => {
                tracing::info!(id, "download complete");
                Ok(DownloadOutcome::Completed)
            }
            Transition::Cancelled => {
                tracing::info!(id, "download cancelled by user");
                Ok(DownloadOutcome::Cancelled)
            }
            Transition::Interrupted(reason) => {
                tracing::warn!(id, reason = %reason, "download interrupted");
                Err(DownloadError::Interrupted { id, reason })
            }
        }
    }
}

async fn next_transition(
    id: DownloadId,
    events: &mut broadcast::Receiver<DownloadDelta>,
) -> Result<Transition, DownloadError> {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(t) = transition(id, &event) {
                    return Ok(t);
                }
                tracing::trace!(id, event_id = event.id, "ignoring lifecycle event");
            }
            // Skipped events may include ours; waiting on would never end.
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(id, skipped, "lifecycle listener lagged");
                return Err(DownloadError::EventsLagged { id, skipped });
            }
            Err(RecvError::Closed) => return Err(DownloadError::EventStreamClosed { id }),
        }
    }
}
