//! Interface to the host download subsystem.
//!
//! The host accepts a [`DownloadDescriptor`] and later reports lifecycle
//! changes for the id it assigned on a broadcast event stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::request::DownloadDescriptor;

/// Identifier the host assigns to an accepted download.
pub type DownloadId = u64;

/// Interrupt reason the host reports when the user cancelled.
pub const USER_CANCELED: &str = "USER_CANCELED";

/// Error raised by the host submit primitive, carrying its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Lifecycle state of a host download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    InProgress,
    Complete,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    pub current: DownloadState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDelta {
    pub current: String,
}

/// One lifecycle change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadDelta {
    pub id: DownloadId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDelta>,
}

impl DownloadDelta {
    pub fn state(id: DownloadId, current: DownloadState) -> Self {
        Self {
            id,
            state: Some(StateDelta { current }),
            error: None,
        }
    }

    pub fn interrupted(id: DownloadId, reason: impl Into<String>) -> Self {
        Self {
            id,
            state: Some(StateDelta {
                current: DownloadState::Interrupted,
            }),
            error: Some(ErrorDelta {
                current: reason.into(),
            }),
        }
    }
}

/// Host download subsystem.
#[async_trait]
pub trait DownloadHost: Send + Sync {
    /// Submits a download; returns the assigned id or the host's error.
    async fn download(&self, descriptor: DownloadDescriptor) -> Result<DownloadId, HostError>;

    /// Registers a listener for lifecycle events. Dropping the receiver
    /// deregisters it.
    fn subscribe(&self) -> broadcast::Receiver<DownloadDelta>;
}
