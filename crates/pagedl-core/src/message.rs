//! Inbound messages from the page-capture producer.
//!
//! Field names follow the producer's JSON (camelCase). Only messages whose
//! `method` ends with [`DOWNLOAD_METHOD_SUFFIX`] are handled.

use serde::{Deserialize, Deserializer, Serialize};

use crate::request::ConflictAction;

/// Action name a message method must end with to be treated as a download.
pub const DOWNLOAD_METHOD_SUFFIX: &str = ".download";

/// Identifier of the browser tab that produced a message.
pub type TabId = i64;

/// One download message, possibly a single fragment of a chunked transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadMessage {
    pub method: String,
    /// True when the page is delivered in several fragments.
    pub truncated: bool,
    /// Marks the last fragment of a chunked transfer.
    pub finished: bool,
    pub content: String,
    pub save_to_clipboard: bool,
    pub confirm_filename: bool,
    /// Unknown policy names are dropped rather than rejecting the message.
    #[serde(deserialize_with = "lenient_conflict_action")]
    pub filename_conflict_action: Option<ConflictAction>,
    /// Download source used when the message carries no content.
    pub url: String,
    pub filename: String,
}

impl DownloadMessage {
    pub fn is_download(&self) -> bool {
        self.method.ends_with(DOWNLOAD_METHOD_SUFFIX)
    }
}

fn lenient_conflict_action<'de, D>(deserializer: D) -> Result<Option<ConflictAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(name) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let action = ConflictAction::parse(&name);
    if action.is_none() {
        tracing::warn!(name = %name, "ignoring unknown filename conflict action");
    }
    Ok(action)
}

/// Context of the tab that sent a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderContext {
    pub tab_id: TabId,
    /// Whether the tab is a private-browsing tab.
    #[serde(default)]
    pub incognito: bool,
}
