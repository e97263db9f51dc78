//! Download requests and the descriptor handed to the host.

use serde::{Deserialize, Serialize};

/// Host-side policy for filename collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    Uniquify,
    Overwrite,
    Prompt,
}

impl ConflictAction {
    /// Parses a policy name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "uniquify" => Some(ConflictAction::Uniquify),
            "overwrite" => Some(ConflictAction::Overwrite),
            "prompt" => Some(ConflictAction::Prompt),
            _ => None,
        }
    }
}

/// State of one submission attempt. Only the conflict resolver rewrites it
/// between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source URL (temporary resource or producer-supplied URL).
    pub url: String,
    pub filename: String,
    /// Ask the user where to save before writing.
    pub save_as: bool,
    pub conflict_action: Option<ConflictAction>,
    /// Request a private-browsing download.
    pub incognito: bool,
}

/// Descriptor accepted by the host submit primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadDescriptor {
    pub url: String,
    pub save_as: bool,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_action: Option<ConflictAction>,
    /// Present only when set; hosts without private-browsing support reject
    /// the key itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incognito: Option<bool>,
}

impl From<&DownloadRequest> for DownloadDescriptor {
    fn from(request: &DownloadRequest) -> Self {
        Self {
            url: request.url.clone(),
            save_as: request.save_as,
            filename: request.filename.clone(),
            conflict_action: request.conflict_action,
            incognito: request.incognito.then_some(true),
        }
    }
}
