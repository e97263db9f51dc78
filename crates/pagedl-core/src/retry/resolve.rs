//! Map a host submission error to a rewritten request or a terminal outcome.

use crate::host::HostError;
use crate::request::DownloadRequest;

use super::classify::classify;

/// Decision for one failed submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Submit again with this request.
    Retry(DownloadRequest),
    /// The user cancelled; not an error.
    Cancelled,
    /// No fix applies; the error propagates.
    Failed(HostError),
}

/// Apply the first matching recovery rule.
///
/// Rules, in precedence order:
/// 1. invalid filename with a leading `.` → prefix `_`
/// 2. invalid filename containing `,` → replace commas with `_`
/// 3. invalid filename with non-ASCII characters → collapse each run to `_`
/// 4. unsupported private-browsing option while requested → clear it
/// 5. conflict prompt unsupported while a policy is set → keep only `save_as`
/// 6. cancelled → [`Resolution::Cancelled`]
/// 7. anything else → [`Resolution::Failed`]
pub fn resolve(error: &HostError, request: &DownloadRequest) -> Resolution {
    let signals = classify(&error.message);
    let filename = &request.filename;

    if signals.invalid_filename && filename.starts_with('.') {
        return Resolution::Retry(DownloadRequest {
            filename: format!("_{filename}"),
            ..request.clone()
        });
    }
    if signals.invalid_filename && filename.contains(',') {
        return Resolution::Retry(DownloadRequest {
            filename: filename.replace(',', "_"),
            ..request.clone()
        });
    }
    if signals.invalid_filename && !filename.is_ascii() {
        return Resolution::Retry(DownloadRequest {
            filename: replace_non_ascii_runs(filename),
            ..request.clone()
        });
    }
    if signals.incognito_option && request.incognito {
        return Resolution::Retry(DownloadRequest {
            incognito: false,
            ..request.clone()
        });
    }
    if signals.prompt_unsupported && request.conflict_action.is_some() {
        return Resolution::Retry(DownloadRequest {
            url: request.url.clone(),
            filename: request.filename.clone(),
            save_as: request.save_as,
            conflict_action: None,
            incognito: false,
        });
    }
    if signals.canceled {
        return Resolution::Cancelled;
    }
    Resolution::Failed(error.clone())
}

/// Replace every maximal run of non-ASCII characters with a single `_`.
pub fn replace_non_ascii_runs(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii() {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}
