//! Clipboard path: copy a page as HTML and plain text.
//!
//! The host clipboard only accepts data from inside a copy action, so the
//! writer registers a one-shot copy handler, triggers the action and removes
//! the handler again whether or not it ran.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const HTML_FORMAT: &str = "text/html";
pub const PLAIN_TEXT_FORMAT: &str = "text/plain";

/// Clipboard write buffer keyed by MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardData(BTreeMap<String, String>);

impl ClipboardData {
    pub fn set_data(&mut self, format: &str, data: impl Into<String>) {
        self.0.insert(format.to_string(), data.into());
    }

    pub fn get_data(&self, format: &str) -> Option<&str> {
        self.0.get(format).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A copy action in progress, as seen by copy handlers.
#[derive(Debug, Default)]
pub struct CopyEvent {
    pub clipboard_data: ClipboardData,
    default_prevented: bool,
}

impl CopyEvent {
    /// Keep the host from replacing `clipboard_data` with its own selection.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub type CopyHandler = Box<dyn FnMut(&mut CopyEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerToken(u64);

/// Host clipboard: handler registration and a programmatic copy trigger.
pub trait ClipboardHost: Send + Sync {
    fn add_copy_handler(&self, handler: CopyHandler) -> HandlerToken;
    fn remove_copy_handler(&self, token: HandlerToken);
    /// Runs a copy action, dispatching it to the registered handlers.
    fn exec_copy(&self);
}

/// Removes a registered handler when dropped.
struct HandlerGuard<'a> {
    host: &'a dyn ClipboardHost,
    token: HandlerToken,
}

impl Drop for HandlerGuard<'_> {
    fn drop(&mut self) {
        self.host.remove_copy_handler(self.token);
    }
}

pub struct ClipboardWriter {
    host: Arc<dyn ClipboardHost>,
}

impl ClipboardWriter {
    pub fn new(host: Arc<dyn ClipboardHost>) -> Self {
        Self { host }
    }

    /// Put `payload` on the clipboard as both HTML and plain text.
    pub fn write(&self, payload: &str) {
        let payload = payload.to_string();
        let bytes = payload.len();
        let token = self.host.add_copy_handler(Box::new(move |event: &mut CopyEvent| {
            event.clipboard_data.set_data(HTML_FORMAT, payload.as_str());
            event.clipboard_data.set_data(PLAIN_TEXT_FORMAT, payload.as_str());
            event.prevent_default();
        }));
        let _guard = HandlerGuard {
            host: self.host.as_ref(),
            token,
        };
        self.host.exec_copy();
        tracing::info!(bytes, "page copied to clipboard");
    }
}

/// In-process clipboard. Copy actions with no handler that prevents the
/// default copy an empty selection.
#[derive(Default)]
pub struct MemoryClipboard {
    next_token: AtomicU64,
    handlers: Mutex<Vec<(HandlerToken, CopyHandler)>>,
    contents: Mutex<ClipboardData>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> ClipboardData {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ClipboardHost for MemoryClipboard {
    fn add_copy_handler(&self, handler: CopyHandler) -> HandlerToken {
        let token = HandlerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((token, handler));
        token
    }

    fn remove_copy_handler(&self, token: HandlerToken) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(t, _)| *t != token);
    }

    fn exec_copy(&self) {
        let mut event = CopyEvent::default();
        for (_, handler) in self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_mut()
        {
            handler(&mut event);
        }
        let data = if event.is_default_prevented() {
            event.clipboard_data
        } else {
            ClipboardData::default()
        };
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = data;
    }
}
