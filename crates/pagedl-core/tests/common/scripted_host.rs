//! Test doubles: a download host driven by a script and a resource store
//! that counts creations and revocations.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pagedl_core::host::{DownloadDelta, DownloadHost, DownloadId, HostError};
use pagedl_core::message::TabId;
use pagedl_core::request::DownloadDescriptor;
use pagedl_core::resource::{BlobStore, ResourceStore};
use pagedl_core::service::ErrorReporter;
use tokio::sync::broadcast;

/// One scripted answer to a submission.
pub enum Reply {
    /// Accept with this id and emit these lifecycle events right away.
    Accept(DownloadId, Vec<DownloadDelta>),
    Reject(&'static str),
}

pub struct ScriptedHost {
    replies: Mutex<VecDeque<Reply>>,
    pub seen: Mutex<Vec<DownloadDescriptor>>,
    events: broadcast::Sender<DownloadDelta>,
}

impl ScriptedHost {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            events: broadcast::channel(32).0,
        })
    }

    pub fn submissions(&self) -> Vec<DownloadDescriptor> {
        self.seen.lock().unwrap().clone()
    }

    pub fn emit(&self, delta: DownloadDelta) -> usize {
        self.events.send(delta).unwrap_or(0)
    }

    pub fn listeners(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl DownloadHost for ScriptedHost {
    async fn download(&self, descriptor: DownloadDescriptor) -> Result<DownloadId, HostError> {
        self.seen.lock().unwrap().push(descriptor);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Accept(id, deltas)) => {
                for delta in deltas {
                    let _ = self.events.send(delta);
                }
                Ok(id)
            }
            Some(Reply::Reject(message)) => Err(HostError::new(message)),
            None => Err(HostError::new("script exhausted")),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<DownloadDelta> {
        self.events.subscribe()
    }
}

#[derive(Default)]
pub struct CountingStore {
    pub inner: BlobStore,
    pub created: Mutex<Vec<String>>,
    pub revoked: Mutex<Vec<String>>,
}

impl CountingStore {
    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn revoked(&self) -> usize {
        self.revoked.lock().unwrap().len()
    }
}

impl ResourceStore for CountingStore {
    fn create(&self, bytes: Vec<u8>, mime: &str) -> String {
        let url = self.inner.create(bytes, mime);
        self.created.lock().unwrap().push(url.clone());
        url
    }

    fn revoke(&self, url: &str) {
        self.revoked.lock().unwrap().push(url.to_string());
        self.inner.revoke(url);
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub tabs: Mutex<Vec<TabId>>,
}

impl ErrorReporter for RecordingReporter {
    fn on_error(&self, tab_id: TabId) {
        self.tabs.lock().unwrap().push(tab_id);
    }
}
