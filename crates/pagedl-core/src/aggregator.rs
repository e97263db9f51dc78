//! Per-tab reassembly of chunked page content.
//!
//! Fragments are appended in arrival order; the sender is trusted to deliver
//! them in order and exactly once. Tabs never share state.

use std::collections::HashMap;

use crate::message::TabId;

/// Keyed store of in-progress transfers, one fragment list per tab.
#[derive(Debug, Default)]
pub struct ChunkAggregator {
    pending: HashMap<TabId, Vec<String>>,
}

impl ChunkAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment for `tab_id`.
    ///
    /// Returns the joined payload once the final fragment arrives, clearing
    /// the tab's pending state. Returns `None` while more data is needed.
    /// A final fragment with no predecessors yields that fragment alone.
    pub fn append_fragment(
        &mut self,
        tab_id: TabId,
        fragment: String,
        is_final: bool,
    ) -> Option<String> {
        let fragments = self.pending.entry(tab_id).or_default();
        fragments.push(fragment);
        if !is_final {
            tracing::debug!(tab_id, fragments = fragments.len(), "fragment buffered");
            return None;
        }
        let fragments = self.pending.remove(&tab_id).unwrap_or_default();
        let payload = fragments.concat();
        tracing::debug!(
            tab_id,
            fragments = fragments.len(),
            bytes = payload.len(),
            "transfer reassembled"
        );
        Some(payload)
    }

    /// Whether `tab_id` has a transfer in progress.
    pub fn is_pending(&self, tab_id: TabId) -> bool {
        self.pending.contains_key(&tab_id)
    }

    /// Number of fragments buffered for `tab_id`.
    pub fn fragment_count(&self, tab_id: TabId) -> usize {
        self.pending.get(&tab_id).map_or(0, Vec::len)
    }

    /// Number of tabs with a transfer in progress.
    pub fn pending_transfers(&self) -> usize {
        self.pending.len()
    }
}
