//! `pagedl replay <file>` – feed recorded producer messages through the handler.

use anyhow::{bail, Context, Result};
use pagedl_core::config::PagedlConfig;
use pagedl_core::fs_host::FsHostOptions;
use pagedl_core::message::{DownloadMessage, SenderContext};
use serde::Deserialize;
use std::path::Path;

use super::{describe, local_service};

/// One recorded message with the tab that sent it.
#[derive(Debug, Deserialize)]
pub struct ReplayEntry {
    pub message: DownloadMessage,
    pub sender: SenderContext,
}

pub fn parse_entries(data: &str) -> Result<Vec<ReplayEntry>> {
    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid entry", i + 1))
        })
        .collect()
}

pub async fn run_replay(cfg: &PagedlConfig, dir: &Path, path: &Path) -> Result<()> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let entries = parse_entries(&data)?;
    let local = local_service(cfg, dir, FsHostOptions::default());

    for (i, entry) in entries.into_iter().enumerate() {
        let tab_id = entry.sender.tab_id;
        let reply = local.service.on_message(entry.message, entry.sender).await;
        println!("#{} tab {}: {}", i + 1, tab_id, describe(reply));
    }

    if local.service.pending_transfers() > 0 {
        tracing::warn!(
            tabs = local.service.pending_transfers(),
            "replay ended with unfinished chunked transfers"
        );
    }
    let failures = local.failures.count();
    if failures > 0 {
        bail!("{failures} replayed save(s) failed");
    }
    Ok(())
}
