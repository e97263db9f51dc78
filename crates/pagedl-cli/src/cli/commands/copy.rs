//! `pagedl copy <path>` – put an HTML file on the clipboard.

use anyhow::{bail, Context, Result};
use pagedl_core::clipboard::PLAIN_TEXT_FORMAT;
use pagedl_core::config::PagedlConfig;
use pagedl_core::fs_host::FsHostOptions;
use pagedl_core::message::{DownloadMessage, SenderContext, DOWNLOAD_METHOD_SUFFIX};
use pagedl_core::service::MessageReply;
use std::path::Path;

use super::local_service;

pub async fn run_copy(cfg: &PagedlConfig, dir: &Path, path: &Path, tab: i64) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let local = local_service(cfg, dir, FsHostOptions::default());

    let message = DownloadMessage {
        method: format!("pagedl{DOWNLOAD_METHOD_SUFFIX}"),
        content,
        save_to_clipboard: true,
        ..Default::default()
    };
    let sender = SenderContext {
        tab_id: tab,
        incognito: false,
    };
    let reply = local.service.on_message(message, sender).await;
    if reply != MessageReply::Copied {
        bail!("copy of {} did not reach the clipboard", path.display());
    }

    let contents = local.clipboard.contents();
    let copied = contents.get_data(PLAIN_TEXT_FORMAT).map_or(0, str::len);
    tracing::debug!(tab, copied, "clipboard written");
    println!("Copied {copied} bytes from {} to clipboard", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_file_without_touching_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.html");
        std::fs::write(&page, "<p>copy me</p>").unwrap();
        let out = dir.path().join("out");
        run_copy(&PagedlConfig::default(), &out, &page, 1).await.unwrap();
        assert!(!out.exists());
    }
}
