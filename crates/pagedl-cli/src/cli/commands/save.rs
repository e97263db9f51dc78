//! `pagedl save <path>` – act as the capture producer for one HTML file.

use anyhow::{bail, Context, Result};
use pagedl_core::config::PagedlConfig;
use pagedl_core::fs_host::FsHostOptions;
use pagedl_core::message::{DownloadMessage, SenderContext, DOWNLOAD_METHOD_SUFFIX};
use pagedl_core::request::ConflictAction;
use pagedl_core::service::MessageReply;
use std::path::{Path, PathBuf};

use super::{describe, local_service, split_fragments};

#[derive(Debug, Clone)]
pub struct SaveArgs {
    pub path: PathBuf,
    pub filename: Option<String>,
    pub tab: i64,
    pub chunk_size: usize,
    pub incognito: bool,
    pub save_as: bool,
    pub conflict_action: Option<ConflictAction>,
    pub ascii_only: bool,
}

pub async fn run_save(cfg: &PagedlConfig, dir: &Path, args: SaveArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.path)
        .await
        .with_context(|| format!("read {}", args.path.display()))?;
    let filename = match args.filename.clone() {
        Some(name) => name,
        None => args
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("input path has no file name")?,
    };

    let options = FsHostOptions {
        ascii_only: args.ascii_only,
        allow_incognito: false,
    };
    let local = local_service(cfg, dir, options);
    let sender = SenderContext {
        tab_id: args.tab,
        incognito: args.incognito,
    };

    let fragments = split_fragments(&content, args.chunk_size);
    let truncated = fragments.len() > 1;
    let last = fragments.len() - 1;
    tracing::info!(
        path = %args.path.display(),
        fragments = fragments.len(),
        "saving page"
    );

    let mut reply = MessageReply::Pending;
    for (i, fragment) in fragments.into_iter().enumerate() {
        let message = DownloadMessage {
            method: format!("pagedl{DOWNLOAD_METHOD_SUFFIX}"),
            truncated,
            finished: i == last,
            content: fragment.to_string(),
            confirm_filename: args.save_as,
            filename_conflict_action: args.conflict_action,
            filename: filename.clone(),
            ..Default::default()
        };
        reply = local.service.on_message(message, sender).await;
    }

    println!("{}: {} ({})", args.path.display(), describe(reply), dir.display());
    if local.failures.count() > 0 {
        bail!("failed to save {}", args.path.display());
    }
    Ok(())
}
