//! CLI for pagedl.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagedl_core::config;
use pagedl_core::request::ConflictAction;
use std::path::PathBuf;

use commands::{run_copy, run_replay, run_save, SaveArgs};

/// Top-level CLI for pagedl.
#[derive(Debug, Parser)]
#[command(name = "pagedl")]
#[command(about = "pagedl: save captured pages to disk or clipboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Save an HTML file as if a tab had captured it.
    Save {
        /// HTML file to save.
        path: PathBuf,
        /// Target filename (defaults to the file's own name).
        #[arg(long)]
        filename: Option<String>,
        /// Tab id the page is attributed to.
        #[arg(long, default_value = "1")]
        tab: i64,
        /// Fragment size in bytes (defaults to config chunk_size).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<usize>,
        /// Mark the sending tab as private.
        #[arg(long)]
        incognito: bool,
        /// Ask for a location before saving.
        #[arg(long)]
        save_as: bool,
        /// Filename conflict policy: uniquify, overwrite or prompt.
        #[arg(long, value_parser = parse_conflict_action)]
        conflict_action: Option<ConflictAction>,
        /// Output directory (defaults to config download_dir).
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Reject non-ASCII filenames like hosts with restricted charsets.
        #[arg(long)]
        ascii_only: bool,
    },

    /// Copy an HTML file to the clipboard as HTML and plain text.
    Copy {
        /// HTML file to copy.
        path: PathBuf,
        /// Tab id the page is attributed to.
        #[arg(long, default_value = "1")]
        tab: i64,
    },

    /// Replay recorded producer messages (one JSON object per line).
    Replay {
        /// JSON Lines file of `{"message": ..., "sender": ...}` entries.
        path: PathBuf,
        /// Output directory (defaults to config download_dir).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn parse_conflict_action(s: &str) -> Result<ConflictAction, String> {
    ConflictAction::parse(s).ok_or_else(|| {
        format!("unknown conflict action '{s}' (expected uniquify, overwrite or prompt)")
    })
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Save {
                path,
                filename,
                tab,
                chunk_size,
                incognito,
                save_as,
                conflict_action,
                dir,
                ascii_only,
            } => {
                let args = SaveArgs {
                    path,
                    filename,
                    tab,
                    chunk_size: chunk_size.unwrap_or(cfg.chunk_size),
                    incognito,
                    save_as,
                    conflict_action,
                    ascii_only,
                };
                let dir = match dir {
                    Some(d) => d,
                    None => cfg.download_dir()?,
                };
                run_save(&cfg, &dir, args).await?
            }
            CliCommand::Copy { path, tab } => {
                let dir = cfg.download_dir()?;
                run_copy(&cfg, &dir, &path, tab).await?
            }
            CliCommand::Replay { path, dir } => {
                let dir = match dir {
                    Some(d) => d,
                    None => cfg.download_dir()?,
                };
                run_replay(&cfg, &dir, &path).await?
            }
        }

        Ok(())
    }
}
