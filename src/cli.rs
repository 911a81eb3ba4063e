use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "apkvault",
    version,
    about = "Backup, audit-log and validation vault for decompiled APK projects"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Root of the decompiled project (must contain res/)"
    )]
    pub project: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the project root structure (manifest, res/, layouts)
    Status,
    /// List resource files, optionally filtered by category
    List {
        #[arg(long, value_enum)]
        category: Option<Category>,
    },
    /// Snapshot one file before editing it
    Snapshot { path: String },
    /// Snapshot every live resource file once
    SnapshotAll,
    /// Restore a file to a previously snapshotted version
    Restore {
        path: String,
        #[arg(long)]
        version: u64,
    },
    /// Show the snapshot history of one file, newest first
    History { path: String },
    /// List every snapshot held for the project
    Backups,
    /// Drop old snapshot versions of one file, keeping the newest N
    Prune {
        path: String,
        #[arg(long)]
        keep: usize,
    },
    /// Write new content to a file (snapshots the old content first)
    Write {
        path: String,
        #[arg(long, help = "File holding the new content")]
        from: PathBuf,
    },
    /// Show the operation log
    Log {
        #[arg(long)]
        path: Option<String>,
        #[arg(long, help = "Only entries at or after this RFC 3339 timestamp")]
        since: Option<String>,
    },
    /// Validate resource files (whole project, one directory, or one file)
    Validate { path: Option<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Layout,
    Values,
    Drawable,
    Manifest,
    Raw,
}
