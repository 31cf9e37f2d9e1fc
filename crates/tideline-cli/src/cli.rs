use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tideline",
    about = "Tideline -- three-way directory synchronization",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Session config file (default: .tideline.toml in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Local root, overriding the config
    #[arg(long, global = true)]
    pub local: Option<PathBuf>,

    /// Common ancestor root; enables three-way comparison
    #[arg(long, global = true)]
    pub base: Option<PathBuf>,

    /// Remote root, overriding the config
    #[arg(long, global = true)]
    pub remote: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show items that are out of sync
    Status(StatusArgs),
    /// Merge incoming and conflicting changes into the local root
    Merge(MergeArgs),
    /// Accept local copies as merged with the remote
    MarkMerged(MarkMergedArgs),
    /// Show one item's classification and revisions
    Show(ShowArgs),
    /// Classify conflicts as auto-mergeable or manual
    TagConflicts(TagConflictsArgs),
}

#[derive(Args)]
pub struct StatusArgs {
    /// Only show conflicting items
    #[arg(long)]
    pub conflicts: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Items or directories to merge (default: everything out of sync)
    pub paths: Vec<String>,
    /// Overwrite local changes with the winning side
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct MarkMergedArgs {
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub path: String,
}

#[derive(Args)]
pub struct TagConflictsArgs {}
