use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pixa",
    about = "Pixa: content-addressed image asset store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Config file (default: <root>/pixa.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a data directory and default config
    Init,
    /// Store an image file
    Put(PutArgs),
    /// Download an asset to a file
    Get(GetArgs),
    /// Show an asset's record
    Info(IdArgs),
    /// Delete an asset
    Rm(IdArgs),
    /// List assets, newest first
    Ls(LsArgs),
    /// Replace an asset's tags
    Tag(TagArgs),
    /// Replace an asset's custom metadata
    Meta(MetaArgs),
    /// Show asset count and sizes
    Stats,
    /// Remove blobs no record references
    Gc(GcArgs),
    /// Check every record's blob exists
    Fsck,
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
    /// key=value; values are parsed as JSON when possible
    #[arg(short, long = "meta")]
    pub meta: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub id: String,
    pub out: PathBuf,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

#[derive(Args)]
pub struct TagArgs {
    pub id: String,
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct MetaArgs {
    pub id: String,
    pub pairs: Vec<String>,
}

#[derive(Args)]
pub struct GcArgs {
    #[arg(long)]
    pub dry_run: bool,
    /// Re-check candidates after this many seconds before deleting
    #[arg(long, default_value = "0")]
    pub grace_secs: u64,
}
