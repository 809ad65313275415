use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quorum",
    about = "Quorum: inspect and drive a local client cache",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Cache directory; overrides the config file
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Session configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show change id and entity counts
    Status,
    /// Apply an autoupdate message from a JSON file
    Apply(ApplyArgs),
    /// List the entities of a collection
    List(ListArgs),
    /// Show one entity
    Show(ShowArgs),
    /// List motions with category, submitters and state
    Motions,
    /// Show configuration variables, grouped when constants are given
    Config(ConfigArgs),
    /// Delete a motion
    DeleteMotion(DeleteMotionArgs),
    /// Drop all cached data
    Clear,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ListArgs {
    pub collection: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub collection: String,
    pub id: String,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// JSON file with the config constants
    #[arg(long)]
    pub constants: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteMotionArgs {
    pub id: u64,
    /// Skip the confirmation
    #[arg(short, long)]
    pub yes: bool,
}
