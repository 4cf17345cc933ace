use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use journal_core::VERSION;

/// Journal - keep a directory of gpg-encrypted notes, open them for editing, seal them again
#[derive(Parser)]
#[command(name = "journal")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, env = "JOURNAL_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Encryption command to run instead of the configured one
    #[arg(long, global = true, value_name = "CMD")]
    pub gpg: Option<String>,

    /// Log level filter (overridden by JOURNAL_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use ASCII symbols only
    #[arg(long, global = true)]
    pub ascii: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Journal directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Recipient identity the journal is encrypted for
    #[arg(short, long, value_name = "ID")]
    pub recipient: String,

    /// Overwrite an existing recipient identity
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `unlock` command
#[derive(Args)]
pub struct UnlockArgs {
    /// Journal directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Decrypt one file at a time instead of pipelining
    #[arg(long)]
    pub sequential: bool,

    /// Capacity of each pipeline queue
    #[arg(long, value_name = "N")]
    pub queue_depth: Option<usize>,
}

/// Arguments for the `lock` command
#[derive(Args)]
pub struct LockArgs {
    /// Journal directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

/// Arguments for the `status` command
#[derive(Args)]
pub struct StatusArgs {
    /// Journal directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the recipient identity for a new journal
    Init(InitArgs),

    /// Decrypt every entry for editing
    Unlock(UnlockArgs),

    /// Re-encrypt edited entries and remove plaintext copies
    Lock(LockArgs),

    /// Show which entries are sealed, open, or modified
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
