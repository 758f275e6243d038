use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "diffkit", about = "Apply, create, list, and verify binary diff archives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv); overrides RUST_LOG when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconstruct a target file from one or more archives plus a source file.
    Apply {
        /// Archive to apply, outermost first. May be given more than once.
        #[arg(long = "archive", required = true)]
        archives: Vec<PathBuf>,

        /// The unchanged-regions source file, if the archive needs one.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Where to write the reconstructed target.
        #[arg(long)]
        target: PathBuf,
    },

    /// Build a minimal archive from a source and target file pair.
    Create {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        target: PathBuf,

        #[arg(long = "out")]
        out: PathBuf,

        /// zstd compression level used for the differing middle region.
        #[arg(long, default_value_t = 19)]
        zstd_level: i32,
    },

    /// Print the recipe tree for an archive's target item.
    List {
        #[arg(long)]
        archive: PathBuf,
    },

    /// Confirm every inline asset, remainder, and copy-source region hashes
    /// correctly, without writing a target.
    Verify {
        #[arg(long)]
        archive: PathBuf,

        #[arg(long)]
        source: Option<PathBuf>,
    },
}
