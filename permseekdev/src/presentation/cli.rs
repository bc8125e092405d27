use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "permseek CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the work-queue schema (idempotent)
    Init {
        #[arg(long, default_value = "permutations.db")]
        db: PathBuf,
    },

    /// Plan permutation ranges for a package (or package range) and
    /// enqueue them; prompts interactively when no flags are given
    Generate {
        /// Byte-array length L (prompted for when omitted)
        #[arg(long)]
        length: Option<usize>,
        /// Single package number, 1-indexed
        #[arg(long, conflicts_with_all = ["from", "to"])]
        package: Option<u64>,
        /// First package of an inclusive package range
        #[arg(long, requires = "to")]
        from: Option<u64>,
        /// Last package of an inclusive package range
        #[arg(long, requires = "from")]
        to: Option<u64>,
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        /// Queue database path (defaults to the config's db_path)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Drain the queue, hashing every queued array against the target
    Search {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
        /// Queue database path (defaults to the config's db_path)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Only process rows already collapsed to a single array
        #[arg(long)]
        singles: bool,
    },

    /// Download and extract a precomputed remote work package
    FetchPack {
        /// Pack number N in PACK_<N>.7z
        pack: u64,
        /// Remote base URL (defaults to the config's pack_base_url)
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long, default_value = "packs")]
        dest: PathBuf,
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
    },
}
