pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use permseek_queue::error::Result;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { db } => handlers::handle_init(db).await,
        Commands::Generate {
            length,
            package,
            from,
            to,
            config,
            db,
        } => handlers::handle_generate(length, package, from, to, config, db).await,
        Commands::Search {
            config,
            db,
            singles,
        } => handlers::handle_search(config, db, singles).await,
        Commands::FetchPack {
            pack,
            base_url,
            dest,
            config,
        } => handlers::handle_fetch_pack(pack, base_url, dest, config).await,
    }
}
