use std::io::Write;
use std::path::PathBuf;

use permseek_core::config::Config;
use permseek_core::digest::StandardDigests;
use permseek_core::error::CoreError;
use permseek_core::plan::{plan_package, total_packages};
use permseek_core::sink::FileSink;
use permseek_queue::distributor::PackDistributor;
use permseek_queue::error::Result;
use permseek_queue::runner::drain;
use permseek_queue::store::SqliteQueue;
use std::sync::Arc;
use tracing::info;

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_u64(message: &str) -> Result<u64> {
    let text = prompt(message)?;
    let n = text
        .parse::<u64>()
        .map_err(|e| CoreError::Validation(format!("expected a number, got {text:?}: {e}")))?;
    Ok(n)
}

pub async fn handle_init(db: PathBuf) -> Result<()> {
    let queue = SqliteQueue::open(&db).await?;
    queue.init().await?;
    println!("schema ready at {}", db.display());
    Ok(())
}

pub async fn handle_generate(
    length: Option<usize>,
    package: Option<u64>,
    from: Option<u64>,
    to: Option<u64>,
    config_path: PathBuf,
    db: Option<PathBuf>,
) -> Result<()> {
    let cfg = Config::load(&config_path)?;
    let length = match length {
        Some(l) => l,
        None => prompt_u64("Array length: ")? as usize,
    };
    let available = total_packages(length, &cfg)?;
    println!("length {length}: {available} package(s) available");

    let (first, last) = match (package, from, to) {
        (Some(p), _, _) => (p, p),
        (None, Some(a), Some(b)) => (a, b),
        _ => {
            let mode = prompt("Generate a [s]ingle package or a package [r]ange? ")?;
            if mode.to_ascii_lowercase().starts_with('r') {
                (
                    prompt_u64("First package: ")?,
                    prompt_u64("Last package: ")?,
                )
            } else {
                let p = prompt_u64("Package number: ")?;
                (p, p)
            }
        }
    };
    if first == 0 || last < first {
        return Err(CoreError::Validation(format!(
            "bad package range {first}..={last}"
        ))
        .into());
    }

    let db_path = db.unwrap_or_else(|| PathBuf::from(&cfg.db_path));
    let queue = SqliteQueue::open(&db_path).await?;
    queue.init().await?;

    let mut total_rows = 0usize;
    for p in first..=last {
        let ranges = plan_package(length, p, &cfg)?;
        for r in &ranges {
            queue.insert_with_retry(r).await?;
        }
        info!(package = p, rows = ranges.len(), "package enqueued");
        total_rows += ranges.len();
    }
    println!("enqueued {total_rows} range(s) from packages {first}..={last}");
    Ok(())
}

pub async fn handle_search(
    config_path: PathBuf,
    db: Option<PathBuf>,
    singles: bool,
) -> Result<()> {
    let cfg = Config::load(&config_path)?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&cfg.db_path));
    let queue = SqliteQueue::open(&db_path).await?;
    queue.init().await?;

    let sink = Arc::new(FileSink::open(std::path::Path::new(&cfg.match_file))?);
    let report = drain(&queue, &cfg, Arc::new(StandardDigests), sink, singles).await?;

    if report.matches_found > 0 {
        println!(
            "{} match(es) found across {} range(s); see {}",
            report.matches_found, report.ranges_processed, cfg.match_file
        );
    } else {
        println!(
            "no match in {} range(s); queue drained",
            report.ranges_processed
        );
    }
    Ok(())
}

pub async fn handle_fetch_pack(
    pack: u64,
    base_url: Option<String>,
    dest: PathBuf,
    config_path: PathBuf,
) -> Result<()> {
    let base = match base_url {
        Some(url) => url,
        None => Config::load(&config_path)?.pack_base_url,
    };
    let distributor = PackDistributor::new(&base, &dest)?;
    let archive = distributor.download_and_extract(pack).await?;
    println!("downloaded and extracted {}", archive.display());
    Ok(())
}
