use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use monitor::{AssetPayload, MonitorConfig};
use net::{HttpProbe, resolve_exit};
use runtime_monitor::{SharedTransport, start_aggregator};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "admonitor", about = "Host-side tools for the creative runtime monitor")]
struct Cli {
    /// Monitor configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the asset payload for a creative directory.
    Assets {
        dir: PathBuf,
        /// Entry document, relative to `dir`.
        #[arg(long, default_value = "index.html")]
        primary: String,
        #[arg(long, default_value = "blob:bundle/")]
        prefix: String,
    },
    /// Feed a captured event stream (one message per line) through the
    /// aggregator and print the final report.
    Replay {
        file: PathBuf,
        /// Probe click-exit destinations over the network.
        #[arg(long)]
        resolve: bool,
        /// Base URL for relative destinations.
        #[arg(long)]
        base: Option<String>,
    },
    /// Resolve one click-exit destination.
    Resolve {
        url: String,
        #[arg(long)]
        base: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MonitorConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    config.validate().context("invalid monitor config")?;

    match cli.command {
        Command::Assets { dir, primary, prefix } => {
            let payload = asset_payload(&dir, &primary, &prefix)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Replay { file, resolve, base } => {
            let transport = if resolve { Some(probe(&config)?) } else { None };
            replay(&file, transport, base)?;
        }
        Command::Resolve { url, base } => {
            let transport = probe(&config)?;
            let resolution = resolve_exit(transport.as_ref(), &url, base.as_deref());
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
    }
    Ok(())
}

fn probe(config: &MonitorConfig) -> Result<SharedTransport> {
    let exit = &config.exit;
    let probe = HttpProbe::new(Duration::from_millis(exit.timeout_ms), exit.max_redirects)?;
    Ok(Arc::new(probe))
}

fn asset_payload(dir: &Path, primary: &str, prefix: &str) -> Result<AssetPayload> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;
    files.sort();
    log::info!("{} files under {}", files.len(), dir.display());
    if !files.iter().any(|(path, _)| path == primary) {
        log::warn!("primary document {primary} is not in the bundle");
    }
    Ok(AssetPayload::from_files(primary, files, prefix))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, u64)>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_dir() {
            collect_files(root, &path, out)?;
        } else if meta.is_file() {
            let rel = path.strip_prefix(root)?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, meta.len()));
        }
    }
    Ok(())
}

fn replay(file: &Path, transport: Option<SharedTransport>, base: Option<String>) -> Result<()> {
    let reader = BufReader::new(fs::File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let (tx, rx) = bus::channel();
    let handle = start_aggregator(rx, transport, base);

    let mut lines = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        tx.post_raw(line);
    }
    drop(tx);

    let aggregator = handle.join();
    log::info!(
        "{lines} lines, {} snapshots, {} events",
        aggregator.snapshot_count(),
        aggregator.events().len()
    );
    let report = serde_json::json!({
        "summary": aggregator.latest_summary(),
        "snapshots": aggregator.snapshot_count(),
        "events": aggregator.events().len(),
        "droppedEvents": aggregator.dropped_events(),
        "exits": aggregator.exits(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
