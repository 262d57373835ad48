use anyhow::{Context, Result};
use clap::Parser;
use memory_macro::config::{validate_config, Config, ConfigLoader};
use memory_macro::registry::AddressRegistry;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memory-macro", version)]
#[command(about = "AOB scanner and address monitor for game clients")]
struct Args {
    #[arg(short, long, default_value = "memory-macro.toml", env = "MEMORY_MACRO_CONFIG")]
    config: PathBuf,

    /// Process to attach to
    #[arg(short, long)]
    pid: Option<u32>,

    /// Server mode: 0 = MR, 1 = HR, 2 = LR
    #[arg(short, long)]
    server: Option<i32>,

    /// AOB pattern to scan the main module for, e.g. "8B 45 ?? 89"
    #[arg(long)]
    pattern: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config)
        .load_or_default()
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    validate_config(&config)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase())),
        )
        .with_target(false)
        .init();

    info!("Starting memory-macro v{}", env!("CARGO_PKG_VERSION"));

    let mode = args.server.unwrap_or(config.registry.server_mode);
    let registry = AddressRegistry::new(&config.registry.path);
    registry.init();

    let server = registry.server_config(mode);
    info!(server = %server.name, verified = server.verified, "Server selected");
    if !server.has_valid_addresses() {
        warn!(server = %server.name, "Server addresses are not configured");
    }

    run(&args, &config, &registry, mode).await
}

#[cfg(windows)]
async fn run(args: &Args, config: &Config, registry: &AddressRegistry, mode: i32) -> Result<()> {
    use memory_macro::memory::{MemoryScanner, Pattern};
    use memory_macro::monitor::AddressMonitor;
    use memory_macro::registry::relocate_addresses;
    use memory_macro::windows::WindowsBackend;
    use std::sync::Arc;
    use std::time::Duration;

    let pid = args.pid.context("--pid is required to attach")?;
    let scanner = Arc::new(MemoryScanner::with_options(
        Arc::new(WindowsBackend::new()),
        config.scanner.scan_options(),
    ));
    if !scanner.attach(pid) {
        anyhow::bail!("Failed to attach to process {}", pid);
    }

    if let Some(text) = &args.pattern {
        let pattern = Pattern::parse(text.as_str())?;
        let hits = scanner.find_all_patterns(&pattern);
        info!(%pattern, count = hits.len(), "Pattern scan finished");
        for address in hits {
            info!(%address, "Match");
        }
    }

    if let Some(relocated) = relocate_addresses(&scanner, &registry.configuration(), mode) {
        if let Err(e) = registry.update_server_addresses(mode, relocated) {
            warn!(error = %e, "Could not store relocated addresses");
        }
    }

    let monitor = AddressMonitor::new(
        Arc::clone(&scanner),
        &registry.server_config(mode),
        config.monitor.interval(),
    );
    monitor.start();
    info!("Monitoring. Press Ctrl+C to stop.");

    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = report.tick() => {
                info!(values = ?monitor.snapshot(), "Snapshot");
            }
        }
    }

    info!("Shutting down");
    monitor.terminate();
    scanner.detach();
    Ok(())
}

#[cfg(not(windows))]
async fn run(args: &Args, _config: &Config, _registry: &AddressRegistry, _mode: i32) -> Result<()> {
    if args.pid.is_some() || args.pattern.is_some() {
        warn!("--pid and --pattern need a live process");
    }
    anyhow::bail!("Live process attachment is only supported on Windows")
}
