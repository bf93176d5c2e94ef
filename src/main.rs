use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use postfix_exporter::prometheus;
use postfix_exporter::{Overrides, PostfixCollector, Registry, Settings};

#[derive(Parser, Debug)]
#[command(name = "postfix-exporter")]
#[command(about = "Prometheus exporter for Postfix queue depths and log summary counters")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on for HTTP requests [default: 0.0.0.0:9154]
    #[arg(long)]
    listen_address: Option<String>,

    /// Path under which to expose metrics [default: /metrics]
    #[arg(long)]
    metrics_path: Option<String>,

    /// Collect traffic counters from a pflogsumm report
    #[arg(long)]
    log_summary: bool,

    /// Mail logfile fed to pflogsumm (required with --log-summary unless --journal)
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Read the mail log from the systemd journal instead of a logfile
    #[arg(long)]
    journal: bool,

    /// systemd unit whose journal entries are summarized [default: postfix].
    /// Debian and Ubuntu log under an instance unit; use 'postfix@*' there
    #[arg(long)]
    journal_unit: Option<String>,

    /// Minimum seconds between pflogsumm runs [default: 60]
    #[arg(long)]
    summary_refresh_interval: Option<u64>,

    /// Seconds before an external command is killed; journalctl and pflogsumm
    /// share one budget [default: 10]
    #[arg(long)]
    command_timeout: Option<u64>,

    /// Path to postqueue
    #[arg(long)]
    postqueue: Option<PathBuf>,

    /// Path to postconf
    #[arg(long)]
    postconf: Option<PathBuf>,

    /// Path to pflogsumm
    #[arg(long)]
    pflogsumm: Option<PathBuf>,

    /// Path to journalctl
    #[arg(long)]
    journalctl: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen_address: self.listen_address.clone(),
            metrics_path: self.metrics_path.clone(),
            command_timeout: self.command_timeout,
            // Flags can only switch features on; leave lower layers alone otherwise
            log_summary: self.log_summary.then_some(true),
            logfile: self.logfile.clone(),
            journal: self.journal.then_some(true),
            journal_unit: self.journal_unit.clone(),
            refresh_interval: self.summary_refresh_interval,
            postqueue: self.postqueue.clone(),
            postconf: self.postconf.clone(),
            pflogsumm: self.pflogsumm.clone(),
            journalctl: self.journalctl.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Configuration errors are fatal before anything is bound
    let settings = Settings::load(args.config.as_deref(), &args.overrides())
        .context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(settings))
}

async fn run(settings: Settings) -> Result<()> {
    let registry = Arc::new(Registry::new());
    registry.register(Arc::new(PostfixCollector::from_settings(&settings)))?;

    let addr = settings.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(
        %addr,
        metrics_path = %settings.metrics_path,
        log_summary = settings.log_summary.enabled,
        journal = settings.log_summary.journal,
        refresh_interval_secs = settings.log_summary.refresh_interval,
        "listening"
    );

    prometheus::serve(listener, registry, settings.metrics_path.clone(), shutdown_signal())
        .await
        .context("metrics server failed")?;

    info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    // If the handler cannot be installed, run until killed
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "postfix_exporter={level},postfix_adapters={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
