// # aliddns - One-shot DDNS reconciler
//
// Runs exactly one reconciliation cycle for a single Alidns record and
// exits. Scheduling (cron, systemd timer) is external; a failed update is
// retried by the next scheduled run.
//
// This binary is a THIN integration layer:
// 1. Parse the command line and the INI configuration
// 2. Install logging
// 3. Wire the IP source, provider, cache and notifier
// 4. Run one cycle on a single-threaded runtime
//
// ## Example
//
// ```bash
// aliddns /etc/aliddns/config.ini --log-level debug
// ```
//
// ```cron
// */5 * * * * /usr/local/bin/aliddns /etc/aliddns/config.ini
// ```

use aliddns_core::{CycleOutcome, DdnsConfig, FileStateStore, Reconciler};
use aliddns_notify_smtp::SmtpNotifier;
use aliddns_provider_aliyun::AliyunProvider;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: A cycle ran to a terminal state (including Failed and Aborted)
/// - 1: Configuration or startup error, no cycle attempted
/// - 2: Runtime construction error
#[derive(Debug, Clone, Copy)]
enum AliddnsExitCode {
    /// Cycle completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<AliddnsExitCode> for ExitCode {
    fn from(code: AliddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep one Alibaba Cloud DNS record pointed at this host's public IP
#[derive(Debug, Parser)]
#[command(name = "aliddns", version, about)]
struct Cli {
    /// INI configuration file
    #[arg(default_value = "config.ini")]
    config: PathBuf,

    /// Record cache file (overrides [cache] path)
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = "ALIDDNS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_level(raw: &str) -> Result<Level> {
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "Log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn load_config(cli: &Cli) -> Result<DdnsConfig> {
    let mut config = DdnsConfig::load(&cli.config)?;
    if let Some(ref cache) = cli.cache {
        config.cache_path = cache.clone();
    }
    Ok(config)
}

/// Wire the collaborators described by the configuration
fn build_reconciler(config: &DdnsConfig) -> Result<Reconciler> {
    let ip_source = aliddns_ip_http::from_config(&config.ip_source, config.record.record_type)
        .context("Failed to set up public IP discovery")?;

    let provider = AliyunProvider::new(&config.provider).context("Failed to set up Alidns client")?;

    let notifier = SmtpNotifier::new(&config.mail).context("Failed to set up mail notifications")?;
    let recipients = notifier.recipients().to_vec();

    let state_store = FileStateStore::new(&config.cache_path);

    Ok(Reconciler::new(
        ip_source,
        Box::new(provider),
        Box::new(state_store),
        Box::new(notifier),
        config.record.clone(),
        recipients,
    ))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match parse_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return AliddnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AliddnsExitCode::ConfigError.into();
    }

    let config = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{:#}", e);
            return AliddnsExitCode::ConfigError.into();
        }
    };

    let reconciler = match build_reconciler(&config) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            eprintln!("Startup error: {:#}", e);
            return AliddnsExitCode::ConfigError.into();
        }
    };

    info!(
        "Reconciling {} ({}) via {}, cache {}",
        reconciler.record().fqdn(),
        reconciler.record().record_type,
        config.provider.endpoint,
        config.cache_path.display()
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AliddnsExitCode::RuntimeError.into();
        }
    };

    let outcome = rt.block_on(reconciler.run_once());
    match outcome {
        CycleOutcome::NoOp { .. } | CycleOutcome::Done { .. } => {
            info!("Cycle finished: {}", outcome)
        }
        CycleOutcome::Aborted { .. } => warn!("Cycle finished: {}", outcome),
        CycleOutcome::Failed { .. } => error!("Cycle finished: {}", outcome),
    }

    AliddnsExitCode::Success.into()
}
