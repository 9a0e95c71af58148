//! classifiedsd - The classifieds lifecycle service
//!
//! This is the main entry point for the classifiedsd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Payment gateway and owner notifications
//! - Lifecycle orchestrator
//! - Periodic sweeps with signal-driven shutdown

use anyhow::{Context, Result};
use clap::Parser;
use classifieds_config::{Config, load_config};
use classifieds_core::{LifecycleOrchestrator, SweepOptions};
use classifieds_gateway::{DisabledPaymentGateway, HttpPaymentGateway, LogNotifier, PaymentGateway};
use classifieds_persistence::{AuditEvent, AuditEventType, Persistence, SqlitePersistence};
use classifieds_util::{DATABASE_FILENAME, default_config_path};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// classifiedsd - Listing and store lifecycle service
#[derive(Parser, Debug)]
#[command(name = "classifiedsd")]
#[command(about = "Listing and store lifecycle service for a classifieds marketplace", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/classifieds/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set CLASSIFIEDS_DATA_DIR env var)
    #[arg(short, long, env = "CLASSIFIEDS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

/// Main service state
struct Service {
    orchestrator: LifecycleOrchestrator,
    store: Arc<dyn Persistence>,
    sweep_interval: Duration,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let config = if args.config.exists() {
            load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?
        } else {
            warn!(
                config_path = %args.config.display(),
                "Config file not found, using defaults"
            );
            Config::default()
        };

        info!(
            config_path = %args.config.display(),
            package_count = config.lifecycle.packages().count(),
            sweep_interval_secs = config.service.sweep_interval.as_secs(),
            "Configuration loaded"
        );

        // Determine paths
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        // Create data directory
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Persistence> = Arc::new(
            SqlitePersistence::open(&db_path)
                .and_then(|s| s.with_due_hints(config.lifecycle.due_hints()))
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        // Log service start
        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;
        store.append_audit(AuditEvent::new(AuditEventType::ConfigLoaded {
            package_count: config.lifecycle.packages().count(),
        }))?;

        let payments = payment_gateway(&config)?;

        let orchestrator = LifecycleOrchestrator::new(
            store.clone(),
            payments,
            Arc::new(LogNotifier),
            config.lifecycle.clone(),
            SweepOptions::from_service(&config.service),
        );

        Ok(Self {
            orchestrator,
            store,
            sweep_interval: config.service.sweep_interval,
        })
    }

    async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = tokio::spawn(sweep_loop(
            self.orchestrator.clone(),
            self.sweep_interval,
            shutdown_rx,
        ));

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        info!("Service running");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, shutting down gracefully");
            }
        }

        // Stop dispatching and abort in-flight evaluations
        let _ = shutdown_tx.send(true);
        if let Err(e) = sweeper.await {
            error!(error = %e, "Sweep task failed");
        }

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    async fn run_once(self) -> Result<()> {
        let report = self.orchestrator.run_sweep(classifieds_util::now()).await;
        info!(
            evaluated = report.evaluated,
            committed = report.committed,
            "Single sweep finished"
        );

        self.store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))?;
        Ok(())
    }
}

/// HTTP processor when an endpoint is configured; otherwise every charge is
/// reported unavailable
fn payment_gateway(config: &Config) -> Result<Arc<dyn PaymentGateway>> {
    let Some(endpoint) = &config.payments.endpoint else {
        warn!("No payment endpoint configured, auto-renewals will fall back to grace");
        return Ok(Arc::new(DisabledPaymentGateway));
    };

    let api_key = config
        .payments
        .api_key_env
        .as_deref()
        .and_then(|var| std::env::var(var).ok());
    if config.payments.api_key_env.is_some() && api_key.is_none() {
        warn!("Payment API key variable is not set");
    }

    let gateway =
        HttpPaymentGateway::new(endpoint.clone(), api_key, config.service.payment_timeout)
            .context("Failed to build payment client")?;

    info!(endpoint = %gateway.endpoint(), "Payment gateway configured");
    Ok(Arc::new(gateway))
}

async fn sweep_loop(
    orchestrator: LifecycleOrchestrator,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        if *shutdown.borrow() {
            break;
        }

        let report = orchestrator
            .run_sweep_with_shutdown(classifieds_util::now(), shutdown.clone())
            .await;
        if report.cancelled {
            break;
        }
    }

    info!("Sweep loop stopped");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mock_time = classifieds_util::is_mock_time_active(),
        "classifiedsd starting"
    );

    // Create and run the service
    let service = Service::new(&args)?;
    if args.once {
        service.run_once().await
    } else {
        service.run().await
    }
}
