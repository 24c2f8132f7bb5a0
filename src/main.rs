//! Initializer Controller - runs InitializerController reconciliation passes

use std::time::Duration;

use clap::{Parser, Subcommand};
use kube::{Api, Client, CustomResourceExt};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use initializer_controller::controller::{sync_all, Context};
use initializer_controller::crd::InitializerController;
use initializer_controller::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use initializer_controller::{DEFAULT_SYNC_INTERVAL_SECS, FIELD_MANAGER};

/// Initializer Controller - ordered, cooperative initialization of Kubernetes objects
#[derive(Parser, Debug)]
#[command(name = "initializer-controller", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the controller (default mode)
    ///
    /// Every sync interval, lists all InitializerControllers and hands each
    /// uninitialized object whose queue they head to their init hook.
    Run(RunArgs),

    /// Print the InitializerController CRD manifest and exit
    Crd,
}

/// Run mode arguments
#[derive(Parser, Debug)]
struct RunArgs {
    /// Seconds between reconciliation passes
    #[arg(long, env = "INITIALIZER_SYNC_INTERVAL", default_value_t = DEFAULT_SYNC_INTERVAL_SECS)]
    sync_interval: u64,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Don't install the CRD at startup
    #[arg(long)]
    skip_crd_install: bool,

    /// Log format: text or json
    #[arg(long, env = "INITIALIZER_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL_SECS,
            once: false,
            skip_crd_install: false,
            log_format: LogFormat::Text,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Crd) => {
            let crd = serde_yaml::to_string(&InitializerController::crd())
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("{crd}");
            Ok(())
        }
        Some(Commands::Run(args)) => run_controller(args).await,
        None => run_controller(RunArgs::default()).await,
    }
}

/// Run reconciliation passes until interrupted
async fn run_controller(args: RunArgs) -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig {
        format: args.log_format,
        ..Default::default()
    })?;

    if args.sync_interval == 0 {
        anyhow::bail!("--sync-interval must be at least 1 second");
    }

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if !args.skip_crd_install {
        ensure_crd_installed(&client).await?;
    }

    let ctx = Context::new(client)?;

    if args.once {
        let summary = sync_all(&ctx).await?;
        info!(?summary, "single pass finished");
        return Ok(());
    }

    info!(interval_secs = args.sync_interval, "starting initializer controller");

    let mut ticker = tokio::time::interval(Duration::from_secs(args.sync_interval));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping");
                break;
            }
            _ = ticker.tick() => {
                // A failed pass is retried on the next tick
                if let Err(e) = sync_all(&ctx).await {
                    error!(error = %e, "sync pass failed");
                }
            }
        }
    }

    Ok(())
}

/// Install or update the InitializerController CRD
async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let crd = InitializerController::crd();
    let name = crd.metadata.name.clone().unwrap_or_default();

    info!(crd = %name, "installing CRD");
    crds.patch(&name, &params, &Patch::Apply(&crd))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to install {} CRD: {}", name, e))?;

    Ok(())
}

/// Resolve when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
