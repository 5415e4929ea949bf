use axum::{response::IntoResponse, routing::get, Router};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use perfmon::common::AffinityGuard;
use perfmon::config::parse_event_list;
use perfmon::{
    BackendKind, CollectorConfig, CycleConfig, MetricCollector, Pmu, PmuMetricExporter, Session,
    SessionConfig,
};
use perfmon_raw::{FakeBackend, RegisterBackend};

#[derive(Parser, Debug)]
#[command(name = "perfmon")]
#[command(about = "Event counter management and export for ARM PMUs")]
struct Args {
    #[arg(long, default_value_t = 0, help = "Core whose PMU is managed")]
    core: i32,

    #[arg(
        long = "event",
        help = "Event to watch, by name or code, with an optional :wide suffix for a 64-bit pair (repeatable, comma lists allowed: --event inst_retired,br_pred:wide)",
        action = clap::ArgAction::Append
    )]
    events: Vec<String>,

    #[arg(long, help = "Enable the cycle counter")]
    cycles: bool,

    #[arg(long, help = "Count cycles in 64 bits (implies --cycles)")]
    cycles_64: bool,

    #[arg(long, help = "Count every 64th cycle (implies --cycles)")]
    cycles_div64: bool,

    #[arg(long, help = "Allow user-mode access to the PMU")]
    user_enable: bool,

    #[arg(long, default_value_t = 1000, help = "Sampling interval in milliseconds")]
    interval_ms: u64,

    #[arg(long, default_value = "0.0.0.0:8080", help = "Address for the /metrics endpoint")]
    listen: SocketAddr,

    #[arg(long, help = "Drive an in-memory PMU instead of the hardware")]
    simulate: bool,

    #[arg(
        long,
        default_value_t = perfmon_raw::current_arch::CORTEX_A53_SLOTS,
        help = "Event counters of the simulated PMU"
    )]
    slots: usize,

    #[arg(long, help = "Print the current PMU configuration as JSON and exit")]
    dump_state: bool,

    #[arg(short, long, help = "Enable verbose logging (shows every PMU register access)")]
    verbose: bool,
}

struct AppState<B: RegisterBackend> {
    exporter: Option<Arc<PmuMetricExporter<B>>>,
}

async fn metrics_handler<B: RegisterBackend + Send + 'static>(
    axum::extract::State(state): axum::extract::State<Arc<AppState<B>>>,
) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    perfmon::gather_metrics!(buffer, encoder, state.exporter, "PMU");

    let content_type = encoder.format_type().to_string();
    (
        [("Content-Type", content_type)],
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

fn session_config(args: &Args) -> perfmon::Result<SessionConfig> {
    let backend = if args.simulate {
        BackendKind::Simulated { slots: args.slots }
    } else if cfg!(target_arch = "arm") {
        BackendKind::Hardware
    } else {
        tracing::warn!("No CP15 access on this target, simulating the PMU");
        BackendKind::Simulated { slots: args.slots }
    };

    let mut config = SessionConfig::new(args.core, parse_event_list(&args.events)?, backend);
    if args.cycles || args.cycles_64 || args.cycles_div64 {
        config.cycles = Some(CycleConfig {
            wide: args.cycles_64,
            divide_by_64: args.cycles_div64,
        });
    }
    config.user_enable = args.user_enable;
    config.interval_ms = args.interval_ms;
    config.listen = args.listen;

    config.validate()?;
    Ok(config)
}

/// Advance the in-memory counters so a simulated session has something to export
fn simulate_activity(pmu: &mut Pmu<FakeBackend>) {
    let watches = pmu.events().watches();
    for watch in watches {
        let delta = 1_000 * (u64::from(watch.code.value()) + 1);
        pmu.registers_mut().count_events(watch.slot, delta);
    }
    pmu.registers_mut().tick_cycles(1_200_000);
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Shutdown triggered by Ctrl+C");
        },
        _ = terminate => {
            tracing::warn!("Shutdown triggered by SIGTERM");
        },
    }

    cancel_token.cancel();
}

async fn run<B: RegisterBackend + Send + 'static>(
    config: SessionConfig,
    mut pmu: Pmu<B>,
    driver: Option<fn(&mut Pmu<B>)>,
    dump_state: bool,
) -> anyhow::Result<()> {
    if dump_state {
        let state = pmu.state().save();
        println!("{}", serde_json::to_string_pretty(&state)?);
        pmu.state().restore(state);
        return Ok(());
    }

    let core = usize::try_from(config.core)?;
    tracing::warn!("Starting HTTP server on {}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;

    let session = Session::start(Arc::new(parking_lot::Mutex::new(pmu)), &config)?;
    tracing::info!("Session started with {} watched events", session.watches().len());

    let cancel_token = CancellationToken::new();

    let exporter = match PmuMetricExporter::new(core, session.pmu()) {
        Ok(exporter) => exporter,
        Err(e) => {
            session.end();
            return Err(e.into());
        }
    };
    let collector = MetricCollector::new(
        exporter,
        CollectorConfig {
            interval: config.interval(),
        },
    );
    let app_state = Arc::new(AppState {
        exporter: Some(collector.exporter()),
    });
    let collection_handle = collector.start(cancel_token.clone());

    let driver_handle = driver.map(|drive| {
        let pmu = session.pmu();
        let token = cancel_token.clone();
        let period = config.interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let mut pmu = pmu.lock();
                        drive(&mut pmu);
                    }
                }
            }
        })
    });

    let app = Router::new()
        .route("/metrics", get(metrics_handler::<B>))
        .with_state(app_state);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await;

    // stop sampling before the PMU is handed back
    cancel_token.cancel();
    let _ = collection_handle.await;
    if let Some(handle) = driver_handle {
        let _ = handle.await;
    }

    session.end();
    served?;

    tracing::info!("All tasks completed, exiting");
    Ok(())
}

#[cfg(target_arch = "arm")]
async fn run_hardware(config: SessionConfig, dump_state: bool) -> anyhow::Result<()> {
    // SAFETY: the runtime is single-threaded and the thread is pinned to
    // `config.core` for the whole session.
    let regs = unsafe { perfmon_raw::Cp15Backend::new() };
    run(config, Pmu::new(regs), None, dump_state).await
}

#[cfg(not(target_arch = "arm"))]
async fn run_hardware(_config: SessionConfig, _dump_state: bool) -> anyhow::Result<()> {
    Err(perfmon::PerfmonError::ConfigError("CP15 access requires an AArch32 build".to_string()).into())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = session_config(&args)?;

    // every PMU access below happens on this thread
    let pinned = AffinityGuard::new(config.core)?;
    tracing::info!("Managing the PMU of core {}", pinned.cpu());

    match config.backend {
        BackendKind::Simulated { slots } => {
            tracing::info!("Simulating a PMU with {} event counters", slots);
            let pmu = Pmu::new(FakeBackend::new(slots));
            run(config, pmu, Some(simulate_activity), args.dump_state).await
        }
        BackendKind::Hardware => run_hardware(config, args.dump_state).await,
    }
}
