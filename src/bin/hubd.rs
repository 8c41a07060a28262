use std::path::PathBuf;
use std::time::Duration;

use clap::{App, Arg};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use telemetry_hub::consumers::NullProbe;
use telemetry_hub::{
    DisplayRenderer, DistributionHub, HubConfig, SerialLink, Supervisor, TelemetryLogger,
    WebStateCache, WorkerSpec,
};

const STATUS_REPORT_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let defaults = HubConfig::default();
    let default_baud = defaults.baud_rate.to_string();
    let default_grace = defaults.grace.as_secs().to_string();

    let matches = App::new("hubd")
        .version("0.1.0")
        .about("Serial telemetry ingestion and fan-out daemon")
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("DEVICE")
                .help("Candidate serial device, tried in order (repeatable)")
                .takes_value(true)
                .multiple(true),
        )
        .arg(
            Arg::with_name("baud")
                .short("b")
                .long("baud")
                .value_name("RATE")
                .help("Serial baud rate")
                .takes_value(true)
                .default_value(&default_baud)
                .validator(|v| v.parse::<u32>().map(|_| ()).map_err(|e| e.to_string())),
        )
        .arg(
            Arg::with_name("log")
                .short("l")
                .long("log")
                .value_name("PATH")
                .help("Telemetry log file path")
                .takes_value(true)
                .default_value("telemetry.log"),
        )
        .arg(
            Arg::with_name("grace")
                .long("grace")
                .value_name("SECONDS")
                .help("Shutdown grace period before workers are force-terminated")
                .takes_value(true)
                .default_value(&default_grace)
                .validator(|v| v.parse::<u64>().map(|_| ()).map_err(|e| e.to_string())),
        )
        .get_matches();

    let mut config = defaults.clone();
    if let Some(ports) = matches.values_of("port") {
        config.ports = ports.map(str::to_string).collect();
    }
    if let Some(baud) = matches.value_of("baud") {
        config.baud_rate = baud.parse()?;
    }
    if let Some(path) = matches.value_of("log") {
        config.log_path = PathBuf::from(path);
    }
    if let Some(grace) = matches.value_of("grace") {
        config.grace = Duration::from_secs(grace.parse()?);
    }

    info!(ports = ?config.ports, baud = config.baud_rate, "starting telemetry hub");

    let mut hub = DistributionHub::new();
    let logger_inbox = hub.register("logger", config.inbox_capacity);
    let display_inbox = hub.register("display", config.inbox_capacity);
    let cache_inbox = hub.register("web-cache", config.inbox_capacity);

    let link = SerialLink::new(
        config.ports.clone(),
        config.baud_rate,
        config.reconnect_delay,
    );
    let logger = TelemetryLogger::new(
        config.log_path.clone(),
        config.max_segment_bytes,
        config.retained_segments,
    );
    let display = DisplayRenderer::new(NullProbe, config.render_period, config.reacquire_delay);
    let (cache_worker, state) = WebStateCache::new();

    // `state` is the accessor the HTTP layer will hold; the daemon also
    // reports it periodically so operators see link health in the logs.
    let status = state.clone();

    let specs = vec![
        WorkerSpec::new("serial-link", move |token| link.run(hub, token)),
        WorkerSpec::new("logger", move |token| logger.run(logger_inbox, token)),
        WorkerSpec::new("display", move |token| display.run(display_inbox, token)),
        WorkerSpec::new("web-cache", move |token| cache_worker.run(cache_inbox, token)),
        WorkerSpec::new("status-report", move |token| status_report(status, token)),
    ];

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if wait_for_shutdown_signal().await.is_ok() {
            info!("stop signal received");
        }
        signal_token.cancel();
    });

    let supervisor = Supervisor::new(config.poll_interval, config.grace);
    match supervisor.run(specs, shutdown).await {
        Ok(()) => {
            info!("telemetry hub stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "telemetry hub failed");
            std::process::exit(1);
        }
    }
}

/// Periodic operator-facing health line derived from the web cache.
async fn status_report(
    status: telemetry_hub::StateCache,
    token: CancellationToken,
) -> Result<(), telemetry_hub::WorkerError> {
    let mut ticks = time::interval(STATUS_REPORT_PERIOD);
    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = ticks.tick() => {
                let snapshot = status.latest();
                info!(status = ?snapshot.status, ts = snapshot.ts, "telemetry status");
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
