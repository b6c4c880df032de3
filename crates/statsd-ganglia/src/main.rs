use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use statsd_ganglia::app::builder::build_exporter;
use statsd_ganglia::app::ApplicationBuilder;
use statsd_ganglia::config::Cli;
use statsd_ganglia::config::Commands;
use statsd_ganglia::config::DaemonArgs;
use statsd_ganglia::config::FlushArgs;
use statsd_ganglia::config::StatsdConfig;
use statsd_ganglia::logging;
use statsd_ganglia::reducer;
use statsd_ganglia::sink::udp::UdpSink;
use statsd_ganglia::MetricSnapshot;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon(daemon_args) => run_daemon(*daemon_args).await,
        Commands::Flush(flush_args) => run_flush(flush_args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<StatsdConfig> {
    StatsdConfig::load_or_default(path).map_err(|e| anyhow::anyhow!("Failed to load config: {e:?}"))
}

async fn run_daemon(daemon_args: DaemonArgs) -> Result<()> {
    let mut config = load_config(daemon_args.config.as_deref())?;
    if let Some(host) = &daemon_args.ganglia_host {
        config.ganglia.host = Some(host.clone());
    }
    if let Some(interval) = daemon_args.flush_interval_ms {
        config.flush_interval = interval;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e:?}"))?;

    let _guard = logging::init(config.debug, daemon_args.metrics_file.as_deref());

    tracing::info!("Starting statsd-ganglia daemon {}", &**version::VERSION);

    let app = ApplicationBuilder::new(daemon_args, config).build()?;

    app.run().await?;
    app.shutdown().await?;

    Ok(())
}

fn run_flush(flush_args: FlushArgs) -> Result<()> {
    let config = load_config(flush_args.config.as_deref())?;
    let _guard = logging::init(config.debug, None);

    let raw = std::fs::read_to_string(&flush_args.snapshot).with_context(|| {
        format!("failed to read snapshot {}", flush_args.snapshot.display())
    })?;
    let mut snapshot: MetricSnapshot =
        serde_json::from_str(&raw).context("failed to parse snapshot")?;
    if snapshot.percent_thresholds.is_empty() {
        snapshot.percent_thresholds = config.percent_threshold.clone();
    }
    if snapshot.flush_interval_ms == 0 {
        snapshot.flush_interval_ms = config.flush_interval;
    }

    let stats = reducer::reduce(&snapshot);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if flush_args.export {
        let sink = UdpSink::bind_for(config.ganglia.host.as_deref(), config.ganglia.port)
            .context("failed to bind gmetric socket")?;
        let exporter = build_exporter(&config, Box::new(sink))
            .map_err(|e| anyhow::anyhow!("Failed to create exporter: {e:?}"))?;
        let summary = exporter.export(&stats);
        tracing::info!(
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "exported snapshot"
        );
    }
    Ok(())
}
