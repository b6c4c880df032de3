use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use utils::version;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the statsd listener and flush to ganglia on every interval
    Daemon(Box<DaemonArgs>),
    /// Reduce a single snapshot file and print (or export) the derived stats
    Flush(FlushArgs),
}

#[derive(Args, Clone)]
pub struct DaemonArgs {
    #[arg(
        long,
        env = "STATSD_GANGLIA_CONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to the statsd config file (JSON or YAML)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "STATSD_LISTEN_ADDR",
        default_value = "0.0.0.0:8125",
        help = "UDP address for incoming statsd packets"
    )]
    pub listen_addr: String,

    #[arg(
        long,
        env = "STATSD_MGMT_ADDR",
        default_value = "127.0.0.1:8126",
        help = "TCP address for the management interface"
    )]
    pub mgmt_addr: String,

    #[arg(
        long,
        env = "GANGLIA_HOST",
        help = "gmond host, overrides ganglia.host from the config file"
    )]
    pub ganglia_host: Option<String>,

    #[arg(long, help = "Flush interval in milliseconds, overrides flushInterval")]
    pub flush_interval_ms: Option<u64>,

    #[arg(
        long,
        env = "STATSD_GANGLIA_METRICS_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Also log every exported record to this file, e.g. /logs/metrics.log"
    )]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct FlushArgs {
    #[arg(
        long,
        env = "STATSD_GANGLIA_CONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to the statsd config file (JSON or YAML)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Snapshot JSON file with counters, gauges and timers"
    )]
    pub snapshot: PathBuf,

    #[arg(
        long,
        default_value_t = false,
        help = "Send the derived stats to gmond instead of only printing them"
    )]
    pub export: bool,
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn parse_daemon_defaults() {
        let cli = Cli::try_parse_from(["statsd-ganglia", "daemon"]).expect("parses");
        let Commands::Daemon(args) = cli.command else {
            panic!("expected daemon command");
        };
        assert_eq!(args.listen_addr, "0.0.0.0:8125");
        assert_eq!(args.mgmt_addr, "127.0.0.1:8126");
        assert!(args.flush_interval_ms.is_none());
    }

    #[test]
    fn parse_flush_command() {
        let cli = Cli::try_parse_from([
            "statsd-ganglia",
            "flush",
            "--snapshot",
            "snap.json",
            "--export",
        ])
        .expect("parses");
        let Commands::Flush(args) = cli.command else {
            panic!("expected flush command");
        };
        assert_eq!(args.snapshot, PathBuf::from("snap.json"));
        assert!(args.export);
    }
}
