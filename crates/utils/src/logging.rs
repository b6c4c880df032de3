//! provides logging helpers

use tracing::Subscriber;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Default level directive, raised to DEBUG when `debug` is set.
pub fn default_level(debug: bool) -> filter::LevelFilter {
    if debug {
        filter::LevelFilter::DEBUG
    } else {
        filter::LevelFilter::INFO
    }
}

/// EnvFilter honouring `RUST_LOG`, falling back to [`default_level`].
pub fn env_filter(debug: bool) -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(default_level(debug).into())
        .from_env_lossy()
}

/// stderr formatting layer shared by every binary
pub fn get_fmt_layer<S>() -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    layer().with_writer(std::io::stderr).with_target(true)
}
