use std::net::SocketAddr;

use thiserror::Error;

/// Failure of a mapping policy's descriptor transform.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform `{method}` failed: {message}")]
    Failed { method: String, message: String },
    #[error("transform returned a malformed descriptor: {reason}")]
    Malformed { reason: String },
}

/// Failure handing a record to the sink.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to resolve sink address {addr}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no usable address for sink {addr}")]
    NoAddress { addr: String },
    #[error("failed to send metric to {addr}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode record: {reason}")]
    Encode { reason: String },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {path}")]
    Read { path: String },
    #[error("Failed to parse config file: {path}")]
    Parse { path: String },
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
    #[error("Unknown metric transform method `{method}`")]
    UnknownTransform { method: String },
}

/// Errors raised by the statsd ingest side.
#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("malformed line `{line}`: {reason}")]
    Malformed { line: String, reason: &'static str },
    #[error("invalid value `{value}` in line `{line}`")]
    InvalidValue { line: String, value: String },
    #[error("unsupported metric type `{kind}`")]
    Unsupported { kind: String },
}

/// Errors from the long-running daemon tasks.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Failed to bind {what} listener on {addr}")]
    Bind { what: &'static str, addr: String },
}
