//! Server startup errors.

use thiserror::Error;

/// Failures that stop the server from starting.
///
/// Per-connection failures never surface here; they are logged and counted
/// where they happen.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// I/O failure on an already bound listener.
    #[error("server I/O error: {0}")]
    Serve(#[from] std::io::Error),
    /// The Prometheus recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
