//! Server error types.

use thiserror::Error;

/// Errors from starting or running the server.
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
    /// `listen` was called on a server that is already running.
    #[error("server is already listening")]
    AlreadyListening,
    /// Other I/O failure.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
