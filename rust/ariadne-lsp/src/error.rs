//! Error types of the protocol layer

use thiserror::Error;

/// Failures of the dispatch loop itself. Analysis and query failures never
/// surface here; they are logged where they happen.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] lsp_server::ProtocolError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("client connection closed")]
    ChannelClosed,
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of `workspace/executeCommand`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("the \"{0}\" operation is not supported by this server")]
    Unsupported(String),
    #[error("invalid arguments for {command}: {message}")]
    InvalidArguments { command: String, message: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
