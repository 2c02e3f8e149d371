use std::path::PathBuf;

use thiserror::Error;

use crate::kind::SignalKind;

/// Error surface for signal subscription, processor startup, and configuration.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal processor must be started from inside a Tokio runtime")]
    NoRuntime,

    #[error("failed to subscribe to {kind} ({}): {source}", kind.os_name())]
    Subscribe {
        kind: SignalKind,
        #[source]
        source: std::io::Error,
    },

    #[error("signal set is empty; subscribe to at least one signal")]
    EmptySignalSet,

    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    #[error("signal '{0}' cannot be subscribed to")]
    NotCatchable(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parse failure for a config file on disk, with the path that failed.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SignalError {
    SignalError::Io {
        path: path.into(),
        source,
    }
}
