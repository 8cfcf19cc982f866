//! Error types for the Exodus engine binary.
//!
//! [`EngineError`] wraps every failure mode during startup, the run, and
//! output writing, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Command-line arguments were not understood.
    #[error("usage error: {message}")]
    Usage {
        /// What was wrong with the arguments.
        message: String,
    },

    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: exodus_core::ConfigError,
    },

    /// The location graph could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: exodus_world::WorldError,
    },

    /// The simulation driver failed.
    #[error("simulation error: {source}")]
    Driver {
        /// The underlying driver error.
        #[from]
        source: exodus_core::DriverError,
    },

    /// A file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// JSON input or output failed.
    #[error("JSON error on {path}: {source}")]
    Json {
        /// The file involved.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The blocking simulation task panicked or was cancelled.
    #[error("simulation task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
