//! CLI-specific error types
//!
//! Every failure surfaces as one JSON error envelope with a stable code.

use std::io;

use thiserror::Error;

use crate::ackmgr::AckError;
use crate::config::ConfigError;

/// CLI errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing output or starting the runtime failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Output could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ack id decoding or the ack path failed
    #[error("{code}: {0}", code = .0.code())]
    Ack(#[from] AckError),
}

impl CliError {
    /// Stable error code for the JSON envelope
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "CLI_CONFIG_ERROR",
            CliError::Io(_) | CliError::Json(_) => "CLI_IO_ERROR",
            CliError::Ack(_) => "CLI_ACK_ERROR",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
