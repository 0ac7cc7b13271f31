//! # Metadata Errors
//!
//! Failures talking to the metadata store. All of them are retried on the
//! next ack-level cycle.

use std::time::Duration;

use thiserror::Error;

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Metadata store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// The call did not complete within the deadline
    #[error("Metadata call timed out after {0:?}")]
    Timeout(Duration),

    /// The store could not be reached
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_deadline() {
        let err = MetadataError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Metadata call timed out after 10s");
    }
}
