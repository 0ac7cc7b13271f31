//! # Ack Manager Errors
//!
//! Every error here is recoverable. Ledger corruption detected during a
//! rollback is not an error value: it aborts the process.

use thiserror::Error;

use super::types::{SequenceNumber, StoreAddress};

/// Result type for ack manager operations
pub type AckResult<T> = Result<T, AckError>;

/// Ack manager errors
#[derive(Debug, Clone, Error)]
pub enum AckError {
    // ==================
    // Acknowledgment Errors
    // ==================
    /// The address embedded in the ack id is not the one recorded at delivery
    #[error("address of the ack id doesn't match (seq {seq}: expected {expected}, got {got})")]
    AddressMismatch {
        seq: SequenceNumber,
        expected: StoreAddress,
        got: StoreAddress,
    },

    /// The ack id could not be decoded
    #[error("Invalid ack id: {0}")]
    InvalidAckId(String),

    /// The message cache stopped draining ack/nack notifications
    #[error("Ack channel closed")]
    ChannelClosed,
}

impl AckError {
    /// Stable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AckError::AddressMismatch { .. } => "ACK_ADDRESS_MISMATCH",
            AckError::InvalidAckId(_) => "ACK_INVALID_ID",
            AckError::ChannelClosed => "ACK_CHANNEL_CLOSED",
        }
    }
}
