//! Collaborators injected into an ack manager
//!
//! The manager only sees these narrow capabilities: a metadata client, a
//! metrics sink, and three outbound channels.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::TimestampedAckId;
use crate::metadata::MetadataClient;
use crate::observability::AckMetrics;

/// Sender half of the ack/nack channels to the message cache
pub type AckSender = mpsc::Sender<TimestampedAckId>;

/// Receiver half of the ack/nack channels
pub type AckReceiver = mpsc::Receiver<TimestampedAckId>;

/// Everything an ack manager talks to
#[derive(Clone)]
pub struct AckManagerDeps {
    /// Shared metadata client
    pub metadata: Arc<dyn MetadataClient>,
    /// Metrics sink
    pub metrics: Arc<dyn AckMetrics>,
    /// Acks forwarded to the message cache
    pub ack_tx: AckSender,
    /// Nacks forwarded to the message cache
    pub nack_tx: AckSender,
    /// Pulsed when the extent is consumed; never awaited
    pub consumed_tx: mpsc::Sender<bool>,
}

/// Receiving ends owned by the message cache and extent lifecycle manager
#[derive(Debug)]
pub struct AckReceivers {
    pub ack_rx: AckReceiver,
    pub nack_rx: AckReceiver,
    pub consumed_rx: mpsc::Receiver<bool>,
}

impl AckManagerDeps {
    /// Create fresh bounded channels around the given clients.
    pub fn with_channels(
        metadata: Arc<dyn MetadataClient>,
        metrics: Arc<dyn AckMetrics>,
        ack_capacity: usize,
        consumed_capacity: usize,
    ) -> (Self, AckReceivers) {
        let (ack_tx, ack_rx) = mpsc::channel(ack_capacity);
        let (nack_tx, nack_rx) = mpsc::channel(ack_capacity);
        let (consumed_tx, consumed_rx) = mpsc::channel(consumed_capacity);

        (
            Self {
                metadata,
                metrics,
                ack_tx,
                nack_tx,
                consumed_tx,
            },
            AckReceivers {
                ack_rx,
                nack_rx,
                consumed_rx,
            },
        )
    }
}
