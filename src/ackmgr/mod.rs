//! # Ack Manager
//!
//! Acknowledgment tracking for one consumer group's attachment to one
//! extent.
//!
//! ## Architecture
//!
//! - **Ack ids**: reversible encoding of (session, manager, seq, address)
//! - **Ledger**: local sequence → delivery record
//! - **Levels**: current and previous read/ack snapshots, with rates
//! - **Manager**: delivery, ack, rollback and ack-level advancement
//! - **Scheduler**: periodic persistence with a final flush on stop
//!
//! Delivery assigns ack ids and ledger entries, acks flip entries to acked,
//! and the scheduler periodically advances the ack level through the acked
//! run, persists it, and signals when a sealed extent is fully consumed.

mod ack_id;
mod deps;
mod errors;
mod ledger;
mod levels;
mod manager;
mod scheduler;
mod state;
mod types;

pub use ack_id::{AckId, AckIdParts};
pub use deps::{AckManagerDeps, AckReceiver, AckReceivers, AckSender};
pub use errors::{AckError, AckResult};
pub use ledger::{DeliveryLedger, DeliveryRecord, LedgerTally};
pub use levels::{calculate_rate, Levels};
pub use manager::{AckManager, CycleOutcome};
pub use state::AckMgrState;
pub use types::{
    AckManagerIdentity, ConsumerGroupExtent, SequenceNumber, StoreAddress, TimestampedAckId,
};
