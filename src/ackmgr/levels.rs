//! Read/ack level snapshots
//!
//! The manager keeps exactly two snapshots: the current one and the one
//! taken at the last persisted advance. Rates are the per-second change
//! between the two.

use chrono::{DateTime, Utc};

use super::types::{ConsumerGroupExtent, SequenceNumber, StoreAddress};

/// Minimum elapsed time for a rate to be meaningful.
const MIN_RATE_WINDOW_SECS: f64 = 1e-6;

/// Watermarks at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    /// When this snapshot was taken
    pub as_of: DateTime<Utc>,
    /// Highest local sequence handed to a consumer
    pub read_level: SequenceNumber,
    /// Highest local sequence acked contiguously
    pub ack_level: SequenceNumber,
    /// Store address of the read level
    pub read_level_addr: StoreAddress,
    /// Store address of the ack level
    pub ack_level_addr: StoreAddress,
    /// Upstream sequence recorded at the read level
    pub read_level_seq: SequenceNumber,
    /// Upstream sequence recorded at the ack level
    pub ack_level_seq: SequenceNumber,
    /// Sequences acked per second
    pub ack_rate: f64,
    /// Sequences read per second
    pub read_rate: f64,
}

impl Levels {
    /// Levels as last persisted. Local read and ack levels both resume at
    /// the persisted ack sequence; everything past it is redelivered.
    pub fn seeded(cge: &ConsumerGroupExtent, as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            read_level: cge.ack_level_seq,
            ack_level: cge.ack_level_seq,
            read_level_addr: cge.read_level_address,
            ack_level_addr: cge.ack_level_address,
            read_level_seq: cge.ack_level_seq,
            ack_level_seq: cge.ack_level_seq,
            ack_rate: 0.0,
            read_rate: 0.0,
        }
    }

    /// Fill in rates relative to `prev`.
    pub fn with_rates_from(mut self, prev: &Levels) -> Self {
        self.ack_rate = calculate_rate(prev.ack_level, self.ack_level, prev.as_of, self.as_of);
        self.read_rate = calculate_rate(prev.read_level, self.read_level, prev.as_of, self.as_of);
        self
    }

    /// The terminal snapshot reports no movement.
    pub fn with_zero_rates(mut self) -> Self {
        self.ack_rate = 0.0;
        self.read_rate = 0.0;
        self
    }
}

/// Per-second change between two sequence values.
///
/// Returns `0.0` when the window is too small to divide by.
pub fn calculate_rate(
    prev: SequenceNumber,
    curr: SequenceNumber,
    prev_at: DateTime<Utc>,
    curr_at: DateTime<Utc>,
) -> f64 {
    let elapsed = (curr_at - prev_at)
        .num_nanoseconds()
        .map(|ns| ns as f64 / 1e9)
        .unwrap_or(0.0);
    if elapsed < MIN_RATE_WINDOW_SECS {
        return 0.0;
    }
    (curr - prev) as f64 / elapsed
}
