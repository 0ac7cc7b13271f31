//! Core value types shared by the ack manager
//!
//! Sequence numbers and store addresses are kept as distinct newtypes so
//! that a local ledger position can never be confused with an upstream
//! sequence or a store offset.

use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ack_id::AckId;

/// A position in a message sequence
///
/// `-1` means "nothing yet"; `0` is the first message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNumber(pub i64);

impl SequenceNumber {
    /// Nothing received / nothing acked.
    pub const NONE: SequenceNumber = SequenceNumber(-1);

    /// Create a sequence number.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Raw value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The following sequence number.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// The preceding sequence number.
    pub fn prev(&self) -> Self {
        Self(self.0 - 1)
    }

    /// Zero is used by sources whose numbering is inherently discontinuous.
    pub fn is_unchecked(&self) -> bool {
        self.0 == 0
    }
}

impl Add<i64> for SequenceNumber {
    type Output = SequenceNumber;

    fn add(self, rhs: i64) -> Self::Output {
        SequenceNumber(self.0 + rhs)
    }
}

impl Sub for SequenceNumber {
    type Output = i64;

    fn sub(self, rhs: SequenceNumber) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<i64> for SequenceNumber {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<u32> for SequenceNumber {
    fn from(value: u32) -> Self {
        Self(i64::from(value))
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offset of a message inside the connected store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreAddress(pub i64);

impl StoreAddress {
    /// Nothing read / nothing acked.
    pub const NONE: StoreAddress = StoreAddress(-1);

    /// Raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for StoreAddress {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who this ack manager is
///
/// Used to build ack ids and persistence requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckManagerIdentity {
    /// Output host running this manager
    pub output_host_id: Uuid,
    /// Consumer group the extent is attached to
    pub consumer_group_id: Uuid,
    /// Extent being consumed
    pub extent_id: Uuid,
    /// Store host currently serving the extent
    pub connected_store_id: Uuid,
    /// Session of the output host process
    pub session_id: u16,
    /// Unique per manager on this host
    pub ack_mgr_id: u16,
}

/// Last persisted progress of a consumer group on an extent
///
/// Seeds both the current and previous level snapshots so that the rates
/// computed on the first cycle are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerGroupExtent {
    pub ack_level_seq: SequenceNumber,
    pub ack_level_address: StoreAddress,
    pub read_level_seq: SequenceNumber,
    pub read_level_address: StoreAddress,
}

impl ConsumerGroupExtent {
    /// A consumer group that has never read from the extent.
    pub fn fresh() -> Self {
        Self {
            ack_level_seq: SequenceNumber(0),
            ack_level_address: StoreAddress::NONE,
            read_level_seq: SequenceNumber(0),
            read_level_address: StoreAddress::NONE,
        }
    }
}

impl Default for ConsumerGroupExtent {
    fn default() -> Self {
        Self::fresh()
    }
}

/// An ack id forwarded to the message cache, stamped with arrival time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedAckId {
    pub ack_id: AckId,
    pub ts: DateTime<Utc>,
}

impl TimestampedAckId {
    /// Stamp an ack id with the current time.
    pub fn now(ack_id: AckId) -> Self {
        Self {
            ack_id,
            ts: Utc::now(),
        }
    }
}
