//! Delivery ledger
//!
//! Maps local sequence numbers to what was delivered at that position. The
//! ledger is owned by the ack manager and only mutated under its write lock,
//! with one exception: the `acked` flag is an atomic that flips false→true
//! at most once, so acknowledgments only need the read lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::types::{SequenceNumber, StoreAddress};

/// One delivered message
#[derive(Debug)]
pub struct DeliveryRecord {
    /// Store address the message was read from
    pub addr: StoreAddress,
    /// Sequence number assigned by the store
    pub upstream_seq: SequenceNumber,
    acked: AtomicBool,
}

impl DeliveryRecord {
    pub fn new(addr: StoreAddress, upstream_seq: SequenceNumber) -> Self {
        Self {
            addr,
            upstream_seq,
            acked: AtomicBool::new(false),
        }
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }

    /// Mark acked. Returns `true` if this call flipped the flag.
    pub fn mark_acked(&self) -> bool {
        !self.acked.swap(true, Ordering::AcqRel)
    }
}

/// Contiguous-scan tally of the entries above the ack level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTally {
    pub acked: i64,
    pub unacked: i64,
    pub missing: i64,
}

/// Local sequence → delivery record
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    entries: HashMap<SequenceNumber, DeliveryRecord>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, seq: SequenceNumber) -> Option<&DeliveryRecord> {
        self.entries.get(&seq)
    }

    pub fn insert(&mut self, seq: SequenceNumber, record: DeliveryRecord) {
        self.entries.insert(seq, record);
    }

    pub fn remove(&mut self, seq: SequenceNumber) -> Option<DeliveryRecord> {
        self.entries.remove(&seq)
    }

    /// Upper bound for any scan starting above `ack_level`.
    ///
    /// Every live entry sits above the ack level, so scanning `len()`
    /// positions past it covers them all and always terminates.
    pub fn scan_end(&self, ack_level: SequenceNumber) -> SequenceNumber {
        ack_level + self.entries.len() as i64
    }

    /// Count acked, unacked and missing positions in `(ack_level, scan_end]`.
    pub fn tally(&self, ack_level: SequenceNumber) -> LedgerTally {
        let mut tally = LedgerTally::default();
        let stop = self.scan_end(ack_level);
        let mut curr = ack_level.next();
        while curr <= stop {
            match self.entries.get(&curr) {
                Some(record) if record.is_acked() => tally.acked += 1,
                Some(_) => tally.unacked += 1,
                None => tally.missing += 1,
            }
            curr = curr.next();
        }
        tally
    }
}
