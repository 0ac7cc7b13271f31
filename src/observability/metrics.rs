//! Ack manager metrics
//!
//! Managers report through the narrow `AckMetrics` capability they are
//! handed at construction. `MetricsRegistry` is the in-process sink: atomic
//! counters for occurrences, last-value gauges for sizes.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

/// What an ack manager reports
pub trait AckMetrics: Send + Sync {
    /// Upstream sequence skipped ahead by `count` messages
    fn skipped_messages(&self, count: i64);
    /// A delivery was rolled back
    fn reset_msg(&self);
    /// A rollback found a corrupted ledger
    fn reset_msg_error(&self);
    /// An ack arrived for a sequence the ledger does not hold
    fn seq_not_found(&self);
    /// Entries passed by the ack level in one persisted cycle
    fn ack_level_update(&self, processed: i64);
    /// Entries currently tracked by the ledger
    fn ledger_size(&self, size: i64);
    /// A consumed extent was persisted
    fn consumed(&self);
}

/// In-process metrics sink
///
/// # Thread Safety
///
/// All values are atomics with Relaxed ordering; readers only need
/// eventually consistent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Last skipped-messages gauge value
    skipped_messages: AtomicI64,
    /// Total skipped messages reported
    skipped_messages_total: AtomicU64,
    /// Read-level rollbacks
    reset_msgs: AtomicU64,
    /// Rollbacks that hit a corrupted ledger
    reset_msg_errors: AtomicU64,
    /// Acks for unknown sequences
    seq_not_found: AtomicU64,
    /// Last per-cycle processed count
    ack_level_updates: AtomicI64,
    /// Total processed entries
    ack_level_updates_total: AtomicU64,
    /// Last ledger size
    ledger_size: AtomicI64,
    /// Consumed transitions persisted
    consumed: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            skipped_messages: self.skipped_messages.load(Ordering::Relaxed),
            skipped_messages_total: self.skipped_messages_total.load(Ordering::Relaxed),
            reset_msgs: self.reset_msgs.load(Ordering::Relaxed),
            reset_msg_errors: self.reset_msg_errors.load(Ordering::Relaxed),
            seq_not_found: self.seq_not_found.load(Ordering::Relaxed),
            ack_level_updates: self.ack_level_updates.load(Ordering::Relaxed),
            ack_level_updates_total: self.ack_level_updates_total.load(Ordering::Relaxed),
            ledger_size: self.ledger_size.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
        }
    }
}

impl AckMetrics for MetricsRegistry {
    fn skipped_messages(&self, count: i64) {
        self.skipped_messages.store(count, Ordering::Relaxed);
        self.skipped_messages_total
            .fetch_add(count.max(0) as u64, Ordering::Relaxed);
    }

    fn reset_msg(&self) {
        self.reset_msgs.fetch_add(1, Ordering::Relaxed);
    }

    fn reset_msg_error(&self) {
        self.reset_msg_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn seq_not_found(&self) {
        self.seq_not_found.fetch_add(1, Ordering::Relaxed);
    }

    fn ack_level_update(&self, processed: i64) {
        self.ack_level_updates.store(processed, Ordering::Relaxed);
        self.ack_level_updates_total
            .fetch_add(processed.max(0) as u64, Ordering::Relaxed);
    }

    fn ledger_size(&self, size: i64) {
        self.ledger_size.store(size, Ordering::Relaxed);
    }

    fn consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub skipped_messages: i64,
    pub skipped_messages_total: u64,
    pub reset_msgs: u64,
    pub reset_msg_errors: u64,
    pub seq_not_found: u64,
    pub ack_level_updates: i64,
    pub ack_level_updates_total: u64,
    pub ledger_size: i64,
    pub consumed: u64,
}
