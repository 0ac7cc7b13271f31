//! Observable ack manager events
//!
//! Every log line carries one of these as its `event` field so log
//! pipelines can match on a stable name instead of message text.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Ack-level scheduler started
    AckMgrStarted,
    /// Ack manager stopped after its final flush
    AckMgrStopped,
    /// Extent marked sealed
    ExtentSealed,

    // Delivery path
    /// Upstream sequence went backwards
    DiscontinuityRollback,
    /// Upstream sequence skipped ahead (retention)
    DiscontinuitySkip,
    /// Read level rolled back for an undeliverable message
    ResetMsg,
    /// Rollback found a ledger that does not match (FATAL)
    ResetMsgCorruption,
    /// Read level past the ack id's sequence range
    AckIdSeqOverflow,

    // Ack path
    /// Ack received
    AckReceived,
    /// Ack id address differs from the delivered one
    AckAddressMismatch,
    /// Ack for a sequence the ledger does not hold
    AckSeqNotFound,

    // Ack level
    /// Ack level advanced
    AckLevelAdvanced,
    /// Ack level persisted
    AckLevelPersisted,
    /// Persisting the ack level failed
    AckLevelPersistFailed,
    /// Hole found while scanning the ledger
    LedgerHole,
    /// Sealed extent fully acked
    ExtentConsumed,
}

impl Event {
    /// Returns the event name as it appears in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::AckMgrStarted => "ACK_MGR_STARTED",
            Event::AckMgrStopped => "ACK_MGR_STOPPED",
            Event::ExtentSealed => "EXTENT_SEALED",
            Event::DiscontinuityRollback => "DISCONTINUITY_ROLLBACK",
            Event::DiscontinuitySkip => "DISCONTINUITY_SKIP",
            Event::ResetMsg => "RESET_MSG",
            Event::ResetMsgCorruption => "RESET_MSG_CORRUPTION",
            Event::AckIdSeqOverflow => "ACK_ID_SEQ_OVERFLOW",
            Event::AckReceived => "ACK_RECEIVED",
            Event::AckAddressMismatch => "ACK_ADDRESS_MISMATCH",
            Event::AckSeqNotFound => "ACK_SEQ_NOT_FOUND",
            Event::AckLevelAdvanced => "ACK_LEVEL_ADVANCED",
            Event::AckLevelPersisted => "ACK_LEVEL_PERSISTED",
            Event::AckLevelPersistFailed => "ACK_LEVEL_PERSIST_FAILED",
            Event::LedgerHole => "LEDGER_HOLE",
            Event::ExtentConsumed => "EXTENT_CONSUMED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
