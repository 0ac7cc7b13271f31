//! Diagnostic snapshot of an ack manager

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{SequenceNumber, StoreAddress};

/// Point-in-time view for operators; not used on any critical path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AckMgrState {
    pub ack_mgr_id: u16,
    pub is_sealed: bool,
    pub read_level_seq: SequenceNumber,
    pub ack_level_seq: SequenceNumber,
    pub read_level_offset: StoreAddress,
    pub ack_level_offset: StoreAddress,
    pub last_ack_level_update_time: DateTime<Utc>,
    pub last_acked_seq: SequenceNumber,
    pub num_acked_msgs: i64,
    pub num_unacked_msgs: i64,
}

impl fmt::Display for AckMgrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_json() {
        let state = AckMgrState {
            ack_mgr_id: 3,
            is_sealed: true,
            read_level_seq: SequenceNumber(10),
            ack_level_seq: SequenceNumber(7),
            read_level_offset: StoreAddress(1000),
            ack_level_offset: StoreAddress(700),
            last_ack_level_update_time: Utc::now(),
            last_acked_seq: SequenceNumber(9),
            num_acked_msgs: 1,
            num_unacked_msgs: 2,
        };

        let parsed: serde_json::Value = serde_json::from_str(&state.to_string()).unwrap();
        assert_eq!(parsed["ack_mgr_id"], 3);
        assert_eq!(parsed["is_sealed"], true);
        assert_eq!(parsed["ack_level_seq"], 7);
        assert_eq!(parsed["num_unacked_msgs"], 2);
    }
}
