//! Metadata client boundary
//!
//! The ack manager only ever upserts its consumer-group/extent progress.
//! Each request carries absolute levels, so resending one is harmless.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::MetadataResult;
use crate::ackmgr::{SequenceNumber, StoreAddress};

/// Consumer-group extent status as stored in metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtentStatus {
    /// Still being consumed
    Open,
    /// Sealed and fully acked; terminal
    Consumed,
}

impl ExtentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtentStatus::Open => "OPEN",
            ExtentStatus::Consumed => "CONSUMED",
        }
    }
}

impl fmt::Display for ExtentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ack-level upsert for one consumer group on one extent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAckOffsetRequest {
    pub output_host_id: Uuid,
    pub consumer_group_id: Uuid,
    pub extent_id: Uuid,
    pub connected_store_id: Uuid,
    pub ack_level_address: StoreAddress,
    pub ack_level_seq: SequenceNumber,
    pub read_level_address: StoreAddress,
    pub read_level_seq: SequenceNumber,
    pub status: ExtentStatus,
    pub ack_level_seq_rate: f64,
    pub read_level_seq_rate: f64,
}

/// The metadata store as seen by an ack manager
///
/// Implementations are shared across managers and must be stateless from
/// the caller's point of view.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Upsert the ack and read levels of a consumer-group extent.
    async fn set_ack_offset(&self, request: SetAckOffsetRequest) -> MetadataResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&ExtentStatus::Open).unwrap(), "\"OPEN\"");
        assert_eq!(
            serde_json::to_string(&ExtentStatus::Consumed).unwrap(),
            "\"CONSUMED\""
        );
    }
}
