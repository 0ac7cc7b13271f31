//! Ack id codec
//!
//! An ack id packs the session, the ack manager, the local sequence number
//! and the store address into 16 big-endian bytes, rendered as base64:
//!
//! ```text
//! | session (2) | ack mgr (2) | seq (4) | address (8) |
//! ```
//!
//! The ack manager id makes ids from different managers in one session
//! distinct even when their local sequences collide.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::errors::{AckError, AckResult};

const ACK_ID_LEN: usize = 16;

/// Opaque acknowledgment identifier handed to consumers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AckId(String);

impl AckId {
    /// Build an ack id from its parts.
    pub fn construct(session_id: u16, ack_mgr_id: u16, seq_num: u32, address: i64) -> Self {
        AckIdParts {
            session_id,
            ack_mgr_id,
            seq_num,
            address,
        }
        .encode()
    }

    /// Wrap an id received from a client; validated on `decode`.
    pub fn from_string(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Recover the parts this id was built from.
    pub fn decode(&self) -> AckResult<AckIdParts> {
        AckIdParts::decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded fields of an ack id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckIdParts {
    pub session_id: u16,
    pub ack_mgr_id: u16,
    pub seq_num: u32,
    pub address: i64,
}

impl AckIdParts {
    pub fn encode(&self) -> AckId {
        let mut bytes = [0u8; ACK_ID_LEN];
        bytes[0..2].copy_from_slice(&self.session_id.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.ack_mgr_id.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.seq_num.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.address.to_be_bytes());
        AckId(STANDARD.encode(bytes))
    }

    pub fn decode(raw: &str) -> AckResult<Self> {
        let bytes = STANDARD
            .decode(raw)
            .map_err(|e| AckError::InvalidAckId(format!("{}: {}", raw, e)))?;
        if bytes.len() != ACK_ID_LEN {
            return Err(AckError::InvalidAckId(format!(
                "{}: expected {} bytes, got {}",
                raw,
                ACK_ID_LEN,
                bytes.len()
            )));
        }

        let mut session = [0u8; 2];
        let mut mgr = [0u8; 2];
        let mut seq = [0u8; 4];
        let mut addr = [0u8; 8];
        session.copy_from_slice(&bytes[0..2]);
        mgr.copy_from_slice(&bytes[2..4]);
        seq.copy_from_slice(&bytes[4..8]);
        addr.copy_from_slice(&bytes[8..16]);

        Ok(Self {
            session_id: u16::from_be_bytes(session),
            ack_mgr_id: u16::from_be_bytes(mgr),
            seq_num: u32::from_be_bytes(seq),
            address: i64::from_be_bytes(addr),
        })
    }
}
