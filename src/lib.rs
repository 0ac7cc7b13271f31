//! outputhost - acknowledgment tracking for a message broker output host
//!
//! Tracks deliveries and acks per consumer-group extent, advances and
//! persists the ack level, and reports when a sealed extent is consumed.

pub mod ackmgr;
pub mod cli;
pub mod config;
pub mod metadata;
pub mod observability;
