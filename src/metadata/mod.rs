//! # Metadata Store Boundary
//!
//! The ack manager persists consumer-group extent progress through the
//! `MetadataClient` trait. The store itself lives elsewhere; an in-memory
//! implementation is provided for the simulator and tests.

mod client;
mod errors;
mod memory;

pub use client::{ExtentStatus, MetadataClient, SetAckOffsetRequest};
pub use errors::{MetadataError, MetadataResult};
pub use memory::InMemoryMetadataClient;
