//! In-memory metadata store
//!
//! Keeps every request it receives plus the latest one per
//! (consumer group, extent). Used by the simulator and by tests, which can
//! make it fail on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::client::{MetadataClient, SetAckOffsetRequest};
use super::errors::{MetadataError, MetadataResult};

#[derive(Debug, Default)]
pub struct InMemoryMetadataClient {
    history: Mutex<Vec<SetAckOffsetRequest>>,
    latest: Mutex<HashMap<(Uuid, Uuid), SetAckOffsetRequest>>,
    fail_next: AtomicUsize,
}

impl InMemoryMetadataClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls fail with `Unavailable`.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Every request accepted so far, oldest first.
    pub fn requests(&self) -> Vec<SetAckOffsetRequest> {
        self.history.lock().clone()
    }

    /// Number of accepted requests.
    pub fn request_count(&self) -> usize {
        self.history.lock().len()
    }

    /// Current stored row for a consumer-group extent.
    pub fn latest(&self, consumer_group_id: Uuid, extent_id: Uuid) -> Option<SetAckOffsetRequest> {
        self.latest
            .lock()
            .get(&(consumer_group_id, extent_id))
            .cloned()
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MetadataClient for InMemoryMetadataClient {
    async fn set_ack_offset(&self, request: SetAckOffsetRequest) -> MetadataResult<()> {
        if self.take_failure() {
            return Err(MetadataError::Unavailable("injected failure".to_string()));
        }

        self.latest
            .lock()
            .insert((request.consumer_group_id, request.extent_id), request.clone());
        self.history.lock().push(request);
        Ok(())
    }
}
