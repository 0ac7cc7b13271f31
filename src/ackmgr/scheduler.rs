//! Ack-level scheduler
//!
//! A tokio task ticks every `ack_level_interval` and runs one cycle of
//! `update_ack_level`. Shutdown wins over a pending tick and always gets
//! one final cycle so pending acks are flushed before teardown.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, Instrument};

use super::manager::AckManager;
use crate::observability::Event;

/// Handle to a running scheduler task
pub(super) struct Scheduler {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl AckManager {
    /// Start the periodic ack-level task. No-op if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.scheduler.lock();
        if slot.is_some() {
            return;
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let manager = Arc::clone(self);
        let handle = tokio::spawn(
            async move { manager.manage_ack_level(shutdown_rx).await }.instrument(self.span.clone()),
        );
        *slot = Some(Scheduler {
            shutdown_tx,
            handle,
        });

        let _enter = self.span.enter();
        info!(
            event = %Event::AckMgrStarted,
            interval_ms = self.config.ack_level_interval.as_millis() as u64,
            "ack manager started"
        );
    }

    /// Stop the scheduler, wait for its final cycle, and log final state.
    ///
    /// A manager that was never started still gets one final cycle.
    pub async fn stop(&self) {
        let scheduler = self.scheduler.lock().take();
        match scheduler {
            Some(scheduler) => {
                let _ = scheduler.shutdown_tx.send(());
                if let Err(e) = scheduler.handle.await {
                    let _enter = self.span.enter();
                    error!(error = %e, "ack level task failed");
                }
            }
            None => {
                self.update_ack_level().await;
            }
        }

        let state = self.get_ack_mgr_state();
        let _enter = self.span.enter();
        info!(event = %Event::AckMgrStopped, state = %state, "ack manager stopped");
    }

    /// Whether the scheduler task is running.
    pub fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .map(|s| !s.handle.is_finished())
            .unwrap_or(false)
    }

    async fn manage_ack_level(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let period = self.config.ack_level_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    self.update_ack_level().await;
                    return;
                }

                _ = ticker.tick() => {
                    self.update_ack_level().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use uuid::Uuid;

    use crate::ackmgr::{
        AckManagerDeps, AckManagerIdentity, AckReceivers, ConsumerGroupExtent, SequenceNumber,
        StoreAddress,
    };
    use crate::config::AckManagerConfig;
    use crate::metadata::InMemoryMetadataClient;
    use crate::observability::MetricsRegistry;

    fn manager(
        interval: Duration,
    ) -> (Arc<AckManager>, Arc<InMemoryMetadataClient>, AckReceivers) {
        let metadata = Arc::new(InMemoryMetadataClient::new());
        let (deps, rx) = AckManagerDeps::with_channels(
            metadata.clone(),
            Arc::new(MetricsRegistry::new()),
            16,
            1,
        );
        let identity = AckManagerIdentity {
            output_host_id: Uuid::new_v4(),
            consumer_group_id: Uuid::new_v4(),
            extent_id: Uuid::new_v4(),
            connected_store_id: Uuid::new_v4(),
            session_id: 1,
            ack_mgr_id: 1,
        };
        let config = AckManagerConfig {
            ack_level_interval: interval,
            metadata_timeout: Duration::from_secs(10),
        };
        let mgr = AckManager::new(identity, config, &ConsumerGroupExtent::fresh(), deps);
        (Arc::new(mgr), metadata, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_persists_acked_levels() {
        let (mgr, metadata, _rx) = manager(Duration::from_secs(5));
        let id = mgr.get_next_ack_id(StoreAddress(100), SequenceNumber(1));
        mgr.acknowledge(id, false).await.unwrap();

        mgr.start();
        assert!(mgr.is_running());
        assert_eq!(metadata.request_count(), 0);

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(metadata.request_count(), 1);

        mgr.stop().await;
        assert!(!mgr.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_flushes_before_first_tick() {
        let (mgr, metadata, _rx) = manager(Duration::from_secs(60));
        mgr.start();

        let id = mgr.get_next_ack_id(StoreAddress(100), SequenceNumber(1));
        mgr.acknowledge(id, false).await.unwrap();

        mgr.stop().await;
        assert_eq!(metadata.request_count(), 1);
        assert_eq!(mgr.levels().ack_level, SequenceNumber(1));
    }

    #[tokio::test]
    async fn test_stop_without_start_still_flushes() {
        let (mgr, metadata, _rx) = manager(Duration::from_secs(5));
        let id = mgr.get_next_ack_id(StoreAddress(100), SequenceNumber(1));
        mgr.acknowledge(id, false).await.unwrap();

        mgr.stop().await;
        assert_eq!(metadata.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (mgr, _metadata, _rx) = manager(Duration::from_secs(5));
        mgr.start();
        mgr.start();
        assert!(mgr.is_running());
        mgr.stop().await;
    }
}
