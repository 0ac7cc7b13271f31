//! Ack Level Invariant Tests
//!
//! Tests for invariants:
//! - The ack level never passes the read level
//! - The ack level never moves backwards
//! - The ack level only moves through an unbroken run of acked deliveries
//! - Persisted levels carry the upstream sequence and address at each level

use std::sync::Arc;

use outputhost::ackmgr::{
    AckId, AckManager, AckManagerDeps, AckManagerIdentity, AckReceivers, ConsumerGroupExtent,
    SequenceNumber, StoreAddress,
};
use outputhost::config::AckManagerConfig;
use outputhost::metadata::{ExtentStatus, InMemoryMetadataClient};
use outputhost::observability::MetricsRegistry;
use uuid::Uuid;

// =============================================================================
// Test Utilities
// =============================================================================

struct Fixture {
    mgr: AckManager,
    metadata: Arc<InMemoryMetadataClient>,
    metrics: Arc<MetricsRegistry>,
    _rx: AckReceivers,
}

fn create_fixture(seed: ConsumerGroupExtent) -> Fixture {
    let metadata = Arc::new(InMemoryMetadataClient::new());
    let metrics = Arc::new(MetricsRegistry::new());
    let (deps, rx) = AckManagerDeps::with_channels(metadata.clone(), metrics.clone(), 1024, 1);
    let identity = AckManagerIdentity {
        output_host_id: Uuid::new_v4(),
        consumer_group_id: Uuid::new_v4(),
        extent_id: Uuid::new_v4(),
        connected_store_id: Uuid::new_v4(),
        session_id: 2,
        ack_mgr_id: 11,
    };
    Fixture {
        mgr: AckManager::new(identity, AckManagerConfig::default(), &seed, deps),
        metadata,
        metrics,
        _rx: rx,
    }
}

/// Deliver upstream sequences `from..=to` at address `seq * 10`.
fn deliver(mgr: &AckManager, from: i64, to: i64) -> Vec<AckId> {
    (from..=to)
        .map(|seq| mgr.get_next_ack_id(StoreAddress(seq * 10), SequenceNumber(seq)))
        .collect()
}

fn assert_levels_ordered(mgr: &AckManager) {
    let levels = mgr.levels();
    assert!(
        levels.ack_level <= levels.read_level,
        "ack level {} passed read level {}",
        levels.ack_level,
        levels.read_level
    );
}

// =============================================================================
// Ack level bounded by read level
// =============================================================================

/// Acking everything moves the ack level exactly up to the read level.
#[tokio::test]
async fn test_ack_level_reaches_but_never_passes_read_level() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let ids = deliver(&f.mgr, 1, 10);

    for id in ids {
        f.mgr.acknowledge(id, false).await.unwrap();
    }
    let outcome = f.mgr.update_ack_level().await;

    assert_eq!(outcome.processed, 10);
    assert_eq!(outcome.ack_level, SequenceNumber(10));
    assert_eq!(f.mgr.levels().read_level, SequenceNumber(10));
    assert_eq!(f.mgr.ledger_len(), 0);
    assert_levels_ordered(&f.mgr);
}

/// An ack for a sequence beyond the read level is counted and ignored.
#[tokio::test]
async fn test_ack_beyond_read_level_is_ignored() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    deliver(&f.mgr, 1, 3);

    let bogus = AckId::construct(2, 11, 9, 90);
    f.mgr.acknowledge(bogus, false).await.unwrap();
    let outcome = f.mgr.update_ack_level().await;

    assert_eq!(outcome.processed, 0);
    assert_eq!(f.metrics.snapshot().seq_not_found, 1);
    assert_levels_ordered(&f.mgr);
}

// =============================================================================
// Ack level is monotonic
// =============================================================================

/// Repeated cycles with interleaved deliveries never move the level back.
#[tokio::test]
async fn test_ack_level_monotonic_across_cycles() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let mut last = f.mgr.levels().ack_level;

    for round in 0..5i64 {
        let ids = deliver(&f.mgr, round * 4 + 1, round * 4 + 4);
        // Ack all but the last delivery of each round; it gets acked next round.
        for id in ids.iter().take(3) {
            f.mgr.acknowledge(id.clone(), false).await.unwrap();
        }
        let outcome = f.mgr.update_ack_level().await;
        assert!(outcome.ack_level >= last);
        last = outcome.ack_level;

        f.mgr.acknowledge(ids[3].clone(), false).await.unwrap();
        assert_levels_ordered(&f.mgr);
    }

    let outcome = f.mgr.update_ack_level().await;
    assert_eq!(outcome.ack_level, SequenceNumber(20));

    let persisted: Vec<i64> = f
        .metadata
        .requests()
        .iter()
        .map(|r| r.ack_level_seq.value())
        .collect();
    assert!(persisted.windows(2).all(|w| w[0] <= w[1]));
}

/// Re-acking an already-passed sequence does not rewind anything.
#[tokio::test]
async fn test_late_duplicate_ack_does_not_rewind() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let ids = deliver(&f.mgr, 1, 3);
    for id in &ids {
        f.mgr.acknowledge(id.clone(), false).await.unwrap();
    }
    f.mgr.update_ack_level().await;

    f.mgr.acknowledge(ids[0].clone(), false).await.unwrap();
    let outcome = f.mgr.update_ack_level().await;

    assert_eq!(outcome.ack_level, SequenceNumber(3));
    assert_eq!(outcome.processed, 0);
    assert_eq!(f.metrics.snapshot().seq_not_found, 1);
}

// =============================================================================
// Ack level moves only through contiguous acks
// =============================================================================

/// A single unacked delivery holds the level until it is acked.
#[tokio::test]
async fn test_hole_blocks_advance_until_filled() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let ids = deliver(&f.mgr, 1, 6);

    for i in [0usize, 1, 3, 4, 5] {
        f.mgr.acknowledge(ids[i].clone(), false).await.unwrap();
    }
    let first = f.mgr.update_ack_level().await;
    assert_eq!(first.ack_level, SequenceNumber(2));

    let state = f.mgr.get_ack_mgr_state();
    assert_eq!(state.num_acked_msgs, 3);
    assert_eq!(state.num_unacked_msgs, 1);

    f.mgr.acknowledge(ids[2].clone(), false).await.unwrap();
    let second = f.mgr.update_ack_level().await;
    assert_eq!(second.processed, 4);
    assert_eq!(second.ack_level, SequenceNumber(6));
}

/// Nacks never count as acked for the level.
#[tokio::test]
async fn test_nack_does_not_advance_level() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let ids = deliver(&f.mgr, 1, 2);

    f.mgr.acknowledge(ids[0].clone(), true).await.unwrap();
    f.mgr.acknowledge(ids[1].clone(), false).await.unwrap();

    let outcome = f.mgr.update_ack_level().await;
    assert_eq!(outcome.ack_level, SequenceNumber(0));
    assert!(!outcome.persisted);
}

/// Upstream gaps do not create holes; local sequences stay contiguous.
#[tokio::test]
async fn test_upstream_gaps_do_not_block_level() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let mut ids = deliver(&f.mgr, 1, 2);
    ids.extend(deliver(&f.mgr, 10, 11));

    assert_eq!(f.metrics.snapshot().skipped_messages_total, 7);

    for id in ids {
        f.mgr.acknowledge(id, false).await.unwrap();
    }
    let outcome = f.mgr.update_ack_level().await;
    assert_eq!(outcome.ack_level, SequenceNumber(4));

    let latest = f.metadata.requests().pop().unwrap();
    assert_eq!(latest.ack_level_seq, SequenceNumber(11));
    assert_eq!(latest.ack_level_address, StoreAddress(110));
}

// =============================================================================
// Persisted levels
// =============================================================================

/// Persisted request carries both levels with their addresses.
#[tokio::test]
async fn test_persisted_request_matches_levels() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let ids = deliver(&f.mgr, 1, 5);
    for id in ids.iter().take(2) {
        f.mgr.acknowledge(id.clone(), false).await.unwrap();
    }
    f.mgr.update_ack_level().await;

    let latest = f.metadata.requests().pop().unwrap();
    assert_eq!(latest.ack_level_seq, SequenceNumber(2));
    assert_eq!(latest.ack_level_address, StoreAddress(20));
    assert_eq!(latest.read_level_seq, SequenceNumber(5));
    assert_eq!(latest.read_level_address, StoreAddress(50));
    assert_eq!(latest.status, ExtentStatus::Open);
    assert!(latest.ack_level_seq_rate >= 0.0);
}

/// A manager reseeded from a persisted row continues at the next sequence.
#[tokio::test]
async fn test_restart_from_persisted_row() {
    let f = create_fixture(ConsumerGroupExtent::fresh());
    let ids = deliver(&f.mgr, 1, 3);
    for id in ids {
        f.mgr.acknowledge(id, false).await.unwrap();
    }
    f.mgr.update_ack_level().await;
    let row = f.metadata.requests().pop().unwrap();

    let restarted = create_fixture(ConsumerGroupExtent {
        ack_level_seq: row.ack_level_seq,
        ack_level_address: row.ack_level_address,
        read_level_seq: row.read_level_seq,
        read_level_address: row.read_level_address,
    });
    let id = restarted
        .mgr
        .get_next_ack_id(StoreAddress(40), SequenceNumber(4));

    assert_eq!(id.decode().unwrap().seq_num, 4);
    assert_eq!(restarted.metrics.snapshot().skipped_messages_total, 0);
    assert_levels_ordered(&restarted.mgr);
}
