//! # Ack Manager
//!
//! One per (consumer group, extent) open on this output host.
//!
//! ## Invariants
//!
//! - `ack_level <= read_level`, and `ack_level` never decreases.
//! - After each advance the ledger only holds local sequences in
//!   `(ack_level, read_level]`.
//! - The ack level only moves through an unbroken run of acked entries.
//! - No lock is held across a metadata call or a channel send.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, info_span, Span};

use super::ack_id::AckId;
use super::deps::AckManagerDeps;
use super::errors::{AckError, AckResult};
use super::ledger::{DeliveryLedger, DeliveryRecord};
use super::levels::Levels;
use super::scheduler::Scheduler;
use super::state::AckMgrState;
use super::types::{
    AckManagerIdentity, ConsumerGroupExtent, SequenceNumber, StoreAddress, TimestampedAckId,
};
use crate::config::AckManagerConfig;
use crate::metadata::{ExtentStatus, MetadataError, SetAckOffsetRequest};
use crate::observability::Event;

/// State guarded by the manager lock
#[derive(Debug)]
struct AckState {
    ledger: DeliveryLedger,
    sealed: bool,
    current: Levels,
    /// Last snapshot the metadata store accepted
    prev: Levels,
    /// Last persistence attempt failed
    persist_pending: bool,
}

/// What one ack-level cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Entries the ack level moved past
    pub processed: i64,
    /// Sealed and fully acked
    pub consumed: bool,
    /// A request was sent and accepted
    pub persisted: bool,
    /// Ack level after the cycle
    pub ack_level: SequenceNumber,
    /// Why persisting failed, if it did
    pub persist_error: Option<MetadataError>,
}

/// Result of the locked part of a cycle
struct Advance {
    processed: i64,
    consumed: bool,
    ack_level: SequenceNumber,
    request: Option<(SetAckOffsetRequest, Levels)>,
    ledger_size: Option<usize>,
}

enum AckLookup {
    NotFound,
    Mismatch(StoreAddress),
    Matched,
}

/// Tracks deliveries and acks for one consumer-group extent
pub struct AckManager {
    identity: AckManagerIdentity,
    pub(super) config: AckManagerConfig,
    deps: AckManagerDeps,
    state: RwLock<AckState>,
    last_acked_seq: AtomicI64,
    pub(super) scheduler: Mutex<Option<Scheduler>>,
    pub(super) span: Span,
}

impl AckManager {
    /// Create a manager seeded from the last persisted levels.
    pub fn new(
        identity: AckManagerIdentity,
        config: AckManagerConfig,
        seed: &ConsumerGroupExtent,
        deps: AckManagerDeps,
    ) -> Self {
        let levels = Levels::seeded(seed, Utc::now());
        let span = info_span!(
            "ack_mgr",
            consumer_group = %identity.consumer_group_id,
            extent = %identity.extent_id,
            ack_mgr_id = identity.ack_mgr_id,
        );

        Self {
            identity,
            config,
            deps,
            state: RwLock::new(AckState {
                ledger: DeliveryLedger::new(),
                sealed: false,
                current: levels,
                prev: levels,
                persist_pending: false,
            }),
            last_acked_seq: AtomicI64::new(SequenceNumber::NONE.value()),
            scheduler: Mutex::new(None),
            span,
        }
    }

    pub fn identity(&self) -> &AckManagerIdentity {
        &self.identity
    }

    /// Record a delivery and hand out its ack id.
    ///
    /// This is the only place the read level advances. The delivery path
    /// calls it once per message, never concurrently for the same message.
    pub fn get_next_ack_id(&self, address: StoreAddress, sequence: SequenceNumber) -> AckId {
        let _enter = self.span.enter();
        let mut state = self.state.write();

        let prev_upstream = state.current.read_level_seq;
        let read_level = state.current.read_level.next();
        state.current.read_level = read_level;
        state.current.read_level_addr = address;

        // Upstream numbering continues from the previous delivery.
        let expected = if prev_upstream.value() > 0 {
            prev_upstream.next()
        } else {
            sequence
        };

        // Zero means the source numbers messages discontinuously; skip the check.
        if !sequence.is_unchecked() && expected != sequence {
            let skipped = sequence - expected;
            if skipped < 0 {
                // Negative deltas are not representable as a gauge.
                error!(
                    event = %Event::DiscontinuityRollback,
                    got_seq = %sequence,
                    got_address = %address,
                    expected_seq = %expected,
                    read_level = %read_level,
                    "negative discontinuity detected (rollback)"
                );
            } else {
                // Counted again if the host restarts before the ack level
                // passes the gap.
                debug!(
                    event = %Event::DiscontinuitySkip,
                    skipped,
                    read_level = %read_level,
                    "upstream skipped messages"
                );
                self.deps.metrics.skipped_messages(skipped);
            }
        }

        state.current.read_level_seq = sequence;
        state
            .ledger
            .insert(read_level, DeliveryRecord::new(address, sequence));

        // The ack id only has four bytes for the local sequence.
        let wire_seq = match u32::try_from(read_level.value()) {
            Ok(seq) => seq,
            Err(_) => {
                error!(
                    event = %Event::AckIdSeqOverflow,
                    read_level = %read_level,
                    "read level does not fit in an ack id; acks for it will not match"
                );
                read_level.value() as u32
            }
        };

        AckId::construct(
            self.identity.session_id,
            self.identity.ack_mgr_id,
            wire_seq,
            address.value(),
        )
    }

    /// Undo the last `get_next_ack_id` for a message that never reached
    /// the delivery layer.
    ///
    /// # Panics
    ///
    /// If the entry at the read level is missing or was delivered from a
    /// different address. The ledger is corrupt and the process must not
    /// continue with it.
    pub fn reset_msg(&self, address: StoreAddress) {
        let _enter = self.span.enter();
        let mut state = self.state.write();

        let read_level = state.current.read_level;
        let recorded = state.ledger.get(read_level).map(|record| record.addr);

        if recorded != Some(address) {
            self.deps.metrics.reset_msg_error();
            error!(
                event = %Event::ResetMsgCorruption,
                read_level = %read_level,
                expected_address = ?recorded.map(|a| a.value()),
                address = %address,
                "reset_msg: addresses don't match"
            );
            drop(state);
            panic!(
                "ack ledger corrupted at read level {}: expected address {:?}, got {}",
                read_level, recorded, address
            );
        }

        self.deps.metrics.reset_msg();
        state.ledger.remove(read_level);

        let new_level = read_level.prev();
        let (addr, seq) = match state.ledger.get(new_level) {
            Some(record) => (record.addr, record.upstream_seq),
            None => (state.current.ack_level_addr, state.current.ack_level_seq),
        };
        state.current.read_level = new_level;
        state.current.read_level_addr = addr;
        state.current.read_level_seq = seq;

        debug!(event = %Event::ResetMsg, read_level = %new_level, "read level rolled back");
    }

    /// Mark the extent sealed. Idempotent.
    pub fn notify_sealed(&self) {
        let mut state = self.state.write();
        if !state.sealed {
            state.sealed = true;
            let _enter = self.span.enter();
            info!(event = %Event::ExtentSealed, "extent sealed");
        }
    }

    /// Record an ack or nack and forward it to the message cache.
    ///
    /// `seq_num` and `address` are the values embedded in `ack_id`. An ack
    /// for an unknown sequence is counted and dropped. An address mismatch
    /// is reported back and not forwarded.
    pub async fn acknowledge_message(
        &self,
        ack_id: AckId,
        seq_num: u32,
        address: StoreAddress,
        is_nack: bool,
    ) -> AckResult<()> {
        let seq = SequenceNumber::from(seq_num);

        let lookup = {
            let _enter = self.span.enter();
            let state = self.state.read();
            match state.ledger.get(seq) {
                None => {
                    self.deps.metrics.seq_not_found();
                    debug!(event = %Event::AckSeqNotFound, seq = %seq, "ack for unknown sequence");
                    AckLookup::NotFound
                }
                Some(record) if record.addr != address => {
                    error!(
                        event = %Event::AckAddressMismatch,
                        seq = %seq,
                        address = %address,
                        expected = %record.addr,
                        "ack address does not match"
                    );
                    AckLookup::Mismatch(record.addr)
                }
                Some(record) => {
                    debug!(event = %Event::AckReceived, seq = %seq, is_nack, "msg ack");
                    if !is_nack {
                        record.mark_acked();
                        self.last_acked_seq.fetch_max(seq.value(), Ordering::AcqRel);
                    }
                    AckLookup::Matched
                }
            }
        };

        match lookup {
            AckLookup::NotFound => Ok(()),
            AckLookup::Mismatch(expected) => Err(AckError::AddressMismatch {
                seq,
                expected,
                got: address,
            }),
            AckLookup::Matched => {
                let channel = if is_nack {
                    &self.deps.nack_tx
                } else {
                    &self.deps.ack_tx
                };
                channel
                    .send(TimestampedAckId::now(ack_id))
                    .await
                    .map_err(|_| AckError::ChannelClosed)
            }
        }
    }

    /// Decode `ack_id` and acknowledge it.
    pub async fn acknowledge(&self, ack_id: AckId, is_nack: bool) -> AckResult<()> {
        let parts = ack_id.decode()?;
        self.acknowledge_message(ack_id, parts.seq_num, StoreAddress(parts.address), is_nack)
            .await
    }

    /// Advance the ack level and persist it if anything changed.
    ///
    /// Persistence failures are logged and retried on the next cycle with
    /// the same or newer levels.
    pub async fn update_ack_level(&self) -> CycleOutcome {
        let advance = self.advance();

        let mut outcome = CycleOutcome {
            processed: advance.processed,
            consumed: advance.consumed,
            persisted: false,
            ack_level: advance.ack_level,
            persist_error: None,
        };

        if let Some((request, snapshot)) = advance.request {
            let ack_level_address = request.ack_level_address;
            let result = match tokio::time::timeout(
                self.config.metadata_timeout,
                self.deps.metadata.set_ack_offset(request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(MetadataError::Timeout(self.config.metadata_timeout)),
            };

            let _enter = self.span.enter();
            match result {
                Ok(()) => {
                    outcome.persisted = true;
                    self.state.write().prev = snapshot;
                    self.deps.metrics.ack_level_update(advance.processed);
                    debug!(
                        event = %Event::AckLevelPersisted,
                        ack_level = %advance.ack_level,
                        processed = advance.processed,
                        "ack level persisted"
                    );
                    if advance.consumed {
                        self.deps.metrics.consumed();
                        self.notify_consumed(ack_level_address);
                    }
                }
                Err(e) => {
                    error!(
                        event = %Event::AckLevelPersistFailed,
                        error = %e,
                        ack_level_address = %ack_level_address,
                        "error updating ack level"
                    );
                    outcome.persist_error = Some(e);
                    self.state.write().persist_pending = true;
                }
            }
        }

        if let Some(size) = advance.ledger_size {
            self.deps.metrics.ledger_size(size as i64);
        }

        outcome
    }

    /// Locked part of a cycle: move the ack level through the acked run
    /// and build the persistence request.
    fn advance(&self) -> Advance {
        let _enter = self.span.enter();
        let mut state = self.state.write();

        let mut processed = 0i64;
        let stop = state.ledger.scan_end(state.current.ack_level);
        let mut curr = state.current.ack_level.next();
        while curr <= stop {
            let (addr, upstream_seq) = match state.ledger.get(curr) {
                Some(record) if record.is_acked() => (record.addr, record.upstream_seq),
                _ => break,
            };
            state.ledger.remove(curr);
            state.current.ack_level = curr;
            state.current.ack_level_addr = addr;
            state.current.ack_level_seq = upstream_seq;
            processed += 1;
            curr = curr.next();
        }

        let consumed = state.sealed && state.current.ack_level == state.current.read_level;
        if consumed {
            debug!("extent sealed and consumed");
        }

        let mut request = None;
        if processed > 0 || consumed || state.persist_pending {
            state.persist_pending = false;
            debug!(
                event = %Event::AckLevelAdvanced,
                ack_level = %state.current.ack_level,
                processed,
                "ack level advanced"
            );

            state.current.as_of = Utc::now();
            let snapshot = if consumed {
                state.current.with_zero_rates()
            } else {
                state.current.with_rates_from(&state.prev)
            };
            state.current = snapshot;

            let body = SetAckOffsetRequest {
                output_host_id: self.identity.output_host_id,
                consumer_group_id: self.identity.consumer_group_id,
                extent_id: self.identity.extent_id,
                connected_store_id: self.identity.connected_store_id,
                ack_level_address: snapshot.ack_level_addr,
                ack_level_seq: snapshot.ack_level_seq,
                read_level_address: snapshot.read_level_addr,
                read_level_seq: snapshot.read_level_seq,
                status: if consumed {
                    ExtentStatus::Consumed
                } else {
                    ExtentStatus::Open
                },
                ack_level_seq_rate: snapshot.ack_rate,
                read_level_seq_rate: snapshot.read_rate,
            };
            request = Some((body, snapshot));
        }

        Advance {
            processed,
            consumed,
            ack_level: state.current.ack_level,
            request,
            ledger_size: (!state.ledger.is_empty()).then(|| state.ledger.len()),
        }
    }

    /// Tell the extent lifecycle manager without ever waiting on it. A full
    /// or closed channel is retried on the next cycle, since the stop path
    /// may be the one that would drain it.
    fn notify_consumed(&self, ack_level_address: StoreAddress) {
        match self.deps.consumed_tx.try_send(true) {
            Ok(()) => info!(
                event = %Event::ExtentConsumed,
                ack_level_address = %ack_level_address,
                "extent consumed"
            ),
            Err(_) => debug!("consumed notification not delivered; retrying next cycle"),
        }
    }

    /// Read level and its address.
    pub fn get_current_read_level(&self) -> (StoreAddress, SequenceNumber) {
        let state = self.state.read();
        (state.current.read_level_addr, state.current.read_level)
    }

    /// Copy of the current levels.
    pub fn levels(&self) -> Levels {
        self.state.read().current
    }

    pub fn is_sealed(&self) -> bool {
        self.state.read().sealed
    }

    /// Entries currently tracked.
    pub fn ledger_len(&self) -> usize {
        self.state.read().ledger.len()
    }

    pub fn last_acked_seq(&self) -> SequenceNumber {
        SequenceNumber(self.last_acked_seq.load(Ordering::Acquire))
    }

    /// Diagnostic snapshot.
    pub fn get_ack_mgr_state(&self) -> AckMgrState {
        let state = self.state.read();
        let tally = state.ledger.tally(state.current.ack_level);
        if tally.missing > 0 {
            let _enter = self.span.enter();
            error!(
                event = %Event::LedgerHole,
                ack_level = %state.current.ack_level,
                missing = tally.missing,
                "sequence number not found in the ack mgr"
            );
        }

        AckMgrState {
            ack_mgr_id: self.identity.ack_mgr_id,
            is_sealed: state.sealed,
            read_level_seq: state.current.read_level,
            ack_level_seq: state.current.ack_level,
            read_level_offset: state.current.read_level_addr,
            ack_level_offset: state.current.ack_level_addr,
            last_ack_level_update_time: state.current.as_of,
            last_acked_seq: self.last_acked_seq(),
            num_acked_msgs: tally.acked,
            num_unacked_msgs: tally.unacked,
        }
    }
}
