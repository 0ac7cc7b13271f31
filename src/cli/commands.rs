//! CLI command implementations

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ackmgr::{
    AckId, AckManager, AckManagerDeps, AckManagerIdentity, AckMgrState,
    ConsumerGroupExtent, SequenceNumber, StoreAddress, TimestampedAckId,
};
use crate::config::OutputHostConfig;
use crate::metadata::{InMemoryMetadataClient, SetAckOffsetRequest};
use crate::observability::{init_logging, MetricsRegistry, MetricsSnapshot};

use super::args::{Cli, Command};
use super::errors::CliResult;
use super::io::{write_error, write_response};

/// Store addresses grow by this much per upstream sequence.
const ADDRESS_STRIDE: i64 = 1024;

/// Knobs for one simulated consumer-group extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationPlan {
    pub messages: u32,
    pub gap_every: u32,
    pub gap_size: i64,
    pub nack_every: u32,
    pub seed: Option<u64>,
}

/// What the simulation observed
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub requests: Vec<SetAckOffsetRequest>,
    pub state: AckMgrState,
    pub metrics: MetricsSnapshot,
    pub acks_forwarded: u64,
    pub nacks_forwarded: u64,
    pub consumed: bool,
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match run_command(cli.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::EncodeAckId {
            session,
            ack_mgr,
            seq,
            address,
        } => encode_ack_id(session, ack_mgr, seq, address),
        Command::DecodeAckId { ack_id } => decode_ack_id(&ack_id),
        Command::Simulate {
            config,
            messages,
            gap_every,
            gap_size,
            nack_every,
            seed,
        } => {
            let plan = SimulationPlan {
                messages,
                gap_every,
                gap_size,
                nack_every,
                seed,
            };
            simulate(config.as_deref(), plan)
        }
    }
}

pub fn encode_ack_id(session: u16, ack_mgr: u16, seq: u32, address: i64) -> CliResult<()> {
    let ack_id = AckId::construct(session, ack_mgr, seq, address);
    write_response(json!({ "ack_id": ack_id }))
}

pub fn decode_ack_id(raw: &str) -> CliResult<()> {
    let parts = AckId::from_string(raw).decode()?;
    write_response(serde_json::to_value(parts)?)
}

/// Load config, set up logging, and run the simulation on a fresh runtime.
pub fn simulate(config_path: Option<&Path>, plan: SimulationPlan) -> CliResult<()> {
    let config = match config_path {
        Some(path) => OutputHostConfig::load(path)?,
        None => OutputHostConfig::default(),
    };

    if let Err(e) = init_logging(&config.log_settings()) {
        eprintln!("{}", e);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let report = runtime.block_on(run_simulation(&config, plan))?;
    write_response(serde_json::to_value(report)?)
}

/// Deliver, ack in shuffled order, seal, and stop one ack manager.
pub async fn run_simulation(
    config: &OutputHostConfig,
    plan: SimulationPlan,
) -> CliResult<SimulationReport> {
    let metadata = Arc::new(InMemoryMetadataClient::new());
    let metrics = Arc::new(MetricsRegistry::new());
    let (deps, receivers) = AckManagerDeps::with_channels(
        metadata.clone(),
        metrics.clone(),
        config.ack_channel_capacity,
        config.consumed_channel_capacity,
    );

    let acks_forwarded = Arc::new(AtomicU64::new(0));
    let nacks_forwarded = Arc::new(AtomicU64::new(0));
    let ack_drain = tokio::spawn(drain(receivers.ack_rx, Arc::clone(&acks_forwarded)));
    let nack_drain = tokio::spawn(drain(receivers.nack_rx, Arc::clone(&nacks_forwarded)));
    let mut consumed_rx = receivers.consumed_rx;

    let identity = AckManagerIdentity {
        output_host_id: config.output_host_id(),
        consumer_group_id: Uuid::new_v4(),
        extent_id: Uuid::new_v4(),
        connected_store_id: Uuid::new_v4(),
        session_id: 1,
        ack_mgr_id: 1,
    };
    let mgr = Arc::new(AckManager::new(
        identity,
        config.ack_manager(),
        &ConsumerGroupExtent::fresh(),
        deps,
    ));
    mgr.start();

    let mut ack_ids = Vec::with_capacity(plan.messages as usize);
    let mut upstream = SequenceNumber(1);
    for i in 1..=plan.messages {
        if plan.gap_every > 0 && i % plan.gap_every == 0 {
            upstream = upstream + plan.gap_size;
        }
        let address = StoreAddress(upstream.value() * ADDRESS_STRIDE);
        ack_ids.push((i, mgr.get_next_ack_id(address, upstream)));
        upstream = upstream.next();
    }

    let mut rng = match plan.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    ack_ids.shuffle(&mut rng);

    for (i, ack_id) in ack_ids {
        if plan.nack_every > 0 && i % plan.nack_every == 0 {
            mgr.acknowledge(ack_id.clone(), true).await?;
        }
        mgr.acknowledge(ack_id, false).await?;
    }

    mgr.notify_sealed();
    mgr.stop().await;

    let consumed = consumed_rx.try_recv().unwrap_or(false);
    let state = mgr.get_ack_mgr_state();

    // Dropping the manager closes the ack channels and ends the drains.
    drop(mgr);
    let _ = ack_drain.await;
    let _ = nack_drain.await;

    Ok(SimulationReport {
        requests: metadata.requests(),
        state,
        metrics: metrics.snapshot(),
        acks_forwarded: acks_forwarded.load(Ordering::Relaxed),
        nacks_forwarded: nacks_forwarded.load(Ordering::Relaxed),
        consumed,
    })
}

async fn drain(mut rx: mpsc::Receiver<TimestampedAckId>, count: Arc<AtomicU64>) {
    while rx.recv().await.is_some() {
        count.fetch_add(1, Ordering::Relaxed);
    }
}
