//! CLI module for the output host
//!
//! Provides command-line interface for:
//! - encode-ack-id: Build an ack id from its parts
//! - decode-ack-id: Split an ack id into its parts
//! - simulate: Drive one ack manager through a delivery run

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    decode_ack_id, encode_ack_id, run, run_command, run_simulation, simulate, SimulationPlan,
    SimulationReport,
};
pub use errors::{CliError, CliResult};
pub use io::{write_error, write_response};
