//! CLI argument definitions using clap
//!
//! Commands:
//! - outputhost encode-ack-id --session <n> --ack-mgr <n> --seq <n> --address <n>
//! - outputhost decode-ack-id <ack-id>
//! - outputhost simulate [--config <path>] [--messages <n>] ...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Output host ack manager tools
#[derive(Parser, Debug)]
#[command(name = "outputhost")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an ack id from its parts
    EncodeAckId {
        #[arg(long)]
        session: u16,
        #[arg(long)]
        ack_mgr: u16,
        #[arg(long)]
        seq: u32,
        #[arg(long, allow_hyphen_values = true)]
        address: i64,
    },

    /// Print the parts of an ack id
    DecodeAckId {
        /// Base64 ack id
        ack_id: String,
    },

    /// Drive one ack manager against an in-memory metadata store
    Simulate {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Messages to deliver
        #[arg(long, default_value_t = 100)]
        messages: u32,

        /// Skip upstream sequences after every N deliveries (0 = never)
        #[arg(long, default_value_t = 0)]
        gap_every: u32,

        /// Upstream sequences skipped at each gap
        #[arg(long, default_value_t = 1)]
        gap_size: i64,

        /// Nack every Nth message once before acking it (0 = never)
        #[arg(long, default_value_t = 0)]
        nack_every: u32,

        /// Seed for the ack order shuffle
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["outputhost", "simulate"]).unwrap();
        match cli.command {
            Command::Simulate {
                messages,
                gap_every,
                nack_every,
                config,
                ..
            } => {
                assert_eq!(messages, 100);
                assert_eq!(gap_every, 0);
                assert_eq!(nack_every, 0);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_negative_address() {
        let cli = Cli::try_parse_from([
            "outputhost",
            "encode-ack-id",
            "--session",
            "1",
            "--ack-mgr",
            "2",
            "--seq",
            "3",
            "--address",
            "-1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::EncodeAckId { address: -1, .. }));
    }
}
