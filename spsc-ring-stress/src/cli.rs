//! Command line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use spsc_ring::Variant;

#[derive(Debug, Parser)]
#[command(name = "spsc-ring-stress")]
#[command(about = "Stress, race and latency checks for the spsc-ring variants")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    pub log_format: LogFormat,
}

/// How log events are rendered on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Single-threaded walk through the shared contract
    Basic(BasicArgs),

    /// One producer sends a counting sequence to one consumer
    Transfer(TransferArgs),

    /// Sequence-tagged random values through a small ring, checking order and integrity
    Race(RaceArgs),

    /// Ping-pong round trip between two rings, reported as a histogram
    Latency(LatencyArgs),
}

#[derive(Debug, Args)]
pub struct BasicArgs {
    /// Ring variant: mutex, atomic or overwrite
    #[arg(short, long, default_value = "atomic")]
    pub variant: Variant,

    /// Ring capacity
    #[arg(short, long, default_value_t = 100)]
    pub capacity: usize,
}

#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Ring variant: mutex, atomic or overwrite
    #[arg(short, long, default_value = "atomic")]
    pub variant: Variant,

    /// Ring capacity
    #[arg(short, long, default_value_t = 100)]
    pub capacity: usize,

    /// Number of values to send
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub count: u32,
}

#[derive(Debug, Args)]
pub struct RaceArgs {
    /// Ring variant: mutex, atomic or overwrite
    #[arg(short, long, default_value = "atomic")]
    pub variant: Variant,

    /// Ring capacity
    #[arg(short, long, default_value_t = 10)]
    pub capacity: usize,

    /// Values produced per iteration
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub count: u32,

    /// Number of independent iterations
    #[arg(short, long, default_value_t = 100)]
    pub iterations: usize,
}

#[derive(Debug, Args)]
pub struct LatencyArgs {
    /// Ring variant: mutex, atomic or overwrite
    #[arg(short, long, default_value = "atomic")]
    pub variant: Variant,

    /// Capacity of each ring
    #[arg(short, long, default_value_t = 1024)]
    pub capacity: usize,

    /// Round trips discarded before recording
    #[arg(long, default_value_t = 100_000)]
    pub warmup: usize,

    /// Round trips recorded
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    pub samples: usize,
}
