//! Command line driver that exercises the ring variants across threads.
//!
//! Each subcommand runs one scenario against one variant and exits non-zero
//! when a check fails.

mod basic;
mod cli;
mod latency;
mod logging;
mod race;
mod transfer;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "scenario failed");
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Basic(args) => {
            basic::run(args.variant, args.capacity)?;
            println!("basic {}: ok", args.variant);
        }
        Command::Transfer(args) => {
            let report = transfer::run(args.variant, args.capacity, args.count)?;
            println!("{report}");
        }
        Command::Race(args) => {
            let report = race::run(args.variant, args.capacity, args.count, args.iterations)?;
            println!("{report}");
        }
        Command::Latency(args) => {
            let report = latency::run(args.variant, args.capacity, args.warmup, args.samples)?;
            println!("{report}");
        }
    }
    Ok(())
}
