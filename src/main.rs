//! sigprobe - observe synchronous signal dispatch
//!
//! Command-line usage:
//!   sigprobe                      - Run every probe
//!   sigprobe --probe timing       - Does the caller wait for the handler?
//!   sigprobe --probe thread       - Does the handler run on the caller's thread?
//!   sigprobe --probe transaction  - Does the handler share the caller's transaction?
//!   sigprobe --probe rectangle    - Iterate a Rectangle(10, 5)

use clap::Parser;
use sigprobe::cli::{run_cli, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    run_cli(cli)
}
