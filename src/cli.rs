//! CLI argument parsing and the `sigprobe` entry point

use crate::console::{detect_color_support, Reporter, TerminalReporter};
use crate::probes::{ProbeConfig, ProbeKind, ProbeOutcome, ProbeRunner};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

/// sigprobe - observe how synchronous signal dispatch behaves
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Probe to run (repeatable, defaults to all)
    #[arg(short, long, value_enum)]
    pub probe: Vec<ProbeSelection>,

    /// How long the timing probe's handler sleeps, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    /// JSON file backing the log store (in-memory when omitted)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProbeSelection {
    Timing,
    Thread,
    Transaction,
    Rectangle,
    All,
}

impl Cli {
    /// ログレベルの決定
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn to_config(&self) -> ProbeConfig {
        let mut probes = Vec::new();
        for selection in &self.probe {
            let kinds: &[ProbeKind] = match selection {
                ProbeSelection::Timing => &[ProbeKind::Timing],
                ProbeSelection::Thread => &[ProbeKind::Thread],
                ProbeSelection::Transaction => &[ProbeKind::Transaction],
                ProbeSelection::Rectangle => &[ProbeKind::Rectangle],
                ProbeSelection::All => &ProbeKind::ALL,
            };
            for kind in kinds {
                if !probes.contains(kind) {
                    probes.push(*kind);
                }
            }
        }
        if probes.is_empty() {
            probes = ProbeKind::ALL.to_vec();
        }

        ProbeConfig {
            probes,
            delay: Duration::from_millis(self.delay_ms),
            database: self.database.clone(),
            color: !self.no_color && detect_color_support(),
        }
    }
}

/// Run the probes in `config`, writing to `reporter`.
pub fn run_with(config: ProbeConfig, reporter: &mut dyn Reporter) -> Result<Vec<ProbeOutcome>> {
    debug!("Probe config: {:?}", config);
    ProbeRunner::new(config).run(reporter)
}

/// CLI実行エントリーポイント
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.to_config();
    let mut reporter = TerminalReporter::stdout(config.color);
    run_with(config, &mut reporter)?;
    Ok(())
}
