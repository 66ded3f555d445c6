//! Probes that observe how the signal registry dispatches.
//!
//! Each probe registers its own handler, fires its signal once, reports what
//! it saw and unregisters again, also when reporting fails midway. [`ProbeRunner`] wires them to a registry, a
//! log store and a reporter.

pub mod rectangle;
pub mod runner;
pub mod thread;
pub mod timing;
pub mod transaction;

pub use rectangle::RectangleDemo;
pub use runner::{ProbeConfig, ProbeRunner};
pub use thread::ThreadProbe;
pub use timing::TimingProbe;
pub use transaction::TransactionProbe;

use crate::console::Reporter;
use crate::core::{Registration, SignalRegistry};
use crate::store::LogStore;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Timing,
    Thread,
    Transaction,
    Rectangle,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 4] = [
        ProbeKind::Timing,
        ProbeKind::Thread,
        ProbeKind::Transaction,
        ProbeKind::Rectangle,
    ];

    /// Position in the question sequence; the rectangle demo has none.
    pub fn question_number(&self) -> Option<u8> {
        match self {
            ProbeKind::Timing => Some(1),
            ProbeKind::Thread => Some(2),
            ProbeKind::Transaction => Some(3),
            ProbeKind::Rectangle => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProbeKind::Timing => "timing",
            ProbeKind::Thread => "thread",
            ProbeKind::Transaction => "transaction",
            ProbeKind::Rectangle => "rectangle",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a probe concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub probe: ProbeKind,
    /// Whether the synchronous-dispatch property under test was observed.
    pub holds: bool,
    pub conclusion: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Force Rollback")]
    ForcedRollback,

    #[error("Handler for {signal} was not invoked")]
    HandlerNotInvoked { signal: String },
}

/// Everything a probe needs while it runs.
pub struct ProbeEnv<'a> {
    pub registry: &'a SignalRegistry,
    pub store: &'a mut LogStore,
    pub reporter: &'a mut dyn Reporter,
}

/// 各プローブの統一インターフェース
pub trait Probe {
    fn kind(&self) -> ProbeKind;

    /// Heading printed before the probe runs.
    fn question(&self) -> &'static str;

    fn run(&self, env: &mut ProbeEnv<'_>) -> anyhow::Result<ProbeOutcome>;
}

/// Keeps a probe's handler registered until dropped.
pub(crate) struct Registered<'r> {
    registry: &'r SignalRegistry,
    registration: Registration,
}

impl<'r> Registered<'r> {
    pub(crate) fn new(registry: &'r SignalRegistry, registration: Registration) -> Self {
        Self {
            registry,
            registration,
        }
    }
}

impl Drop for Registered<'_> {
    fn drop(&mut self) {
        if self.registry.unregister(&self.registration) {
            log::debug!("Probe handler {} unregistered", self.registration.handler());
        }
    }
}
