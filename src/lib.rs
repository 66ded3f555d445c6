pub mod cli;
pub mod console;
pub mod core;
pub mod probes;
pub mod rectangle;
pub mod store;

// 公開API
pub use crate::core::{
    Context, Handler, HandlerId, HandlerResult, Registration, Response, Sender, Signal,
    SignalId, SignalRegistry,
};
pub use console::{Reporter, TerminalReporter};
pub use probes::{ProbeConfig, ProbeKind, ProbeOutcome, ProbeRunner};
pub use rectangle::{Dimension, Rectangle};
pub use store::{LogRecord, LogStore, Persistence, StoreError, Transaction};
