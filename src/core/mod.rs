//! Core module for synchronous signal dispatch
//!
//! This module provides the signal registry: handlers are registered against a
//! [`Signal`] and fired in registration order on the caller's own thread.
//! Unlike a message bus, nothing here is queued or spawned; `fire` returns only
//! after every handler has returned.

pub mod handler;
pub mod registry;
pub mod signal;

// Re-exports for convenience
pub use handler::{Context, Handler, HandlerId, HandlerResult, Response, Sender};
pub use registry::{Registration, SignalRegistry};
pub use signal::{Signal, SignalId};
