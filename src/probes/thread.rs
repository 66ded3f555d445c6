use super::{Probe, ProbeEnv, ProbeError, ProbeKind, ProbeOutcome, Registered};
use crate::core::{Context, HandlerResult, Sender, Signal};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Compares the caller's thread with the thread the handler runs on.
pub struct ThreadProbe {
    signal: Signal,
}

impl ThreadProbe {
    pub fn new() -> Self {
        Self {
            signal: Signal::new("thread-probe"),
        }
    }
}

impl Default for ThreadProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

impl Probe for ThreadProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Thread
    }

    fn question(&self) -> &'static str {
        "Do signals run in the same thread as the caller?"
    }

    fn run(&self, env: &mut ProbeEnv<'_>) -> anyhow::Result<ProbeOutcome> {
        let seen: Arc<Mutex<Option<ThreadId>>> = Arc::default();
        let _registered = {
            let seen = seen.clone();
            Registered::new(
                env.registry,
                env.registry
                    .register(&self.signal, move |_: &Sender, ctx: &mut Context<'_>| -> HandlerResult {
                        let label = thread_label();
                        ctx.report(&format!("Receiver: Running in thread: {}", label))?;
                        *seen.lock() = Some(thread::current().id());
                        Ok(json!({ "thread": label }))
                    }),
            )
        };

        let caller = thread::current().id();
        env.reporter
            .info(&format!("Caller: Running in thread: {}", thread_label()))?;
        env.reporter.info("Caller: Sending signal...")?;
        env.registry.fire(
            &self.signal,
            &Sender::of::<Self>(),
            &mut Context::new().with_reporter(&mut *env.reporter),
        )?;

        let handler_thread = seen.lock().take().ok_or_else(|| ProbeError::HandlerNotInvoked {
            signal: self.signal.to_string(),
        })?;
        log::info!("Thread probe: caller {:?}, handler {:?}", caller, handler_thread);

        let holds = handler_thread == caller;
        let conclusion = if holds {
            "Signals run in the same thread as the caller by default."
        } else {
            "Signals run in a different thread from the caller."
        };
        Ok(ProbeOutcome {
            probe: self.kind(),
            holds,
            conclusion: conclusion.to_string(),
        })
    }
}
