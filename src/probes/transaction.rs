use super::{Probe, ProbeEnv, ProbeError, ProbeKind, ProbeOutcome, Registered};
use crate::core::{Context, HandlerResult, Sender, Signal};
use crate::store::Persistence;
use serde_json::json;

pub const CALLER_MESSAGE: &str = "Caller Log";
pub const SIGNAL_MESSAGE: &str = "Signal Log";

/// Fires a signal inside a transaction that is then aborted, and checks
/// whether the handler's write survived.
pub struct TransactionProbe {
    signal: Signal,
}

impl TransactionProbe {
    pub fn new() -> Self {
        Self {
            signal: Signal::new("transaction-probe"),
        }
    }
}

impl Default for TransactionProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for TransactionProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Transaction
    }

    fn question(&self) -> &'static str {
        "By default do signals run in the same database transaction as the caller?"
    }

    fn run(&self, env: &mut ProbeEnv<'_>) -> anyhow::Result<ProbeOutcome> {
        let ProbeEnv {
            registry,
            store,
            reporter,
        } = env;
        let registry = *registry;
        let _registered = Registered::new(
            registry,
            registry.register(&self.signal, |_: &Sender, ctx: &mut Context<'_>| -> HandlerResult {
                ctx.report(&format!("Receiver: Creating Log entry '{}'...", SIGNAL_MESSAGE))?;
                let record = ctx.persistence()?.create(SIGNAL_MESSAGE)?;
                Ok(json!({ "record": record.id }))
            }),
        );

        let initial = store.count();
        reporter.info(&format!("Caller: Initial Log count: {}", initial))?;

        let scoped = store.atomic(|tx| -> anyhow::Result<()> {
            reporter.info(&format!(
                "Caller: Inside transaction. Creating Log entry '{}'...",
                CALLER_MESSAGE
            ))?;
            tx.create(CALLER_MESSAGE)?;
            reporter.info("Caller: Sending signal...")?;
            registry.fire(
                &self.signal,
                &Sender::of::<Self>(),
                &mut Context::scoped(tx).with_reporter(&mut **reporter),
            )?;
            reporter.info("Caller: Raising exception to rollback transaction...")?;
            Err(ProbeError::ForcedRollback.into())
        });

        if let Err(err) = scoped {
            reporter.info(&format!("Caller: Caught exception: {}", err))?;
        }

        let final_count = store.count();
        reporter.info(&format!("Caller: Final Log count: {}", final_count))?;
        log::info!("Transaction probe: count {} before, {} after", initial, final_count);

        let holds = final_count == initial;
        let conclusion = if holds {
            "Signals run in the same transaction (receiver's DB change was rolled back)."
        } else {
            "Signals run in a different transaction (receiver's DB change persisted)."
        };
        Ok(ProbeOutcome {
            probe: self.kind(),
            holds,
            conclusion: conclusion.to_string(),
        })
    }
}
