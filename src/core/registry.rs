//! Synchronous signal registry.
//!
//! The registry maps each [`Signal`] to an ordered list of handlers. Firing a
//! signal calls every matching handler in registration order, on the calling
//! thread, and returns only after the last one has returned. Nothing is queued
//! or handed to another thread, and the registry never opens or closes a
//! transaction of its own: handlers see exactly the [`Context`] the caller
//! passed in.

use crate::core::handler::{Context, Handler, HandlerId, HandlerResult, Response, Sender};
use crate::core::signal::{Signal, SignalId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use = "dropping a Registration makes the handler impossible to unregister"]
pub struct Registration {
    signal: SignalId,
    handler: HandlerId,
}

impl Registration {
    pub fn signal(&self) -> SignalId {
        self.signal
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }
}

#[derive(Clone)]
struct Receiver {
    id: HandlerId,
    sender_filter: Option<String>,
    handler: Arc<dyn Handler>,
}

impl Receiver {
    fn accepts(&self, sender: &Sender) -> bool {
        self.sender_filter
            .as_deref()
            .map_or(true, |name| name == sender.name())
    }
}

/// Registry of signal handlers.
///
/// Shared by reference; all methods take `&self`. Registration and
/// unregistration take a write lock, firing only holds the read lock long
/// enough to copy the handler list.
pub struct SignalRegistry {
    receivers: RwLock<HashMap<SignalId, Vec<Receiver>>>,
    next_handler_id: AtomicU64,
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self {
            receivers: RwLock::new(HashMap::new()),
            next_handler_id: AtomicU64::new(1),
        }
    }

    /// Register a closure for `signal`.
    ///
    /// Registering the same closure twice results in two invocations per fire.
    pub fn register<F>(&self, signal: &Signal, handler: F) -> Registration
    where
        F: Fn(&Sender, &mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(signal, None, Arc::new(handler))
    }

    /// Register a closure that only runs when `sender_name` fires `signal`.
    pub fn register_for_sender<F>(
        &self,
        signal: &Signal,
        sender_name: impl Into<String>,
        handler: F,
    ) -> Registration
    where
        F: Fn(&Sender, &mut Context<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(signal, Some(sender_name.into()), Arc::new(handler))
    }

    /// Register an already shared handler, e.g. a struct implementing [`Handler`].
    pub fn register_handler(&self, signal: &Signal, handler: Arc<dyn Handler>) -> Registration {
        self.insert(signal, None, handler)
    }

    fn insert(
        &self,
        signal: &Signal,
        sender_filter: Option<String>,
        handler: Arc<dyn Handler>,
    ) -> Registration {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        log::debug!(
            "Registering {} for {} (sender filter: {:?})",
            id,
            signal,
            sender_filter
        );
        self.receivers
            .write()
            .entry(signal.id())
            .or_default()
            .push(Receiver {
                id,
                sender_filter,
                handler,
            });
        Registration {
            signal: signal.id(),
            handler: id,
        }
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unregister(&self, registration: &Registration) -> bool {
        let mut receivers = self.receivers.write();
        let Some(list) = receivers.get_mut(&registration.signal) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != registration.handler);
        let removed = list.len() != before;
        if list.is_empty() {
            receivers.remove(&registration.signal);
        }
        if removed {
            log::debug!("Unregistered {}", registration.handler);
        }
        removed
    }

    pub fn has_handlers(&self, signal: &Signal) -> bool {
        self.handler_count(signal) > 0
    }

    pub fn handler_count(&self, signal: &Signal) -> usize {
        self.receivers
            .read()
            .get(&signal.id())
            .map_or(0, Vec::len)
    }

    /// Fire `signal`, calling every matching handler in registration order.
    ///
    /// Stops at the first handler error and returns it unchanged. Firing a
    /// signal without handlers returns an empty list.
    pub fn fire(
        &self,
        signal: &Signal,
        sender: &Sender,
        context: &mut Context<'_>,
    ) -> anyhow::Result<Vec<Response>> {
        let receivers = self.snapshot(signal, sender);
        let mut responses = Vec::with_capacity(receivers.len());
        for receiver in receivers {
            log::trace!("Dispatching {} from {} to {}", signal, sender.name(), receiver.id);
            let value = receiver.handler.on_signal(sender, context)?;
            responses.push(Response {
                handler: receiver.id,
                value,
            });
        }
        Ok(responses)
    }

    /// Fire `signal` and run every handler even if some fail.
    ///
    /// Each handler's result is returned in registration order.
    pub fn fire_robust(
        &self,
        signal: &Signal,
        sender: &Sender,
        context: &mut Context<'_>,
    ) -> Vec<(HandlerId, HandlerResult)> {
        self.snapshot(signal, sender)
            .into_iter()
            .map(|receiver| {
                log::trace!("Dispatching {} from {} to {}", signal, sender.name(), receiver.id);
                let result = receiver.handler.on_signal(sender, context);
                if let Err(err) = &result {
                    log::warn!("{} failed while handling {}: {:#}", receiver.id, signal, err);
                }
                (receiver.id, result)
            })
            .collect()
    }

    // The lock is released before any handler runs, so handlers may register
    // or unregister without deadlocking. Their changes apply to later fires.
    fn snapshot(&self, signal: &Signal, sender: &Sender) -> Vec<Receiver> {
        self.receivers
            .read()
            .get(&signal.id())
            .map(|list| list.iter().filter(|r| r.accepts(sender)).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn ok(_: &Sender, _: &mut Context<'_>) -> HandlerResult {
        Ok(json!(null))
    }

    #[test]
    fn test_register_and_count() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("count");
        assert!(!registry.has_handlers(&signal));

        let _a = registry.register(&signal, ok);
        let _b = registry.register(&signal, ok);
        assert_eq!(registry.handler_count(&signal), 2);
        assert!(registry.has_handlers(&signal));
    }

    #[test]
    fn test_duplicate_registration_invokes_twice() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("dup");
        let calls = Arc::new(Mutex::new(0));

        let counter = {
            let calls = calls.clone();
            move |_: &Sender, _: &mut Context<'_>| -> HandlerResult {
                *calls.lock() += 1;
                Ok(json!(null))
            }
        };
        let _a = registry.register(&signal, counter.clone());
        let _b = registry.register(&signal, counter);

        let responses = registry
            .fire(&signal, &Sender::new("test"), &mut Context::new())
            .unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(*calls.lock(), 2);
    }

    #[test]
    fn test_unregister_removes_only_that_handler() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("unregister");
        let first = registry.register(&signal, |_: &Sender, _: &mut Context<'_>| Ok(json!(1)));
        let _second = registry.register(&signal, |_: &Sender, _: &mut Context<'_>| Ok(json!(2)));

        assert!(registry.unregister(&first));
        assert!(!registry.unregister(&first));

        let responses = registry
            .fire(&signal, &Sender::new("test"), &mut Context::new())
            .unwrap();
        let values: Vec<_> = responses.into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec![json!(2)]);
    }

    #[test]
    fn test_unregister_last_handler_empties_signal() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("last");
        let only = registry.register(&signal, ok);
        assert!(registry.unregister(&only));
        assert_eq!(registry.handler_count(&signal), 0);
    }

    #[test]
    fn test_signals_are_isolated() {
        let registry = SignalRegistry::new();
        let a = Signal::new("a");
        let b = Signal::new("b");
        let _r = registry.register(&a, ok);

        let responses = registry
            .fire(&b, &Sender::new("test"), &mut Context::new())
            .unwrap();
        assert!(responses.is_empty());
    }

    #[test]
    fn test_sender_filter() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("filtered");
        let _any = registry.register(&signal, |_: &Sender, _: &mut Context<'_>| Ok(json!("any")));
        let _only = registry.register_for_sender(&signal, "model", |_: &Sender, _: &mut Context<'_>| {
            Ok(json!("model"))
        });

        let from_other = registry
            .fire(&signal, &Sender::new("view"), &mut Context::new())
            .unwrap();
        assert_eq!(from_other.len(), 1);

        let from_model = registry
            .fire(&signal, &Sender::new("model"), &mut Context::new())
            .unwrap();
        let values: Vec<_> = from_model.into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec![json!("any"), json!("model")]);
    }

    #[test]
    fn test_fire_stops_at_first_error() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("stop");
        let reached = Arc::new(Mutex::new(false));

        let _fail = registry.register(&signal, |_: &Sender, _: &mut Context<'_>| {
            anyhow::bail!("boom")
        });
        let _after = {
            let reached = reached.clone();
            registry.register(&signal, move |_: &Sender, _: &mut Context<'_>| {
                *reached.lock() = true;
                Ok(json!(null))
            })
        };

        let err = registry
            .fire(&signal, &Sender::new("test"), &mut Context::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!*reached.lock());
    }

    #[test]
    fn test_fire_robust_runs_every_handler() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("robust");
        let first = registry.register(&signal, |_: &Sender, _: &mut Context<'_>| {
            anyhow::bail!("first failed")
        });
        let second = registry.register(&signal, |_: &Sender, _: &mut Context<'_>| Ok(json!("ok")));

        let results = registry.fire_robust(&signal, &Sender::new("test"), &mut Context::new());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, first.handler());
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, second.handler());
        assert_eq!(results[1].1.as_ref().unwrap(), &json!("ok"));
    }

    struct Greeter {
        greeting: &'static str,
    }

    impl Handler for Greeter {
        fn on_signal(&self, sender: &Sender, _context: &mut Context<'_>) -> HandlerResult {
            Ok(json!(format!("{} {}", self.greeting, sender.name())))
        }
    }

    #[test]
    fn test_struct_handler() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("struct");
        let registration = registry.register_handler(&signal, Arc::new(Greeter { greeting: "hi" }));
        assert_eq!(registration.signal(), signal.id());

        let responses = registry
            .fire(&signal, &Sender::new("bob"), &mut Context::new())
            .unwrap();
        assert_eq!(responses[0].handler, registration.handler());
        assert_eq!(responses[0].value, json!("hi bob"));
    }

    #[test]
    fn test_handler_sees_context_args() {
        let registry = SignalRegistry::new();
        let signal = Signal::new("args");
        let _r = registry.register(&signal, |_: &Sender, ctx: &mut Context<'_>| {
            Ok(ctx.arg("n").cloned().unwrap_or_default())
        });

        let mut context = Context::new().with_arg("n", 7);
        let responses = registry
            .fire(&signal, &Sender::new("test"), &mut context)
            .unwrap();
        assert_eq!(responses[0].value, json!(7));
    }

    #[test]
    fn test_handler_may_register_during_fire() {
        let registry = Arc::new(SignalRegistry::new());
        let signal = Signal::new("reentrant");

        let _r = {
            let registry_in_handler = Arc::downgrade(&registry);
            let signal_in_handler = signal.clone();
            registry.register(&signal, move |_: &Sender, _: &mut Context<'_>| {
                if let Some(registry) = registry_in_handler.upgrade() {
                    let _late = registry.register(&signal_in_handler, ok);
                }
                Ok(json!(null))
            })
        };

        let first = registry
            .fire(&signal, &Sender::new("test"), &mut Context::new())
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(registry.handler_count(&signal), 2);
    }
}
