//! Handler trait and the values passed to handlers on dispatch.

use crate::console::Reporter;
use crate::store::Persistence;
use serde_json::{Map, Value};
use std::fmt;
use std::io;

/// Result returned by a single handler invocation.
///
/// Handlers may fail with any error; the registry hands it back to the
/// caller of `fire` untouched.
pub type HandlerResult = anyhow::Result<Value>;

/// Identifies a registered handler within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// The party that fires a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    name: String,
}

impl Sender {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// A sender named after a Rust type, e.g. `Sender::of::<ProbeRunner>()`.
    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Keyword context passed alongside the sender.
///
/// The optional persistence scope is whatever the caller is currently working
/// in. The registry passes the context through untouched, so a handler that
/// writes through [`Context::persistence`] writes into the caller's scope.
/// Likewise an attached reporter is the caller's own output, so lines a
/// handler reports appear while the caller is still waiting on `fire`.
#[derive(Default)]
pub struct Context<'a> {
    kwargs: Map<String, Value>,
    scope: Option<&'a mut dyn Persistence>,
    reporter: Option<&'a mut dyn Reporter>,
}

impl<'a> Context<'a> {
    /// Context without a persistence scope.
    pub fn new() -> Self {
        Self {
            kwargs: Map::new(),
            scope: None,
            reporter: None,
        }
    }

    /// Context carrying the caller's persistence scope.
    pub fn scoped(scope: &'a mut dyn Persistence) -> Self {
        Self {
            kwargs: Map::new(),
            scope: Some(scope),
            reporter: None,
        }
    }

    /// Attach the caller's reporter so handlers can write to it directly.
    pub fn with_reporter(mut self, reporter: &'a mut dyn Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    pub fn has_scope(&self) -> bool {
        self.scope.is_some()
    }

    /// The caller's persistence scope, if one was supplied.
    pub fn scope(&mut self) -> Option<&mut (dyn Persistence + 'a)> {
        match &mut self.scope {
            Some(scope) => Some(&mut **scope),
            None => None,
        }
    }

    /// Like [`Context::scope`] but fails when the caller supplied none.
    pub fn persistence(&mut self) -> anyhow::Result<&mut (dyn Persistence + 'a)> {
        self.scope()
            .ok_or_else(|| anyhow::anyhow!("no persistence scope in signal context"))
    }

    /// Write a line to the caller's reporter, or to the debug log without one.
    pub fn report(&mut self, line: &str) -> io::Result<()> {
        match &mut self.reporter {
            Some(reporter) => reporter.info(line),
            None => {
                log::debug!("{}", line);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("kwargs", &self.kwargs)
            .field("scoped", &self.scope.is_some())
            .field("reporting", &self.reporter.is_some())
            .finish()
    }
}

/// Trait for handling a fired signal.
///
/// Any `Fn(&Sender, &mut Context<'_>) -> HandlerResult` closure implements
/// this automatically.
pub trait Handler: Send + Sync {
    /// Handle one firing of the signal this handler is registered against.
    ///
    /// # Arguments
    /// * `sender` - Who fired the signal
    /// * `context` - Keyword context and the caller's persistence scope
    fn on_signal(&self, sender: &Sender, context: &mut Context<'_>) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Sender, &mut Context<'_>) -> HandlerResult + Send + Sync,
{
    fn on_signal(&self, sender: &Sender, context: &mut Context<'_>) -> HandlerResult {
        self(sender, context)
    }
}

/// One handler's successful reply to a `fire`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub handler: HandlerId,
    pub value: Value,
}
