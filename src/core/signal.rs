//! Signal identities.
//!
//! A [`Signal`] is an opaque token naming one class of notification. Two
//! signals created with the same name are still distinct: identity comes from
//! a process-wide counter, the name is only used in log output.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A notification identity that handlers are registered against.
#[derive(Debug, Clone)]
pub struct Signal {
    id: SignalId,
    name: String,
}

impl Signal {
    /// Create a new signal with a fresh identity.
    pub fn new(name: impl Into<String>) -> Self {
        let id = SignalId(NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> SignalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Signal {}

impl std::hash::Hash for Signal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}
