//! Execution context — the identity a request is bound to.
//!
//! The registry never looks at ambient thread-local state. Every operation
//! takes an [`ExecutionContext`] supplied by the caller: either the current
//! OS thread ([`ExecutionContext::current`]) or a worker identity handed out
//! by whatever scheduler owns the threads ([`ExecutionContext::worker`]).

use std::fmt;
use std::thread::ThreadId;

/// Key under which the registry stores a context's active request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKey {
    /// An OS thread, identified by its std `ThreadId`.
    Thread(ThreadId),
    /// A scheduler-assigned worker slot.
    Worker(u64),
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(id) => write!(f, "thread:{id:?}"),
            Self::Worker(n) => write!(f, "worker:{n}"),
        }
    }
}

/// Opaque handle for the caller's execution context.
///
/// A default-constructed context is *unbound*: it carries no identity, so
/// starting a request in it fails and lookups in it come back empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ExecutionContext {
    key: Option<ContextKey>,
}

impl ExecutionContext {
    /// Context for the calling OS thread.
    pub fn current() -> Self {
        Self::thread(std::thread::current().id())
    }

    pub fn thread(id: ThreadId) -> Self {
        Self {
            key: Some(ContextKey::Thread(id)),
        }
    }

    pub fn worker(id: u64) -> Self {
        Self {
            key: Some(ContextKey::Worker(id)),
        }
    }

    /// A context with no resolvable identity.
    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<ContextKey> {
        self.key
    }

    pub fn is_bound(&self) -> bool {
        self.key.is_some()
    }
}

impl From<ContextKey> for ExecutionContext {
    fn from(key: ContextKey) -> Self {
        Self { key: Some(key) }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => key.fmt(f),
            None => f.write_str("unbound"),
        }
    }
}
