//! Interceptor dispatcher — fans request transitions out to interceptors.
//!
//! Registrations hold weak references and run in `(order, registration
//! sequence)` order. The registration list is copy-on-write: a dispatch pass
//! clones the current `Arc<Vec<_>>` and iterates it with no lock held, so a
//! registration made mid-pass never disturbs the pass and is picked up by
//! the next one.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use reqcycle_protocol::{HookFailure, Phase, RequestError, RequestFailure, RequestId};
use tracing::{debug, warn};

use crate::interceptor::{HookResult, InterceptorHandle, RequestInterceptor};

#[derive(Clone)]
struct Registration {
    seq: u64,
    order: u32,
    name: String,
    interceptor: Weak<dyn RequestInterceptor>,
    revoked: Arc<AtomicBool>,
}

impl Registration {
    fn resolve(&self) -> Option<Arc<dyn RequestInterceptor>> {
        if self.revoked.load(Ordering::Acquire) {
            return None;
        }
        self.interceptor.upgrade()
    }

    fn is_live(&self) -> bool {
        !self.revoked.load(Ordering::Acquire) && self.interceptor.strong_count() > 0
    }
}

/// Ordered set of interceptor registrations.
pub struct InterceptorDispatcher {
    registrations: RwLock<Arc<Vec<Registration>>>,
    next_seq: AtomicU64,
}

impl InterceptorDispatcher {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Arc::new(Vec::new())),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register an interceptor. Fails with `InvalidArgument` when the
    /// interceptor is absent or reports an order of zero; the registration
    /// set is left untouched in both cases.
    pub fn register(
        &self,
        interceptor: Option<Arc<dyn RequestInterceptor>>,
    ) -> Result<InterceptorHandle, RequestError> {
        let interceptor = interceptor
            .ok_or_else(|| RequestError::invalid_argument("cannot register an absent interceptor"))?;

        let order = interceptor.order();
        if order == 0 {
            return Err(RequestError::invalid_argument(format!(
                "interceptor {} has order 0; orders must be greater than 0",
                interceptor.name()
            )));
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let revoked = Arc::new(AtomicBool::new(false));
        let registration = Registration {
            seq,
            order,
            name: interceptor.name().to_string(),
            interceptor: Arc::downgrade(&interceptor),
            revoked: revoked.clone(),
        };

        {
            let mut guard = self.registrations.write();
            let list = Arc::make_mut(&mut *guard);
            let at = list.partition_point(|r| (r.order, r.seq) < (order, seq));
            list.insert(at, registration);
        }

        debug!("Registered interceptor: {} (id: {seq}, order: {order})", interceptor.name());
        Ok(InterceptorHandle {
            interceptor,
            seq,
            revoked,
        })
    }

    /// Notify every live interceptor that `request_id` started.
    pub fn dispatch_start(&self, request_id: &RequestId) -> Result<(), Vec<HookFailure>> {
        self.dispatch(Phase::Start, request_id, |interceptor| {
            interceptor.on_start(request_id)
        })
    }

    /// Notify every live interceptor that `request_id` ended.
    pub fn dispatch_end(
        &self,
        request_id: &RequestId,
        failure: Option<&RequestFailure>,
    ) -> Result<(), Vec<HookFailure>> {
        self.dispatch(Phase::End, request_id, |interceptor| {
            interceptor.on_end(request_id, failure)
        })
    }

    /// Registrations currently held, including unreachable ones that no
    /// dispatch pass has pruned yet.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registrations whose interceptor is still reachable and not revoked.
    pub fn live_count(&self) -> usize {
        self.snapshot().iter().filter(|r| r.is_live()).count()
    }

    /// Drop unreachable registrations now instead of waiting for the next
    /// dispatch pass. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let dead: Vec<u64> = self
            .snapshot()
            .iter()
            .filter(|r| !r.is_live())
            .map(|r| r.seq)
            .collect();
        self.remove(&dead)
    }

    // ── Internal ──────────────────────────────────────────────────────────

    fn snapshot(&self) -> Arc<Vec<Registration>> {
        self.registrations.read().clone()
    }

    fn dispatch<F>(&self, phase: Phase, request_id: &RequestId, hook: F) -> Result<(), Vec<HookFailure>>
    where
        F: Fn(&dyn RequestInterceptor) -> HookResult,
    {
        let registrations = self.snapshot();
        let mut dead = Vec::new();
        let mut failures = Vec::new();

        for (position, registration) in registrations.iter().enumerate() {
            let Some(interceptor) = registration.resolve() else {
                dead.push(registration.seq);
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook(&*interceptor)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => HookFailure {
                    interceptor: registration.name.clone(),
                    position,
                    message: e.to_string(),
                    panicked: false,
                },
                Err(payload) => HookFailure {
                    interceptor: registration.name.clone(),
                    position,
                    message: panic_message(&*payload),
                    panicked: true,
                },
            };
            warn!("Interceptor {} failed on {phase} of {request_id}: {}", failure.interceptor, failure.message);
            failures.push(failure);
        }

        if !dead.is_empty() {
            self.remove(&dead);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    fn remove(&self, seqs: &[u64]) -> usize {
        if seqs.is_empty() {
            return 0;
        }
        let removed = {
            let mut guard = self.registrations.write();
            let before = guard.len();
            if guard.iter().any(|r| seqs.contains(&r.seq)) {
                Arc::make_mut(&mut *guard).retain(|r| !seqs.contains(&r.seq));
            }
            before - guard.len()
        };
        if removed > 0 {
            debug!("Pruned {removed} unreachable interceptor(s)");
        }
        removed
    }
}

impl Default for InterceptorDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "interceptor panicked".to_string()
    }
}
