//! Interceptor trait and registration handles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqcycle_protocol::{BoxError, RequestFailure, RequestId};

/// Order given to interceptors that do not override [`RequestInterceptor::order`].
pub const DEFAULT_ORDER: u32 = 100;

/// Result of a single interceptor hook.
pub type HookResult = Result<(), BoxError>;

/// Observer of request start and end transitions.
///
/// Hooks run synchronously on the thread that started or ended the request,
/// with no registry lock held. They should be quick; there is no timeout.
pub trait RequestInterceptor: Send + Sync {
    /// Called after a request was registered for its context.
    fn on_start(&self, request_id: &RequestId) -> HookResult;

    /// Called after a request was removed from its context. `failure` is
    /// `None` when the request ended successfully.
    fn on_end(&self, request_id: &RequestId, failure: Option<&RequestFailure>) -> HookResult;

    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Position in the fan-out (lower runs first). Must be positive.
    /// Interceptors with equal order run in registration order.
    fn order(&self) -> u32 {
        DEFAULT_ORDER
    }
}

/// Token returned by [`InterceptorDispatcher::register`](crate::InterceptorDispatcher::register).
///
/// The interceptor stays registered while this handle is alive. Dropping it
/// (or calling [`unregister`](Self::unregister)) revokes the registration,
/// even if the caller still holds other `Arc`s to the interceptor; the next
/// dispatch pass prunes it. The dispatcher itself only keeps a weak
/// reference, so it never extends the interceptor's lifetime.
#[must_use = "dropping the handle unregisters the interceptor"]
pub struct InterceptorHandle {
    pub(crate) interceptor: Arc<dyn RequestInterceptor>,
    pub(crate) seq: u64,
    pub(crate) revoked: Arc<AtomicBool>,
}

impl InterceptorHandle {
    /// Registration sequence number (unique per dispatcher).
    pub fn id(&self) -> u64 {
        self.seq
    }

    pub fn interceptor(&self) -> &Arc<dyn RequestInterceptor> {
        &self.interceptor
    }

    pub fn name(&self) -> &str {
        self.interceptor.name()
    }

    /// Stop notifying this interceptor. Takes effect on the next dispatch
    /// pass; a pass already in flight may still call it once.
    pub fn unregister(self) {
        drop(self);
    }
}

impl Drop for InterceptorHandle {
    fn drop(&mut self) {
        self.revoked.store(true, Ordering::Release);
    }
}

impl fmt::Debug for InterceptorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorHandle")
            .field("id", &self.seq)
            .field("name", &self.interceptor.name())
            .field("revoked", &self.revoked.load(Ordering::Acquire))
            .finish()
    }
}
