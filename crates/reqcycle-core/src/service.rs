//! Request service — the entry point callers use to drive request lifecycles.

use std::sync::Arc;

use reqcycle_protocol::{
    ExecutionContext, RequestError, RequestFailure, RequestId, RequestSnapshot,
};
use tracing::info;

use crate::config::RegistryConfig;
use crate::dispatcher::InterceptorDispatcher;
use crate::interceptor::{InterceptorHandle, RequestInterceptor};
use crate::registry::RequestRegistry;

/// Owns the request registry and interceptor dispatcher.
///
/// Transport-independent: whatever decides that a unit of work begins or
/// ends (an HTTP listener, an RPC loop, a batch runner) calls
/// [`start_request`](Self::start_request) and
/// [`end_request`](Self::end_request) with the context the work runs in.
/// Share it behind an `Arc`; every method takes `&self`.
pub struct RequestService {
    registry: RequestRegistry,
}

impl RequestService {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        info!("Request service created (id strategy: {})", config.id_strategy);
        Self {
            registry: RequestRegistry::new(config, Arc::new(InterceptorDispatcher::new())),
        }
    }

    /// Start a new request bound to `ctx` and return its id.
    ///
    /// Only one request can be bound to a context: if one is already running
    /// it is discarded and replaced. Requests are never closed automatically.
    pub fn start_request(&self, ctx: &ExecutionContext) -> Result<RequestId, RequestError> {
        self.registry.start(ctx)
    }

    /// End the request bound to `ctx`. Pass a failure if the work did not
    /// complete successfully.
    ///
    /// Returns the id of the request that was closed, or `None` if there was
    /// no request running (a request cannot be ended twice).
    pub fn end_request(
        &self,
        ctx: &ExecutionContext,
        failure: Option<RequestFailure>,
    ) -> Result<Option<RequestId>, RequestError> {
        self.registry.end(ctx, failure)
    }

    /// Id of the request running in `ctx`, if any.
    pub fn current_request_id(&self, ctx: &ExecutionContext) -> Option<RequestId> {
        self.registry.current(ctx)
    }

    /// Register an interceptor to be notified of every request start and end.
    ///
    /// Keep the returned handle for as long as the interceptor should be
    /// called; dropping it unregisters the interceptor, and the next dispatch
    /// removes it from the set.
    pub fn register_request_interceptor(
        &self,
        interceptor: Option<Arc<dyn RequestInterceptor>>,
    ) -> Result<InterceptorHandle, RequestError> {
        self.registry.dispatcher().register(interceptor)
    }

    pub fn current_request(&self, ctx: &ExecutionContext) -> Option<RequestSnapshot> {
        self.registry.current_request(ctx)
    }

    pub fn active_requests(&self) -> Vec<RequestSnapshot> {
        self.registry.active_requests()
    }

    pub fn active_request_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Registrations held by the dispatcher, including ones not yet pruned.
    pub fn interceptor_count(&self) -> usize {
        self.registry.dispatcher().len()
    }

    pub fn live_interceptor_count(&self) -> usize {
        self.registry.dispatcher().live_count()
    }

    pub fn config(&self) -> &RegistryConfig {
        self.registry.config()
    }
}

impl Default for RequestService {
    fn default() -> Self {
        Self::new()
    }
}
