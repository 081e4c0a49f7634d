//! RequestRegistry — maps execution contexts to their active request.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reqcycle_protocol::{
    ContextKey, ExecutionContext, HookFailure, InterceptorFailures, Phase, RequestError,
    RequestFailure, RequestId, RequestSnapshot,
};
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::dispatcher::InterceptorDispatcher;
use crate::id::IdGenerator;

/// Internal record for one in-flight request.
///
/// Ending a request removes the record from the map; whoever got it out of
/// `remove` is the only one who can close it, so a request is closed at
/// most once.
struct Request {
    id: RequestId,
    owner: ContextKey,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Request {
    fn new(id: RequestId, owner: ContextKey) -> Self {
        Self {
            id,
            owner,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            id: self.id.clone(),
            context: self.owner.to_string(),
            started_at: self.started_at,
            elapsed_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Tracks at most one active request per execution context.
///
/// The map is a `DashMap`, so starts and ends on different contexts only
/// contend on shard locks, and `insert`/`remove` on one key are atomic.
/// Interceptors are notified after the map update, with no shard lock held.
pub struct RequestRegistry {
    active: DashMap<ContextKey, Request>,
    ids: IdGenerator,
    dispatcher: Arc<InterceptorDispatcher>,
    config: RegistryConfig,
}

impl RequestRegistry {
    pub fn new(config: RegistryConfig, dispatcher: Arc<InterceptorDispatcher>) -> Self {
        Self {
            active: DashMap::new(),
            ids: IdGenerator::new(config.id_strategy),
            dispatcher,
            config,
        }
    }

    /// Start a request in `ctx` and notify interceptors.
    ///
    /// A request already active in `ctx` is discarded without an end
    /// notification. If any interceptor fails, the new request is still
    /// active and its id is carried by the returned error.
    pub fn start(&self, ctx: &ExecutionContext) -> Result<RequestId, RequestError> {
        let key = ctx.key().ok_or(RequestError::InvalidContext)?;
        let id = self.ids.next_id();

        if let Some(previous) = self.active.insert(key, Request::new(id.clone(), key)) {
            if self.config.warn_on_replace {
                warn!("Request {} on {key} was never ended; replaced by {id}", previous.id);
            } else {
                debug!("Request {} on {key} replaced by {id}", previous.id);
            }
        }
        debug!("Request started: {id} ({key})");

        self.dispatcher
            .dispatch_start(&id)
            .map_err(|failures| interceptor_error(&id, Phase::Start, failures))?;
        Ok(id)
    }

    /// End the active request in `ctx`, if any, and notify interceptors.
    ///
    /// Returns `Ok(None)` (without notifying anyone) when nothing is active,
    /// so repeated calls are harmless.
    pub fn end(
        &self,
        ctx: &ExecutionContext,
        failure: Option<RequestFailure>,
    ) -> Result<Option<RequestId>, RequestError> {
        let Some(key) = ctx.key() else {
            return Ok(None);
        };
        let Some((_, request)) = self.active.remove(&key) else {
            return Ok(None);
        };

        let elapsed = request.started.elapsed();
        match &failure {
            Some(f) => debug!("Request ended with failure: {} ({key}, {elapsed:?}): {f}", request.id),
            None => debug!("Request ended: {} ({key}, {elapsed:?})", request.id),
        }

        self.dispatcher
            .dispatch_end(&request.id, failure.as_ref())
            .map_err(|failures| interceptor_error(&request.id, Phase::End, failures))?;
        Ok(Some(request.id))
    }

    /// Id of the request active in `ctx`.
    pub fn current(&self, ctx: &ExecutionContext) -> Option<RequestId> {
        let key = ctx.key()?;
        self.active.get(&key).map(|r| r.id.clone())
    }

    pub fn current_request(&self, ctx: &ExecutionContext) -> Option<RequestSnapshot> {
        let key = ctx.key()?;
        self.active.get(&key).map(|r| r.snapshot())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Snapshots of every active request, oldest first.
    pub fn active_requests(&self) -> Vec<RequestSnapshot> {
        let mut requests: Vec<_> = self.active.iter().map(|r| r.snapshot()).collect();
        requests.sort_by_key(|r| r.started_at);
        requests
    }

    pub fn dispatcher(&self) -> &Arc<InterceptorDispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

fn interceptor_error(id: &RequestId, phase: Phase, failures: Vec<HookFailure>) -> RequestError {
    RequestError::Interceptors(InterceptorFailures {
        request_id: id.clone(),
        phase,
        failures,
    })
}
