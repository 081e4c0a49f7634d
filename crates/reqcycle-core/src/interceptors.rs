//! Built-in interceptors.

use std::sync::atomic::{AtomicU64, Ordering};

use reqcycle_protocol::{RequestFailure, RequestId};
use serde::Serialize;
use tracing::{info, warn};

use crate::interceptor::{HookResult, RequestInterceptor};

/// Logs every request transition through `tracing`.
pub struct TracingInterceptor;

impl RequestInterceptor for TracingInterceptor {
    fn on_start(&self, request_id: &RequestId) -> HookResult {
        info!("Request started: {request_id}");
        Ok(())
    }

    fn on_end(&self, request_id: &RequestId, failure: Option<&RequestFailure>) -> HookResult {
        match failure {
            Some(f) => warn!("Request failed: {request_id}: {f}"),
            None => info!("Request completed: {request_id}"),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }

    // Log the transition before default-ordered interceptors run.
    fn order(&self) -> u32 {
        10
    }
}

/// Counts request transitions.
#[derive(Default)]
pub struct StatsInterceptor {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
}

impl RequestStats {
    pub fn ended(&self) -> u64 {
        self.completed + self.failed
    }
}

impl StatsInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RequestStats {
        RequestStats {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl RequestInterceptor for StatsInterceptor {
    fn on_start(&self, _request_id: &RequestId) -> HookResult {
        self.started.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn on_end(&self, _request_id: &RequestId, failure: Option<&RequestFailure>) -> HookResult {
        let counter = if failure.is_some() { &self.failed } else { &self.completed };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "stats"
    }
}
