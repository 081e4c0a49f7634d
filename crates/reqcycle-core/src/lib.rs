//! reqcycle core — request registry and interceptor dispatch.
//!
//! The [`RequestService`] owns a [`RequestRegistry`] (execution context →
//! active request) and an [`InterceptorDispatcher`] (ordered, non-owning
//! interceptor registrations). Starting or ending a request updates the
//! registry first and then fans the transition out to every live
//! interceptor.

pub mod config;
pub mod dispatcher;
pub mod interceptor;
pub mod interceptors;
pub mod registry;
pub mod service;

mod id;

pub use config::{IdStrategy, RegistryConfig};
pub use dispatcher::InterceptorDispatcher;
pub use interceptor::{DEFAULT_ORDER, HookResult, InterceptorHandle, RequestInterceptor};
pub use interceptors::{RequestStats, StatsInterceptor, TracingInterceptor};
pub use registry::RequestRegistry;
pub use service::RequestService;

pub use reqcycle_protocol::{
    ContextKey, ErrorKind, ExecutionContext, HookFailure, InterceptorFailures, Phase,
    RequestError, RequestFailure, RequestId, RequestSnapshot,
};
