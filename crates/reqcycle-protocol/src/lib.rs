//! reqcycle — Protocol Types
//!
//! Types shared between the request registry, the interceptor dispatcher,
//! and the code that drives them. This crate is the single source of truth
//! for request identities, execution contexts, failure values, and error
//! kinds.

pub mod context;
pub mod error;
pub mod failure;
pub mod request;

pub use context::{ContextKey, ExecutionContext};
pub use error::{ErrorKind, HookFailure, InterceptorFailures, Phase, RequestError};
pub use failure::{BoxError, RequestFailure};
pub use request::{RequestId, RequestSnapshot};
