//! reqcycle error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::RequestId;

/// Payload-free discriminant of [`RequestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidContext,
    InvalidArgument,
    InterceptorFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidContext => "invalid_context",
            Self::InvalidArgument => "invalid_argument",
            Self::InterceptorFailure => "interceptor_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle transition an interceptor was being notified of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    End,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
        }
    }
}

/// One interceptor's failure during a dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookFailure {
    /// Interceptor name, as reported by the interceptor.
    pub interceptor: String,
    /// Index of the interceptor within the pass that failed.
    pub position: usize,
    pub message: String,
    /// True when the hook panicked instead of returning an error.
    #[serde(default)]
    pub panicked: bool,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let how = if self.panicked { "panicked" } else { "failed" };
        write!(f, "#{} {} {how}: {}", self.position, self.interceptor, self.message)
    }
}

/// Every failure collected while notifying interceptors of one transition.
///
/// Built only after all interceptors were attempted. The request bookkeeping
/// has already completed by then, so `request_id` is always valid: on start
/// the request is active, on end it is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorFailures {
    pub request_id: RequestId,
    pub phase: Phase,
    pub failures: Vec<HookFailure>,
}

impl fmt::Display for InterceptorFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} interceptor(s) failed on {} of request {}",
            self.failures.len(),
            self.phase,
            self.request_id
        )?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("execution context has no resolvable identity")]
    InvalidContext,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Interceptors(InterceptorFailures),
}

impl RequestError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidContext => ErrorKind::InvalidContext,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Interceptors(_) => ErrorKind::InterceptorFailure,
        }
    }

    /// Id of the request whose transition produced interceptor failures.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::Interceptors(f) => Some(&f.request_id),
            _ => None,
        }
    }

    pub fn interceptor_failures(&self) -> Option<&InterceptorFailures> {
        match self {
            Self::Interceptors(f) => Some(f),
            _ => None,
        }
    }
}
