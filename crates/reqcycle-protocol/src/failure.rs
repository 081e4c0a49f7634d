//! Failure values passed to `end_request` and on to interceptors.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by interceptor hooks.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Why a request ended unsuccessfully.
///
/// Wraps any error type; use [`RequestFailure::msg`] when there is no real
/// error value and the request just needs to be marked as failed.
#[derive(Clone)]
pub struct RequestFailure {
    inner: Arc<dyn Error + Send + Sync>,
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Message {}

impl RequestFailure {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    /// The wrapped error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.inner
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl From<BoxError> for RequestFailure {
    fn from(error: BoxError) -> Self {
        Self {
            inner: Arc::from(error),
        }
    }
}

impl fmt::Debug for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RequestFailure").field(&self.inner).finish()
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}
