//! HTTP transport trait.
//!
//! [`HttpClient`] is the only thing plier needs from a transport: turn a
//! finished [`Request`] into a buffered [`Response`]. Implement it directly
//! for custom auth or for testing.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Boxed, sendable future resolving to a plier result.
pub type ServiceFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// Core HTTP client trait.
///
/// Implementations own connection pooling, timeouts and retries.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// Non-2xx statuses are not errors at this level.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}
