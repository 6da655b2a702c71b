//! In-flight calls.
//!
//! A [`Call`] pairs one assembled request with the transport and the response
//! converter of its method. It runs at most once: [`Call::execute`] and
//! [`Call::enqueue`] consume it; clone it to send the same request again.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use plier_core::{HttpClient, Payload, StatusCode, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::converter::ResponseConverter;
use crate::{Error, Request, Response, Result, ServiceFuture};

/// Object-safe transport used by calls.
///
/// Every cloneable [`HttpClient`] is a `CallFactory`.
pub trait CallFactory: Send + Sync {
    /// Send the request.
    fn execute(&self, request: Request<Bytes>) -> ServiceFuture<Response<Bytes>>;
}

impl<C> CallFactory for C
where
    C: HttpClient + Clone + 'static,
{
    fn execute(&self, request: Request<Bytes>) -> ServiceFuture<Response<Bytes>> {
        let client = self.clone();
        Box::pin(async move { HttpClient::execute(&client, request).await })
    }
}

/// Cancels a [`Call`] from elsewhere, including after it was consumed.
#[derive(Debug, Clone)]
pub struct CancelHandle(AbortHandle);

impl CancelHandle {
    /// Cancel the call. The pending or future result is [`Error::Canceled`].
    pub fn cancel(&self) {
        self.0.abort();
    }

    /// Whether the call was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.is_aborted()
    }
}

/// One HTTP exchange, ready to run.
pub struct Call {
    request: Request<Bytes>,
    factory: Arc<dyn CallFactory>,
    converter: Arc<dyn ResponseConverter>,
    runtime: Option<Handle>,
    abort: AbortHandle,
    registration: AbortRegistration,
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("method", &self.request.method())
            .field("url", &self.request.url().as_str())
            .field("converter", &self.converter.name())
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

impl Clone for Call {
    /// A fresh, not yet canceled call for the same request.
    fn clone(&self) -> Self {
        Self::new(
            self.request.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.converter),
            self.runtime.clone(),
        )
    }
}

impl Call {
    /// Create a call.
    ///
    /// `runtime` is where [`enqueue`](Self::enqueue) spawns; `None` means the
    /// runtime of the caller.
    #[must_use]
    pub fn new(
        request: Request<Bytes>,
        factory: Arc<dyn CallFactory>,
        converter: Arc<dyn ResponseConverter>,
        runtime: Option<Handle>,
    ) -> Self {
        let (abort, registration) = AbortHandle::new_pair();
        Self {
            request,
            factory,
            converter,
            runtime,
            abort,
            registration,
        }
    }

    /// The request this call sends.
    #[must_use]
    pub const fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Handle to cancel this call.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.abort.clone())
    }

    /// Cancel this call.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Whether this call was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Send the request and convert the response.
    ///
    /// # Errors
    ///
    /// - [`Error::Canceled`] if the call was canceled before completion
    /// - [`Error::Http`] with the raw body for a non-2xx status
    /// - transport and conversion errors
    pub async fn execute(self) -> Result<Response<Value>> {
        let Self {
            request,
            factory,
            converter,
            registration,
            ..
        } = self;

        debug!(method = %request.method(), url = %request.url(), "executing call");
        let exchange = factory.execute(request);
        let response = Abortable::new(exchange, registration)
            .await
            .map_err(|_| Error::Canceled)??;

        parse_response(response, converter.as_ref())
    }

    /// Run the call in the background and hand the result to `callback`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when no runtime was configured and
    /// the caller is not inside a Tokio runtime.
    pub fn enqueue<F>(self, callback: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Result<Response<Value>>) + Send + 'static,
    {
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|e| {
                Error::invalid_request(format!("enqueue needs a Tokio runtime: {e}"))
            })?,
        };

        Ok(runtime.spawn(async move {
            let result = self.execute().await;
            callback(result);
        }))
    }
}

/// Turn a raw response into a converted one.
///
/// 204 and 205 carry no body: the converter is not invoked.
fn parse_response(
    response: Response<Bytes>,
    converter: &dyn ResponseConverter,
) -> Result<Response<Value>> {
    let (status, headers, body) = response.into_parts();

    if !(200..300).contains(&status) {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("HTTP error");
        return Err(Error::http_with_body(status, reason, body));
    }

    if status == 204 || status == 205 {
        trace!(status, "empty response");
        return Ok(Response::new(status, headers, Value::Null));
    }

    let content_type = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Type"))
        .map(|(_, value)| value.clone());
    let payload = match content_type {
        Some(content_type) => Payload::new(content_type, body),
        None => Payload::untyped(body),
    };

    let value = converter.convert(payload)?;
    Ok(Response::new(status, headers, value))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use plier_core::Method;

    use super::*;
    use crate::converter::{BuiltInConverters, ConverterFactory};

    /// Replies with a fixed status and body, counting requests.
    #[derive(Debug, Clone)]
    struct Fixed {
        status: u16,
        body: &'static str,
        hits: Arc<AtomicUsize>,
    }

    impl HttpClient for Fixed {
        async fn execute(&self, _request: Request<Bytes>) -> Result<Response<Bytes>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(
                self.status,
                vec![("Content-Type".to_string(), "text/plain".to_string())],
                Bytes::from_static(self.body.as_bytes()),
            ))
        }
    }

    fn call(status: u16, body: &'static str) -> (Call, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let factory = Arc::new(Fixed {
            status,
            body,
            hits: Arc::clone(&hits),
        });
        let converter = BuiltInConverters
            .response_converter(&plier_core::TypeDesc::string(), &[])
            .expect("text converter");
        let url = url::Url::parse("http://localhost/ping").expect("url");
        let request = Request::builder(Method::Get, url).build();
        (Call::new(request, factory, converter, None), hits)
    }

    #[tokio::test]
    async fn success_body_is_converted() {
        let (call, _) = call(200, "pong");
        let response = call.execute().await.expect("response");
        check!(response.status() == 200);
        check!(response.body() == &Value::String("pong".to_string()));
    }

    #[tokio::test]
    async fn no_content_skips_converter() {
        let (call, _) = call(204, "ignored");
        let response = call.execute().await.expect("response");
        check!(response.body().is_null());
    }

    #[tokio::test]
    async fn error_status_keeps_raw_body() {
        let (call, _) = call(503, "down");
        let_assert!(Err(err) = call.execute().await);
        check!(err.status() == Some(503));
        check!(err.body().map(Bytes::as_ref) == Some(b"down".as_slice()));
        check!(err.to_string().contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn canceled_call_never_reaches_transport() {
        let (call, hits) = call(200, "pong");
        let handle = call.cancel_handle();
        handle.cancel();

        check!(call.is_canceled());
        let_assert!(Err(Error::Canceled) = call.execute().await);
        check!(hits.load(Ordering::SeqCst) == 0);
    }

    #[tokio::test]
    async fn clone_is_a_fresh_call() {
        let (call, hits) = call(200, "pong");
        let again = call.clone();
        call.cancel();

        check!(!again.is_canceled());
        check!(again.execute().await.is_ok());
        check!(hits.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn enqueue_delivers_to_callback() {
        let (call, _) = call(200, "pong");
        let (tx, rx) = tokio::sync::oneshot::channel();
        let task = call
            .enqueue(move |result| {
                let _ = tx.send(result.map(Response::into_body));
            })
            .expect("runtime");

        task.await.expect("join");
        let value = rx.await.expect("callback").expect("value");
        check!(value == Value::String("pong".to_string()));
    }

    #[test]
    fn enqueue_without_runtime_fails() {
        let (call, _) = call(200, "pong");
        let_assert!(Err(Error::InvalidRequest(_)) = call.enqueue(|_| {}));
    }
}
