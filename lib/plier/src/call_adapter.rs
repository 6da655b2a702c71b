//! Call adapters.
//!
//! A [`CallAdapter`] turns a [`Call`] into the value a method returns. It is
//! chosen once per method from an ordered list of [`CallAdapterFactory`]
//! objects, matching on the declared return type. User factories come first,
//! then the built-in ones:
//!
//! | Return type | Adapted value | Response type |
//! |---|---|---|
//! | `Call<T>` | [`Call`] | `T` |
//! | `Future<T>` | `ServiceFuture<Value>` | `T` |
//! | `Future<Response<T>>` | `ServiceFuture<Response<Value>>` | `T` |
//! | `Future<Option<T>>` | `ServiceFuture<Option<Value>>`, 404 is `None` | `T` |
//!
//! Only 2xx responses reach an adapter. Any other status fails the call with
//! [`Error::Http`](crate::Error::Http) carrying the status and raw body, so a
//! `Future<Response<T>>` resolves to a successful response or to an error.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use plier_core::{BuildErrorKind, Declaration, TypeDesc, Value, types};

use crate::call::Call;
use crate::{Response, ServiceFuture};

/// Adapts a call into a method's return value.
pub trait CallAdapter: fmt::Debug + Send + Sync {
    /// Type the response body is converted to.
    fn response_type(&self) -> &TypeDesc;

    /// Adapt the call. The boxed value is downcast by the caller.
    fn adapt(&self, call: Call) -> Box<dyn Any + Send>;
}

/// Creates call adapters for the return types it understands.
pub trait CallAdapterFactory: fmt::Debug + Send + Sync {
    /// Adapter for `return_type`, or `None` if not handled.
    fn get(
        &self,
        return_type: &TypeDesc,
        method_declarations: &[Declaration],
    ) -> Option<Arc<dyn CallAdapter>>;
}

/// Ordered chain of call adapter factories.
#[derive(Debug, Clone)]
pub struct CallAdapterResolver {
    factories: Vec<Arc<dyn CallAdapterFactory>>,
}

impl Default for CallAdapterResolver {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CallAdapterResolver {
    /// User factories first, built-in factories last.
    #[must_use]
    pub fn new(factories: Vec<Arc<dyn CallAdapterFactory>>) -> Self {
        let mut all = factories;
        all.push(Arc::new(DefaultCallAdapterFactory));
        all.push(Arc::new(FutureCallAdapterFactory));
        Self { factories: all }
    }

    /// Resolve the adapter for a return type.
    ///
    /// # Errors
    ///
    /// Returns [`BuildErrorKind::NoCallAdapterFound`] if no factory handles it.
    pub fn get(
        &self,
        return_type: &TypeDesc,
        method_declarations: &[Declaration],
    ) -> Result<Arc<dyn CallAdapter>, BuildErrorKind> {
        self.factories
            .iter()
            .find_map(|factory| factory.get(return_type, method_declarations))
            .ok_or_else(|| BuildErrorKind::NoCallAdapterFound(return_type.to_string()))
    }
}

/// `Call<T>`: the call itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCallAdapterFactory;

impl CallAdapterFactory for DefaultCallAdapterFactory {
    fn get(&self, return_type: &TypeDesc, _: &[Declaration]) -> Option<Arc<dyn CallAdapter>> {
        let response_type = return_type.unwrap_generic(types::CALL)?.clone();
        Some(Arc::new(CallPassthrough { response_type }))
    }
}

#[derive(Debug)]
struct CallPassthrough {
    response_type: TypeDesc,
}

impl CallAdapter for CallPassthrough {
    fn response_type(&self) -> &TypeDesc {
        &self.response_type
    }

    fn adapt(&self, call: Call) -> Box<dyn Any + Send> {
        Box::new(call)
    }
}

/// `Future<T>`, `Future<Response<T>>` and `Future<Option<T>>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureCallAdapterFactory;

impl CallAdapterFactory for FutureCallAdapterFactory {
    fn get(&self, return_type: &TypeDesc, _: &[Declaration]) -> Option<Arc<dyn CallAdapter>> {
        let inner = return_type.unwrap_generic(types::FUTURE)?;

        let adapter = if let Some(body) = inner.unwrap_generic(types::RESPONSE) {
            FutureAdapter {
                response_type: body.clone(),
                shape: FutureShape::Response,
            }
        } else if let Some(body) = inner.unwrap_generic(types::OPTION) {
            FutureAdapter {
                response_type: body.clone(),
                shape: FutureShape::Optional,
            }
        } else {
            FutureAdapter {
                response_type: inner.clone(),
                shape: FutureShape::Body,
            }
        };
        Some(Arc::new(adapter))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FutureShape {
    Body,
    Response,
    Optional,
}

#[derive(Debug)]
struct FutureAdapter {
    response_type: TypeDesc,
    shape: FutureShape,
}

impl CallAdapter for FutureAdapter {
    fn response_type(&self) -> &TypeDesc {
        &self.response_type
    }

    fn adapt(&self, call: Call) -> Box<dyn Any + Send> {
        match self.shape {
            FutureShape::Body => {
                let future: ServiceFuture<Value> =
                    Box::pin(async move { call.execute().await.map(Response::into_body) });
                Box::new(future)
            }
            FutureShape::Response => {
                let future: ServiceFuture<Response<Value>> = Box::pin(call.execute());
                Box::new(future)
            }
            FutureShape::Optional => {
                let future: ServiceFuture<Option<Value>> = Box::pin(async move {
                    match call.execute().await {
                        Ok(response) => Ok(Some(response.into_body())),
                        Err(err) if err.is_not_found() => Ok(None),
                        Err(err) => Err(err),
                    }
                });
                Box::new(future)
            }
        }
    }
}
