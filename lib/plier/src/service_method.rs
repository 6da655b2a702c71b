//! Per-method invocation pipeline.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use plier_core::{BuildError, BuildErrorKind, Method, MethodDescriptor, TypeDesc, Value, types};
use tokio::runtime::Handle;
use tracing::{debug, trace};
use url::Url;

use crate::Result;
use crate::assembler::RequestAssembler;
use crate::call::{Call, CallFactory};
use crate::call_adapter::{CallAdapter, CallAdapterResolver};
use crate::converter::{ConverterResolver, ResponseConverter};
use crate::template::RequestTemplate;

/// Where calls are sent.
#[derive(Clone)]
pub struct CallTarget {
    base_url: Url,
    factory: Arc<dyn CallFactory>,
    runtime: Option<Handle>,
}

impl fmt::Debug for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallTarget")
            .field("base_url", &self.base_url.as_str())
            .field("runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl CallTarget {
    /// Create a target. `runtime` is used by [`Call::enqueue`].
    #[must_use]
    pub fn new(base_url: Url, factory: Arc<dyn CallFactory>, runtime: Option<Handle>) -> Self {
        Self {
            base_url,
            factory,
            runtime,
        }
    }

    /// Base URL relative paths resolve against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Compiled method: request template, call adapter and response converter.
///
/// Immutable once built and shared between callers; every invocation only
/// touches its own request.
#[derive(Debug)]
pub struct ServiceMethod {
    template: RequestTemplate,
    adapter: Arc<dyn CallAdapter>,
    converter: Arc<dyn ResponseConverter>,
}

impl ServiceMethod {
    /// Compile a method.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] found in the declarations, the
    /// parameters or the return type.
    pub fn build(
        descriptor: &MethodDescriptor,
        converters: &ConverterResolver,
        adapters: &CallAdapterResolver,
    ) -> std::result::Result<Self, BuildError> {
        let template = RequestTemplate::build(descriptor, converters)?;
        let fail = |kind| BuildError::method(descriptor.name(), kind);

        let return_type = descriptor.return_type();
        if return_type.is_unit() {
            return Err(fail(BuildErrorKind::UnitReturnType));
        }
        if return_type.has_unresolvable() {
            return Err(fail(BuildErrorKind::UnresolvableType(return_type.to_string())));
        }

        let adapter = adapters
            .get(return_type, descriptor.declarations())
            .map_err(fail)?;
        let response_type = adapter.response_type();
        if response_type.raw_name() == Some(types::RESPONSE) {
            return Err(fail(BuildErrorKind::InvalidResponseType(
                response_type.to_string(),
            )));
        }
        if template.method() == Method::Head && !response_type.is_unit() {
            return Err(fail(BuildErrorKind::HeadMustReturnVoid));
        }

        let converter = converters
            .response_converter(response_type, descriptor.declarations())
            .map_err(fail)?;

        debug!(
            method = descriptor.name(),
            response_type = %response_type,
            converter = converter.name(),
            "service method built"
        );
        Ok(Self {
            template,
            adapter,
            converter,
        })
    }

    /// Request template.
    #[must_use]
    pub const fn template(&self) -> &RequestTemplate {
        &self.template
    }

    /// Type the response body is converted to.
    #[must_use]
    pub fn response_type(&self) -> &TypeDesc {
        self.adapter.response_type()
    }

    /// Assemble the request and wrap it in a [`Call`], without adapting.
    ///
    /// # Errors
    ///
    /// Returns the first argument error; nothing is sent.
    pub fn call(&self, target: &CallTarget, args: Vec<Value>) -> Result<Call> {
        let request = RequestAssembler::apply(&self.template, &target.base_url, args)?;
        trace!(
            method = self.template.method_name(),
            url = %request.url(),
            "request assembled"
        );
        Ok(Call::new(
            request,
            Arc::clone(&target.factory),
            Arc::clone(&self.converter),
            target.runtime.clone(),
        ))
    }

    /// Assemble the request and adapt the call into the declared return value.
    ///
    /// # Errors
    ///
    /// Returns the first argument error; nothing is sent.
    pub fn invoke(&self, target: &CallTarget, args: Vec<Value>) -> Result<Box<dyn Any + Send>> {
        let call = self.call(target, args)?;
        Ok(self.adapter.adapt(call))
    }
}
