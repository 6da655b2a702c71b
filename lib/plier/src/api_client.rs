//! API client: the entry point tying everything together.
//!
//! An [`ApiClient`] owns a base URL, a transport, the converter and call
//! adapter chains, and a [`MethodCache`]. Methods are described by
//! [`MethodDescriptor`]s and compiled on first use.

use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

use plier_core::{BuildError, HttpClient, MethodDescriptor, Value};
use tokio::runtime::Handle;
use tracing::debug;
use url::Url;

use crate::cache::MethodCache;
use crate::call::{Call, CallFactory};
use crate::call_adapter::{CallAdapterFactory, CallAdapterResolver};
use crate::converter::{ConverterFactory, ConverterResolver};
use crate::service_method::{CallTarget, ServiceMethod};
use crate::{Error, HyperClient, Result};

/// Compiles and invokes API methods.
///
/// Cheap to clone; clones share the method cache.
///
/// # Example
///
/// ```no_run
/// use plier::{ApiClient, Declaration, JsonConverterFactory, MethodDescriptor, TypeDesc};
///
/// # async fn run() -> plier::Result<()> {
/// let api = ApiClient::builder()
///     .base_url("https://api.example.com/")
///     .add_converter_factory(JsonConverterFactory)
///     .build()?;
///
/// let get_user = MethodDescriptor::new("getUser")
///     .declare(Declaration::get("users/{id}"))
///     .param(TypeDesc::named("u64"), [Declaration::path("id")])
///     .returns(TypeDesc::future(TypeDesc::named("User")));
///
/// let user = api.invoke_as::<plier::ServiceFuture<plier::Value>>(&get_user, vec![42_u64.into()])?.await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    target: CallTarget,
    converters: ConverterResolver,
    adapters: CallAdapterResolver,
    cache: Arc<MethodCache>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("target", &self.target)
            .field("converters", &self.converters)
            .field("adapters", &self.adapters)
            .field("cache", &self.cache)
            .finish()
    }
}

impl ApiClient {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Base URL relative paths resolve against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        self.target.base_url()
    }

    /// Method cache shared by this client and its clones.
    #[must_use]
    pub fn method_cache(&self) -> &Arc<MethodCache> {
        &self.cache
    }

    /// Compiled pipeline for `descriptor`, built at most once per method key.
    ///
    /// # Errors
    ///
    /// Returns the build error of the method; it is cached like a success.
    pub fn service_method(
        &self,
        descriptor: &MethodDescriptor,
    ) -> std::result::Result<Arc<ServiceMethod>, BuildError> {
        self.cache.get_or_build(&descriptor.key(), || {
            ServiceMethod::build(descriptor, &self.converters, &self.adapters)
        })
    }

    /// Compile every method up front.
    ///
    /// # Errors
    ///
    /// Returns the first build error.
    pub fn validate<'a>(
        &self,
        descriptors: impl IntoIterator<Item = &'a MethodDescriptor>,
    ) -> std::result::Result<(), BuildError> {
        for descriptor in descriptors {
            self.service_method(descriptor)?;
        }
        Ok(())
    }

    /// Assemble a [`Call`] for `descriptor`, bypassing the call adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] or the first argument error.
    pub fn call(&self, descriptor: &MethodDescriptor, args: Vec<Value>) -> Result<Call> {
        self.service_method(descriptor)?.call(&self.target, args)
    }

    /// Invoke `descriptor` and return the adapted value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] or the first argument error.
    pub fn invoke(&self, descriptor: &MethodDescriptor, args: Vec<Value>) -> Result<Box<dyn Any + Send>> {
        self.service_method(descriptor)?.invoke(&self.target, args)
    }

    /// Invoke `descriptor` and downcast the adapted value to `R`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReturnTypeMismatch`] if the adapter produced another type.
    pub fn invoke_as<R: Any>(&self, descriptor: &MethodDescriptor, args: Vec<Value>) -> Result<R> {
        self.invoke(descriptor, args)?
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| Error::ReturnTypeMismatch {
                expected: any::type_name::<R>(),
            })
    }
}

/// Builder for [`ApiClient`].
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    client: Option<Arc<dyn CallFactory>>,
    converter_factories: Vec<Arc<dyn ConverterFactory>>,
    call_adapter_factories: Vec<Arc<dyn CallAdapterFactory>>,
    callback_runtime: Option<Handle>,
    validate_eagerly: bool,
    services: Vec<MethodDescriptor>,
    cache: Option<Arc<MethodCache>>,
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("base_url", &self.base_url)
            .field("client", &self.client.is_some())
            .field("converter_factories", &self.converter_factories)
            .field("call_adapter_factories", &self.call_adapter_factories)
            .field("validate_eagerly", &self.validate_eagerly)
            .field("services", &self.services.len())
            .finish_non_exhaustive()
    }
}

impl ApiClientBuilder {
    /// Base URL; it must end in `/`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Transport. Defaults to [`HyperClient::new`].
    #[must_use]
    pub fn client<C>(mut self, client: C) -> Self
    where
        C: HttpClient + Clone + 'static,
    {
        self.client = Some(Arc::new(client));
        self
    }

    /// Transport, as a shared call factory.
    #[must_use]
    pub fn call_factory(mut self, factory: Arc<dyn CallFactory>) -> Self {
        self.client = Some(factory);
        self
    }

    /// Register a converter factory. Registration order is lookup order.
    #[must_use]
    pub fn add_converter_factory(mut self, factory: impl ConverterFactory + 'static) -> Self {
        self.converter_factories.push(Arc::new(factory));
        self
    }

    /// Register a call adapter factory, consulted before the built-in ones.
    #[must_use]
    pub fn add_call_adapter_factory(mut self, factory: impl CallAdapterFactory + 'static) -> Self {
        self.call_adapter_factories.push(Arc::new(factory));
        self
    }

    /// Runtime that [`Call::enqueue`] spawns on. Defaults to the caller's runtime.
    #[must_use]
    pub fn callback_runtime(mut self, handle: Handle) -> Self {
        self.callback_runtime = Some(handle);
        self
    }

    /// Compile every registered service method in [`build`](Self::build).
    #[must_use]
    pub const fn validate_eagerly(mut self, validate: bool) -> Self {
        self.validate_eagerly = validate;
        self
    }

    /// Register the methods of a service, for eager validation.
    #[must_use]
    pub fn service(mut self, methods: impl IntoIterator<Item = MethodDescriptor>) -> Self {
        self.services.extend(methods);
        self
    }

    /// Use an existing method cache instead of a fresh one.
    ///
    /// Entries are keyed by method name only. Clients sharing a cache must
    /// register the same converter and call adapter factories: a method built
    /// by one client is reused as is by the others.
    #[must_use]
    pub fn method_cache(mut self, cache: Arc<MethodCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if the base URL is missing or does not end in `/`
    /// - [`Error::InvalidUrl`] if it does not parse
    /// - [`Error::Build`] for the first invalid method when validating eagerly
    pub fn build(self) -> Result<ApiClient> {
        let Some(base_url) = self.base_url else {
            return Err(Error::invalid_request("base URL required"));
        };
        let base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            return Err(Error::invalid_request(format!(
                "base URL must end in /: {base_url}"
            )));
        }

        let client = self
            .client
            .unwrap_or_else(|| Arc::new(HyperClient::new()));
        let api = ApiClient {
            target: CallTarget::new(base_url, client, self.callback_runtime),
            converters: ConverterResolver::new(self.converter_factories),
            adapters: CallAdapterResolver::new(self.call_adapter_factories),
            cache: self.cache.unwrap_or_default(),
        };

        if self.validate_eagerly {
            debug!(methods = self.services.len(), "validating service methods");
            api.validate(&self.services)?;
        }
        Ok(api)
    }
}
