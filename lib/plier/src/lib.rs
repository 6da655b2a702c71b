//! Declarative HTTP request compiler, in the spirit of Retrofit.
//!
//! An API method is described once as a [`MethodDescriptor`]: an HTTP verb
//! and relative URL, static headers, an encoding, and one declaration per
//! parameter. plier validates the description, resolves converters and a
//! call adapter, caches the result, and then turns every invocation's
//! arguments into a ready-to-send [`Request`].
//!
//! - [`RequestTemplate`]: one-time static analysis of a method
//! - [`RequestAssembler`]: per-call argument binding
//! - [`ConverterFactory`] / [`CallAdapterFactory`]: pluggable conversion and return shapes
//! - [`ServiceMethod`] and [`MethodCache`]: compiled, build-once pipelines
//! - [`ApiClient`]: the entry point
//! - [`HyperClient`]: the default transport, with tower middleware
//!
//! # Example
//!
//! ```no_run
//! use plier::prelude::*;
//!
//! # async fn run() -> plier::Result<()> {
//! let api = ApiClient::builder()
//!     .base_url("https://api.example.com/")
//!     .build()?;
//!
//! let get_user = MethodDescriptor::new("getUser")
//!     .declare(Declaration::get("users/{id}"))
//!     .param(TypeDesc::string(), [Declaration::path("id")])
//!     .returns(TypeDesc::call(TypeDesc::string()));
//!
//! let response = api.call(&get_user, vec!["42".into()])?.execute().await?;
//! println!("{:?}", response.body());
//! # Ok(())
//! # }
//! ```

mod api_client;
mod assembler;
mod cache;
mod call;
mod call_adapter;
mod client;
mod config;
mod connector;
mod converter;
mod handler;
pub mod middleware;
pub mod prelude;
mod service_method;
mod template;

pub use api_client::{ApiClient, ApiClientBuilder};
pub use assembler::{InProgressRequest, RequestAssembler};
pub use cache::MethodCache;
pub use call::{Call, CallFactory, CancelHandle};
pub use call_adapter::{
    CallAdapter, CallAdapterFactory, CallAdapterResolver, DefaultCallAdapterFactory,
    FutureCallAdapterFactory,
};
pub use client::{BoxedService, HyperClient, HyperClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use converter::{
    BuiltInConverters, ConverterFactory, ConverterResolver, JsonConverterFactory,
    RequestBodyConverter, ResponseConverter, StringConverter, ToStringConverterFactory,
};
pub use handler::ParameterHandler;
pub use service_method::{CallTarget, ServiceMethod};
pub use template::{RequestTemplate, RequestTemplateBuilder};

pub use tower;

pub use plier_core::{
    BuildError, BuildErrorKind, ContentType, DEFAULT_TRANSFER_ENCODING, Declaration, Encoding,
    Error, Form, HttpClient, MapEntryFault, Method, MethodDescriptor, MethodKey, ParamContext,
    ParamKind, Parameter, Part, PathTemplate, Payload, Request, RequestBuilder, Response, Result,
    ServiceFuture, TypeDesc, Value, from_json, is_media_type, to_form, to_json, types,
};

pub use plier_core::{StatusCode, header};

pub use url;
