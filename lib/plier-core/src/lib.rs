//! Core types and traits for the plier declarative HTTP request compiler.
//!
//! This crate provides the data model shared by plier:
//! - [`Method`] - HTTP method enum
//! - [`TypeDesc`] - declared parameter and return types
//! - [`Value`] - dynamically typed arguments and decoded bodies
//! - [`Declaration`] and [`MethodDescriptor`] - parsed method descriptions
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - HTTP response type
//! - [`Payload`], [`Form`] and [`Part`] - request and response bodies
//! - [`PathTemplate`] - relative URL with `{placeholders}`
//! - [`Error`], [`BuildError`] and [`Result`] - Error handling
//! - [`HttpClient`] - Core client trait for HTTP execution

mod body;
mod client;
mod declaration;
mod error;
mod method;
mod multipart;
mod path_template;
pub mod prelude;
mod request;
mod response;
pub mod types;
mod value;

pub use body::{ContentType, Payload, from_json, is_media_type, to_form, to_json};
pub use client::{HttpClient, ServiceFuture};
pub use declaration::{
    DEFAULT_TRANSFER_ENCODING, Declaration, Encoding, MethodDescriptor, MethodKey, ParamKind,
    Parameter,
};
pub use error::{BuildError, BuildErrorKind, Error, MapEntryFault, ParamContext, Result};
pub use method::Method;
pub use multipart::{Form, Part};
pub use path_template::PathTemplate;
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use types::TypeDesc;
pub use value::Value;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
