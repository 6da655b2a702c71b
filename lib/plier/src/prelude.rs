//! Prelude module for convenient imports.
//!
//! ```
//! use plier::prelude::*;
//! ```

pub use crate::{
    ApiClient, Call, CallAdapterFactory, ConverterFactory, Declaration, Error, HttpClient,
    HyperClient, JsonConverterFactory, Method, MethodDescriptor, Part, Request, Response, Result,
    ServiceFuture, StatusCode, TypeDesc, Value,
};
pub use serde::{Deserialize, Serialize};
