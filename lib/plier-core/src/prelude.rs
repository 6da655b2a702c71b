//! Prelude module for convenient imports.
//!
//! ```
//! use plier_core::prelude::*;
//! ```

pub use crate::{
    BuildError, ContentType, Declaration, Error, Form, HttpClient, Method, MethodDescriptor,
    Part, Payload, Request, RequestBuilder, Response, Result, TypeDesc, Value, from_json, to_json,
};
