//! Tower middleware for [`HyperClient`](crate::HyperClient).
//!
//! Layers wrap the type-erased transport service; add them with
//! [`HyperClientBuilder::layer`](crate::HyperClientBuilder::layer).
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-logging` | `.with_logging()` helper, logging in `.with_defaults()` |

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

pub use tower::{Layer, ServiceBuilder};
