//! Middleware stack for the gateway.
//!
//! Layer order: Request → BodyLimit → Tracing → Timeout → Handler
//!
//! Tracing sits outside the timeout so a request cut off by the timeout is
//! still counted and carries its request id.

pub mod timeout;
pub mod tracing;

pub use timeout::TimeoutLayer;
pub use tracing::{TracingLayer, REQUEST_ID_HEADER};
