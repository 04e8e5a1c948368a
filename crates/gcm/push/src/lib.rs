//! GCM Push Gateway
//!
//! Delivery of notification payloads to the cloud messaging gateway.

mod http;
mod traits;

pub use http::*;
pub use traits::*;
