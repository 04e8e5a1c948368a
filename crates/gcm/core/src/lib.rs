//! GCM Core Types
//!
//! Plain data entities shared by the storage, gateway and dispatch layers:
//! devices, message records, request options and the per-recipient response
//! shape returned by the messaging gateway.

mod device;
mod error;
mod message;
mod options;
mod response;

pub use device::*;
pub use error::*;
pub use message::*;
pub use options::*;
pub use response::*;
