//! GCM Dispatch Service
//!
//! Sends message records through a gateway, reconciles the per-recipient
//! reply into a final status and deactivates devices whose tokens the
//! gateway rejects.

mod dispatch;
mod reconcile;
mod registry;

#[cfg(test)]
mod testing;

pub use dispatch::*;
pub use reconcile::*;
pub use registry::*;
