//! Resource tracking for reusable and long-lived session state
//!
//! Two trackers live here:
//! - [`ResourcePool`]: a bounded pool of reusable resources such as backend
//!   connections, with idle expiry, prefill and drain/rebuild support.
//! - [`Numbered`]: a registry of stateful sessions keyed by integer id,
//!   with lease semantics and post-mortem records for ids that are gone.

pub mod numbered;
pub mod resource_pool;

pub use numbered::{Numbered, NumberedError};
pub use resource_pool::{
    Factory, LogWait, PoolError, RefreshCheck, Resource, ResourcePool, ResourcePoolOptions,
};
