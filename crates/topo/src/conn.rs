//! Backend contract
//!
//! [`Conn`] is the interface every topology backend implements: versioned
//! reads and conditional writes, directory listing, watches and leased
//! locks. The server layer never talks bytes to anything else.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::errors::TopoError;

/// Opaque write token returned by versioned reads. Equality is the only
/// defined operation; a backend may put anything monotonic behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(pub u64);

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One record delivered on a watch: the node contents and the version
/// they were written at.
#[derive(Debug, Clone)]
pub struct WatchData {
    pub contents: Bytes,
    pub version: Version,
}

/// Receiver half of a watch. Errors are terminal: after an `Err` record
/// (cancellation delivers `Interrupted`, deletion delivers `NoNode`) the
/// channel closes.
pub type WatchReceiver = mpsc::UnboundedReceiver<Result<WatchData, TopoError>>;

/// Held lease on a path. Dropping the descriptor releases the lease, but
/// callers should prefer the explicit `unlock` so release errors are
/// observable.
#[async_trait]
pub trait LockDescriptor: Send + Sync {
    async fn unlock(self: Box<Self>) -> Result<(), TopoError>;
}

/// A connection to one topology backend (the global one or a cell-local
/// one). Paths are `/`-separated and relative to the backend root.
#[async_trait]
pub trait Conn: Send + Sync {
    /// Read a node's contents and current version.
    async fn get(
        &self,
        ctx: &CancellationToken,
        path: &str,
    ) -> Result<(Bytes, Version), TopoError>;

    /// Create a node. Fails with `NodeExists` if the path is taken.
    async fn create(
        &self,
        ctx: &CancellationToken,
        path: &str,
        contents: Bytes,
    ) -> Result<Version, TopoError>;

    /// Overwrite a node. With `expected` set the write only succeeds
    /// against that exact version, failing with `BadVersion` otherwise;
    /// with `None` the write is unconditional and creates the node if it
    /// is missing.
    async fn update(
        &self,
        ctx: &CancellationToken,
        path: &str,
        contents: Bytes,
        expected: Option<&Version>,
    ) -> Result<Version, TopoError>;

    /// Delete a node, optionally only at an expected version.
    async fn delete(
        &self,
        ctx: &CancellationToken,
        path: &str,
        expected: Option<&Version>,
    ) -> Result<(), TopoError>;

    /// Names of the immediate children under `path`.
    async fn list_dir(
        &self,
        ctx: &CancellationToken,
        path: &str,
    ) -> Result<Vec<String>, TopoError>;

    /// Watch a node. Returns its current state plus a stream of updates.
    /// Cancelling `ctx` makes the stream deliver a final `Interrupted`
    /// record and close.
    async fn watch(
        &self,
        ctx: &CancellationToken,
        path: &str,
    ) -> Result<(WatchData, WatchReceiver), TopoError>;

    /// Take a named lease on `path`, blocking until it is free or `ctx`
    /// is cancelled. `contents` describes the holder for diagnostics.
    async fn lock(
        &self,
        ctx: &CancellationToken,
        path: &str,
        contents: &str,
    ) -> Result<Box<dyn LockDescriptor>, TopoError>;
}
