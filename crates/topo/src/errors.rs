//! Error taxonomy of the topology layer
//!
//! Callers dispatch on the kind: `NoNode` and `NodeExists` drive
//! create-if-missing flows, `BadVersion` drives the optimistic update
//! retry loop, `PartialResult` travels alongside incomplete fan-out
//! results, and `NoUpdateNeeded` is the mutator's way of short-circuiting
//! a write.

#[derive(Debug, Clone, thiserror::Error)]
pub enum TopoError {
    /// The named node does not exist.
    #[error("node doesn't exist: {0}")]
    NoNode(String),
    /// The named node already exists.
    #[error("node already exists: {0}")]
    NodeExists(String),
    /// A conditional write was attempted against a stale version token.
    #[error("bad node version: {0}")]
    BadVersion(String),
    /// A fan-out read could not reach every cell; the accompanying value
    /// holds what was fetched.
    #[error("partial result: {0}")]
    PartialResult(String),
    /// Returned by an update mutator to signal nothing should be written.
    #[error("no update needed")]
    NoUpdateNeeded,
    /// The operation was interrupted, typically by cancellation.
    #[error("interrupted operation: {0}")]
    Interrupted(String),
    #[error("deadline exceeded: {0}")]
    Timeout(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TopoError {
    pub fn is_no_node(&self) -> bool {
        matches!(self, TopoError::NoNode(_))
    }

    pub fn is_node_exists(&self) -> bool {
        matches!(self, TopoError::NodeExists(_))
    }

    pub fn is_bad_version(&self) -> bool {
        matches!(self, TopoError::BadVersion(_))
    }

    pub fn is_partial_result(&self) -> bool {
        matches!(self, TopoError::PartialResult(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, TopoError::Interrupted(_))
    }
}
