//! MySQL wire-protocol boundary
//!
//! The fixed dictionary of wire-protocol constants (capability flags,
//! status flags, command opcodes, error numbers, SQL states, charsets)
//! plus the error classification used by pooling and retry policies.
//! These are data at the proxy boundary, not behavior: the codec itself
//! lives elsewhere.

pub mod charset;
pub mod constants;
pub mod error;

pub use error::{
    is_conn_err, is_conn_lost_during_query, is_ephemeral_error, is_schema_apply_error,
    is_too_many_connections_err, SQLError,
};
