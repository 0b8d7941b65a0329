//! Topology metadata layer
//!
//! Stores and serves the cluster's sharding metadata (keyspaces, shards,
//! tablets, serving routes) through a pluggable strongly-consistent
//! key-value backend. One global backend holds the source-of-truth
//! records; each cell additionally runs a local backend holding the
//! per-cell replication graph.
//!
//! All reads are versioned and all writes go through optimistic
//! concurrency on the backend's version token; see
//! [`TopoServer::update_shard_fields`] for the canonical read-modify-write
//! loop.

pub mod config;
pub mod conn;
pub mod errors;
pub mod key;
pub mod keyspace;
pub mod lock;
pub mod memory;
pub mod replication;
pub mod shard;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prost::Message;
use tokio_util::sync::CancellationToken;

pub use conn::{Conn, LockDescriptor, Version, WatchData, WatchReceiver};
pub use errors::TopoError;
pub use keyspace::KeyspaceInfo;
pub use lock::KeyspaceLock;
pub use replication::ShardReplicationInfo;
pub use shard::ShardInfo;

/// Path components used inside every backend.
pub const CELLS_PATH: &str = "cells";
pub const CELL_INFO_FILE: &str = "CellInfo";
pub const KEYSPACES_PATH: &str = "keyspaces";
pub const KEYSPACE_FILE: &str = "Keyspace";
pub const VSCHEMA_FILE: &str = "VSchema";
pub const SHARDS_PATH: &str = "shards";
pub const SHARD_FILE: &str = "Shard";
pub const SHARD_REPLICATION_FILE: &str = "ShardReplication";

pub(crate) fn keyspace_path(keyspace: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}")
}

pub(crate) fn keyspace_file_path(keyspace: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/{KEYSPACE_FILE}")
}

pub(crate) fn vschema_file_path(keyspace: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/{VSCHEMA_FILE}")
}

pub(crate) fn shards_dir_path(keyspace: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/{SHARDS_PATH}")
}

pub(crate) fn shard_file_path(keyspace: &str, shard: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/{SHARDS_PATH}/{shard}/{SHARD_FILE}")
}

/// Path of the replication record inside a cell-local backend.
pub(crate) fn shard_replication_file_path(keyspace: &str, shard: &str) -> String {
    format!("{KEYSPACES_PATH}/{keyspace}/{SHARDS_PATH}/{shard}/{SHARD_REPLICATION_FILE}")
}

pub(crate) fn cell_info_file_path(cell: &str) -> String {
    format!("{CELLS_PATH}/{cell}/{CELL_INFO_FILE}")
}

/// TopoServer is the entry point to the topology. It owns path
/// conventions, record encoding, locking discipline, and cross-cell
/// fan-out. Cheap to clone; clones share the same backends.
#[derive(Clone)]
pub struct TopoServer {
    global_cell: Arc<dyn Conn>,
    cells: Arc<RwLock<HashMap<String, Arc<dyn Conn>>>>,
}

impl TopoServer {
    /// Wrap a global backend. Cell backends are registered with
    /// [`add_cell`](Self::add_cell) or through
    /// [`with_config`](Self::with_config).
    pub fn new(global_cell: Arc<dyn Conn>) -> Self {
        TopoServer {
            global_cell,
            cells: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build a server from a [`config::TopoConfig`], connecting each
    /// backend through `connect(implementation, server_address, root)` and
    /// recording every configured cell in the global cell roster.
    pub async fn with_config(
        ctx: &CancellationToken,
        config: &config::TopoConfig,
        connect: impl Fn(&str, &str, &str) -> Result<Arc<dyn Conn>, TopoError>,
    ) -> Result<Self, TopoError> {
        let global = connect(
            &config.implementation,
            &config.global_server_address,
            &config.global_root,
        )?;
        let ts = TopoServer::new(global);
        for (name, cell) in &config.cells {
            let conn = connect(&config.implementation, &cell.server_address, &cell.root)?;
            ts.create_cell_info(
                ctx,
                name,
                &proto::CellInfo {
                    server_address: cell.server_address.clone(),
                    root: cell.root.clone(),
                },
            )
            .await?;
            ts.add_cell(name, conn);
        }
        Ok(ts)
    }

    pub(crate) fn global_cell(&self) -> &Arc<dyn Conn> {
        &self.global_cell
    }

    /// Register the local backend for a cell.
    pub fn add_cell(&self, cell: &str, conn: Arc<dyn Conn>) {
        self.cells.write().insert(cell.to_string(), conn);
    }

    /// Backend for a cell previously registered with `add_cell`.
    pub fn conn_for_cell(&self, cell: &str) -> Result<Arc<dyn Conn>, TopoError> {
        self.cells
            .read()
            .get(cell)
            .cloned()
            .ok_or_else(|| TopoError::NoNode(format!("cell {cell}")))
    }

    /// Names of all cells registered in the global cell roster. An absent
    /// roster means no cells yet, not an error.
    pub async fn get_cell_info_names(
        &self,
        ctx: &CancellationToken,
    ) -> Result<Vec<String>, TopoError> {
        match self.global_cell.list_dir(ctx, CELLS_PATH).await {
            Ok(names) => Ok(names),
            Err(err) if err.is_no_node() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Record a cell in the global roster.
    pub async fn create_cell_info(
        &self,
        ctx: &CancellationToken,
        cell: &str,
        info: &proto::CellInfo,
    ) -> Result<(), TopoError> {
        let data = info.encode_to_vec();
        match self
            .global_cell
            .create(ctx, &cell_info_file_path(cell), data.into())
            .await
        {
            Ok(_) | Err(TopoError::NodeExists(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Read a cell's record from the global roster.
    pub async fn get_cell_info(
        &self,
        ctx: &CancellationToken,
        cell: &str,
    ) -> Result<proto::CellInfo, TopoError> {
        let (data, _version) = self
            .global_cell
            .get(ctx, &cell_info_file_path(cell))
            .await?;
        proto::CellInfo::decode(data.as_ref())
            .map_err(|err| TopoError::Internal(format!("bad cell info data for {cell}: {err}")))
    }
}
