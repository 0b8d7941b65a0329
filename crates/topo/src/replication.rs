//! Per-cell replication graph
//!
//! Each cell-local backend keeps a `ShardReplication` record per shard
//! listing the tablets present in that cell. The record is maintained
//! with unconditional read-modify-write (last write wins inside one
//! cell); cross-cell consistency comes from each cell only writing its
//! own record.

use prost::Message;
use tokio_util::sync::CancellationToken;

use proto::{shard_replication::Node, ShardReplication, TabletAlias};

use crate::errors::TopoError;
use crate::{shard_replication_file_path, TopoServer};

/// A replication record paired with the cell and shard it describes.
pub struct ShardReplicationInfo {
    cell: String,
    keyspace: String,
    shard: String,
    pub replication: ShardReplication,
}

impl ShardReplicationInfo {
    pub fn cell(&self) -> &str {
        &self.cell
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn shard(&self) -> &str {
        &self.shard
    }

    /// The node for a tablet, if it is registered in this cell.
    pub fn get_shard_replication_node(&self, alias: &TabletAlias) -> Option<&Node> {
        self.replication
            .nodes
            .iter()
            .find(|node| node.tablet_alias.as_ref() == Some(alias))
    }
}

impl TopoServer {
    /// Read the replication record for a shard in one cell.
    pub async fn get_shard_replication(
        &self,
        ctx: &CancellationToken,
        cell: &str,
        keyspace: &str,
        shard: &str,
    ) -> Result<ShardReplicationInfo, TopoError> {
        let conn = self.conn_for_cell(cell)?;
        let path = shard_replication_file_path(keyspace, shard);
        let (data, _version) = conn.get(ctx, &path).await?;
        let replication = ShardReplication::decode(data.as_ref()).map_err(|err| {
            TopoError::Internal(format!(
                "bad shard replication data for {cell}/{keyspace}/{shard}: {err}"
            ))
        })?;
        Ok(ShardReplicationInfo {
            cell: cell.to_string(),
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            replication,
        })
    }

    /// Apply `update` to the replication record of a shard in one cell,
    /// creating the record if it does not exist yet. Returning
    /// [`TopoError::NoUpdateNeeded`] from the mutator skips the write.
    pub async fn update_shard_replication_fields<F>(
        &self,
        ctx: &CancellationToken,
        cell: &str,
        keyspace: &str,
        shard: &str,
        mut update: F,
    ) -> Result<(), TopoError>
    where
        F: FnMut(&mut ShardReplication) -> Result<(), TopoError>,
    {
        let conn = self.conn_for_cell(cell)?;
        let path = shard_replication_file_path(keyspace, shard);
        loop {
            let existing = match conn.get(ctx, &path).await {
                Ok((data, _version)) => Some(ShardReplication::decode(data.as_ref()).map_err(
                    |err| {
                        TopoError::Internal(format!(
                            "bad shard replication data for {cell}/{keyspace}/{shard}: {err}"
                        ))
                    },
                )?),
                Err(err) if err.is_no_node() => None,
                Err(err) => return Err(err),
            };

            let mut record = existing.clone().unwrap_or_default();
            match update(&mut record) {
                Ok(()) => {}
                Err(TopoError::NoUpdateNeeded) => return Ok(()),
                Err(err) => return Err(err),
            }
            let data = record.encode_to_vec();

            let write = if existing.is_some() {
                conn.update(ctx, &path, data.into(), None).await.map(|_| ())
            } else {
                conn.create(ctx, &path, data.into()).await.map(|_| ())
            };
            match write {
                Ok(()) => return Ok(()),
                // Lost a create race; reread and retry.
                Err(err) if err.is_node_exists() => continue,
                Err(err) => return Err(err),
            }
        }
    }
}
