//! Keyspace records
//!
//! A keyspace record exists before any shard in it. Creation is
//! idempotent at the caller level: `NodeExists` is surfaced so flows like
//! get-or-create can ignore it.

use std::collections::HashMap;

use prost::Message;
use tokio_util::sync::CancellationToken;
use tracing::info;

use proto::{Keyspace, VSchema};

use crate::conn::Version;
use crate::errors::TopoError;
use crate::shard::ShardInfo;
use crate::{keyspace_file_path, shards_dir_path, vschema_file_path, TopoServer, KEYSPACES_PATH};

/// A keyspace record paired with its name and read version.
pub struct KeyspaceInfo {
    name: String,
    version: Version,
    pub keyspace: Keyspace,
}

impl KeyspaceInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl TopoServer {
    /// Create the named keyspace. Fails with `NodeExists` if it is
    /// already there.
    pub async fn create_keyspace(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        value: &Keyspace,
    ) -> Result<(), TopoError> {
        let data = value.encode_to_vec();
        self.global_cell()
            .create(ctx, &keyspace_file_path(keyspace), data.into())
            .await?;
        info!(keyspace, "created keyspace");
        Ok(())
    }

    pub async fn get_keyspace(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
    ) -> Result<KeyspaceInfo, TopoError> {
        let (data, version) = self
            .global_cell()
            .get(ctx, &keyspace_file_path(keyspace))
            .await?;
        let value = Keyspace::decode(data.as_ref()).map_err(|err| {
            TopoError::Internal(format!("bad keyspace data for {keyspace}: {err}"))
        })?;
        Ok(KeyspaceInfo {
            name: keyspace.to_string(),
            version,
            keyspace: value,
        })
    }

    /// Names of all keyspaces.
    pub async fn get_keyspace_names(
        &self,
        ctx: &CancellationToken,
    ) -> Result<Vec<String>, TopoError> {
        match self.global_cell().list_dir(ctx, KEYSPACES_PATH).await {
            Ok(names) => Ok(names),
            Err(err) if err.is_no_node() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Make sure the keyspace has a routing schema record, writing the
    /// default one if none exists. Loses gracefully to concurrent racers.
    pub async fn ensure_vschema(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
    ) -> Result<(), TopoError> {
        let path = vschema_file_path(keyspace);
        match self.global_cell().get(ctx, &path).await {
            Ok(_) => return Ok(()),
            Err(err) if err.is_no_node() => {}
            Err(err) => return Err(err),
        }
        let default = VSchema {
            sharded: false,
            require_explicit_routing: false,
        };
        match self
            .global_cell()
            .create(ctx, &path, default.encode_to_vec().into())
            .await
        {
            Ok(_) => {
                info!(keyspace, "created default vschema");
                Ok(())
            }
            Err(err) if err.is_node_exists() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Read every shard of a keyspace, keyed by shard name. A keyspace
    /// with no shards directory yields an empty map.
    pub async fn find_all_shards_in_keyspace(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
    ) -> Result<HashMap<String, ShardInfo>, TopoError> {
        let shards = match self
            .global_cell()
            .list_dir(ctx, &shards_dir_path(keyspace))
            .await
        {
            Ok(names) => names,
            Err(err) if err.is_no_node() => return Ok(HashMap::new()),
            Err(err) => return Err(err),
        };
        let mut result = HashMap::with_capacity(shards.len());
        for shard in shards {
            let si = self.get_shard(ctx, keyspace, &shard).await?;
            result.insert(shard, si);
        }
        Ok(result)
    }
}
