//! Shard records and the shard mutation protocol
//!
//! A shard record carries the routing state for one range-partition of a
//! keyspace: its key range, its primary, and the tablet-control overrides
//! used during resharding cutovers. All modifications go through
//! [`TopoServer::update_shard_fields`], the optimistic read-modify-write
//! loop; direct writes would bypass the cross-field invariants enforced
//! here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use prost::Message;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use proto::{KeyRange, Shard, TabletAlias, TabletControl, TabletType, Time};

use crate::conn::Version;
use crate::errors::TopoError;
use crate::key::{key_ranges_intersect, parse_key_range_parts};
use crate::lock::KeyspaceLock;
use crate::{shard_file_path, TopoServer};

const DL_TABLES_ALREADY_PRESENT: &str =
    "one or more tables are already present in the denylist";
const DL_TABLES_NOT_PRESENT: &str =
    "cannot remove tables since one or more do not exist in the denylist";
const DL_NO_CELLS_FOR_PRIMARY: &str = "you cannot specify cells for a primary's tablet control";

/// Merge two cell lists, settling on empty if either list is empty. Empty
/// means "all cells", so it absorbs everything merged into it.
pub fn add_cells(left: &[String], right: &[String]) -> Vec<String> {
    if left.is_empty() || right.is_empty() {
        return Vec::new();
    }
    let mut merged = left.to_vec();
    for cell in right {
        if !in_cell_list(cell, &merged) {
            merged.push(cell.clone());
        }
    }
    merged
}

/// Whether `cell` is covered by `cells`. An empty list covers every cell.
pub fn in_cell_list(cell: &str, cells: &[String]) -> bool {
    cells.is_empty() || cells.iter().any(|c| c == cell)
}

/// Remove `to_remove` from `full_list`, keeping order.
pub fn remove_cells_from_list(to_remove: &[String], full_list: &[String]) -> Vec<String> {
    full_list
        .iter()
        .filter(|cell| !in_cell_list(cell, to_remove))
        .cloned()
        .collect()
}

/// Remove cells from a migration record. `cells` is what the record
/// currently names; an empty `cells` means the whole `full_list` had been
/// migrated, so the removal applies against that instead. The flag
/// reports that nothing is left and the record should be cleared.
pub fn remove_cells(
    cells: &[String],
    to_remove: &[String],
    full_list: &[String],
) -> (Vec<String>, bool) {
    let source: &[String] = if cells.is_empty() { full_list } else { cells };
    let leftover = remove_cells_from_list(to_remove, source);
    let emptied = leftover.is_empty();
    (leftover, emptied)
}

/// Whether the shard name implies range-based sharding.
pub fn is_shard_using_range_based_sharding(shard: &str) -> bool {
    shard.contains('-')
}

/// Sanitize a shard name and derive its key range. Range names are
/// `<hex-lo>-<hex-hi>` with empty sides meaning unbounded; validated
/// names are folded to lowercase.
pub fn validate_shard_name(shard: &str) -> Result<(String, Option<KeyRange>), TopoError> {
    if !is_shard_using_range_based_sharding(shard) {
        return Ok((shard.to_string(), None));
    }

    let parts: Vec<&str> = shard.split('-').collect();
    if parts.len() != 2 {
        return Err(TopoError::InvalidArgument(format!(
            "invalid shard name, can only contain one '-': {shard}"
        )));
    }
    let key_range = parse_key_range_parts(parts[0], parts[1])?;
    if !key_range.end.is_empty() && key_range.start >= key_range.end {
        return Err(TopoError::InvalidArgument(format!(
            "out of order keys: {} is not strictly smaller than {}",
            hex::encode(&key_range.start),
            hex::encode(&key_range.end),
        )));
    }
    Ok((shard.to_lowercase(), Some(key_range)))
}

/// A shard record paired with its key and the version of the last read.
/// This is the main way the rest of the system interacts with a shard.
#[derive(Debug, Clone)]
pub struct ShardInfo {
    keyspace: String,
    shard_name: String,
    version: Version,
    pub shard: Shard,
}

impl ShardInfo {
    /// Pair a shard record with its key and version. Meant for backend
    /// plumbing and tests; normal flows get these from
    /// [`TopoServer::get_shard`].
    pub fn new(keyspace: &str, shard_name: &str, shard: Shard, version: Version) -> Self {
        ShardInfo {
            keyspace: keyspace.to_string(),
            shard_name: shard_name.to_string(),
            version,
            shard,
        }
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn shard_name(&self) -> &str {
        &self.shard_name
    }

    /// Version from the last time this record was read or written.
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Whether the shard has an assigned primary tablet.
    pub fn has_primary(&self) -> bool {
        self.shard
            .primary_alias
            .as_ref()
            .is_some_and(|alias| !alias.cell.is_empty() || alias.uid != 0)
    }

    pub fn get_primary_term_start_time(&self) -> Option<DateTime<Utc>> {
        self.shard
            .primary_term_start_time
            .as_ref()
            .and_then(|t| DateTime::from_timestamp(t.seconds, t.nanoseconds as u32))
    }

    pub fn set_primary_term_start_time(&mut self, time: DateTime<Utc>) {
        self.shard.primary_term_start_time = Some(Time {
            seconds: time.timestamp(),
            nanoseconds: time.timestamp_subsec_nanos() as i32,
        });
    }

    /// The tablet control for the given tablet type, if any.
    pub fn get_tablet_control(&self, tablet_type: TabletType) -> Option<&TabletControl> {
        self.shard
            .tablet_controls
            .iter()
            .find(|tc| tc.tablet_type == tablet_type as i32)
    }

    /// Add or remove tables in the shard's tablet-control denylists.
    ///
    /// Only one table list is supported per shard and tablet type: adding
    /// a different list than the recorded one is an error. Must be called
    /// while holding the keyspace lock, which is taken as proof.
    pub fn update_source_denied_tables(
        &mut self,
        lock: &KeyspaceLock,
        tablet_type: TabletType,
        cells: &[String],
        remove: bool,
        tables: &[String],
    ) -> Result<(), TopoError> {
        lock.check(&self.keyspace)?;
        if tablet_type == TabletType::Primary && !cells.is_empty() {
            return Err(TopoError::InvalidArgument(DL_NO_CELLS_FOR_PRIMARY.into()));
        }

        let index = self
            .shard
            .tablet_controls
            .iter()
            .position(|tc| tc.tablet_type == tablet_type as i32);
        let Some(index) = index else {
            if remove {
                // Removing from something that doesn't exist: log, but
                // we're done.
                warn!(
                    keyspace = %self.keyspace,
                    shard = %self.shard_name,
                    %tablet_type,
                    "removing denied tables from a missing tablet control"
                );
                return Ok(());
            }
            self.shard.tablet_controls.push(TabletControl {
                tablet_type: tablet_type as i32,
                cells: cells.to_vec(),
                denied_tables: tables.to_vec(),
            });
            return Ok(());
        };

        if tablet_type == TabletType::Primary {
            return self.update_primary_tablet_control(index, remove, tables);
        }

        if remove {
            self.remove_cells_from_tablet_control(index, cells);
        } else {
            let tc = &mut self.shard.tablet_controls[index];
            if tc.denied_tables != tables {
                return Err(TopoError::InvalidArgument(format!(
                    "trying to use two different sets of denied tables for shard {}/{}: {:?} and {:?}",
                    self.keyspace, self.shard_name, tc.denied_tables, tables,
                )));
            }
            tc.cells = add_cells(&tc.cells, cells);
        }
        Ok(())
    }

    /// Primary denylists are cluster-global: adds must be disjoint from
    /// the recorded tables and removals must name only recorded tables.
    fn update_primary_tablet_control(
        &mut self,
        index: usize,
        remove: bool,
        tables: &[String],
    ) -> Result<(), TopoError> {
        let tc = &mut self.shard.tablet_controls[index];
        let new_tables: Vec<&String> = tables
            .iter()
            .filter(|table| !tc.denied_tables.contains(*table))
            .collect();
        if remove {
            if !new_tables.is_empty() {
                return Err(TopoError::InvalidArgument(DL_TABLES_NOT_PRESENT.into()));
            }
            if tables.is_empty() {
                // Legacy use: an empty removal clears the whole list.
                tc.denied_tables.clear();
            } else {
                tc.denied_tables.retain(|existing| !tables.contains(existing));
            }
            if tc.denied_tables.is_empty() {
                self.remove_tablet_type_from_tablet_control(TabletType::Primary);
            }
            return Ok(());
        }
        if new_tables.len() != tables.len() {
            return Err(TopoError::InvalidArgument(DL_TABLES_ALREADY_PRESENT.into()));
        }
        tc.denied_tables.extend(tables.iter().cloned());
        Ok(())
    }

    fn remove_tablet_type_from_tablet_control(&mut self, tablet_type: TabletType) {
        self.shard
            .tablet_controls
            .retain(|tc| tc.tablet_type != tablet_type as i32);
    }

    fn remove_cells_from_tablet_control(&mut self, index: usize, cells: &[String]) {
        let tc = &mut self.shard.tablet_controls[index];
        let result = remove_cells_from_list(cells, &tc.cells);
        if result.is_empty() {
            // No cell left; the record is vestigial.
            let tablet_type = tc.tablet_type();
            self.remove_tablet_type_from_tablet_control(tablet_type);
        } else {
            tc.cells = result;
        }
    }
}

impl TopoServer {
    /// Read one shard record.
    pub async fn get_shard(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<ShardInfo, TopoError> {
        let path = shard_file_path(keyspace, shard);
        let (data, version) = self.global_cell().get(ctx, &path).await?;
        let value = Shard::decode(data.as_ref()).map_err(|err| {
            TopoError::Internal(format!("bad shard data for {keyspace}/{shard}: {err}"))
        })?;
        Ok(ShardInfo::new(keyspace, shard, value, version))
    }

    /// Write a shard record back at its read version.
    async fn update_shard(
        &self,
        ctx: &CancellationToken,
        si: &mut ShardInfo,
    ) -> Result<(), TopoError> {
        let data = si.shard.encode_to_vec();
        let path = shard_file_path(si.keyspace(), si.shard_name());
        let new_version = self
            .global_cell()
            .update(ctx, &path, data.into(), Some(si.version()))
            .await?;
        si.set_version(new_version);
        Ok(())
    }

    /// Read a shard, apply `update` to it, and write it back. On a
    /// version conflict the record is re-read and the mutator re-run, so
    /// the mutator must be pure and idempotent. Returning
    /// [`TopoError::NoUpdateNeeded`] from the mutator skips the write and
    /// yields `Ok(None)`.
    pub async fn update_shard_fields<F>(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
        mut update: F,
    ) -> Result<Option<ShardInfo>, TopoError>
    where
        F: FnMut(&mut ShardInfo) -> Result<(), TopoError>,
    {
        loop {
            let mut si = self.get_shard(ctx, keyspace, shard).await?;
            match update(&mut si) {
                Ok(()) => {}
                Err(TopoError::NoUpdateNeeded) => return Ok(None),
                Err(err) => return Err(err),
            }
            match self.update_shard(ctx, &mut si).await {
                Ok(()) => return Ok(Some(si)),
                Err(err) if err.is_bad_version() => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Create a new shard. Locks the keyspace because sibling shards are
    /// inspected: the new shard starts with its primary out of the
    /// serving graph whenever a sibling has a null or overlapping key
    /// range, so resharding cutovers stay explicit.
    ///
    /// A `NodeExists` from the backend is propagated, not retried;
    /// [`get_or_create_shard`](Self::get_or_create_shard) is usually the
    /// better entry point.
    pub async fn create_shard(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<(), TopoError> {
        let lock = self.lock_keyspace(ctx, keyspace, "CreateShard").await?;
        let result = self.create_shard_locked(ctx, keyspace, shard).await;
        let unlocked = lock.unlock().await;
        result?;
        unlocked
    }

    async fn create_shard_locked(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<(), TopoError> {
        let (shard_name, key_range) = validate_shard_name(shard)?;

        let mut value = Shard {
            key_range: key_range.clone(),
            is_primary_serving: true,
            ..Default::default()
        };
        let siblings = self.find_all_shards_in_keyspace(ctx, keyspace).await?;
        for sibling in siblings.values() {
            let overlaps = match (&sibling.shard.key_range, &key_range) {
                (Some(existing), Some(new)) => key_ranges_intersect(existing, new),
                // A missing range on either side covers everything.
                _ => true,
            };
            if overlaps {
                value.is_primary_serving = false;
                break;
            }
        }

        let data = value.encode_to_vec();
        self.global_cell()
            .create(ctx, &shard_file_path(keyspace, &shard_name), data.into())
            .await?;
        info!(keyspace, shard = %shard_name, "created shard");
        Ok(())
    }

    /// Return the shard, creating the keyspace, its default vschema and
    /// the shard itself if any are missing. Safe under concurrent racers:
    /// every "already exists" along the way is ignored and the final read
    /// resolves ties.
    pub async fn get_or_create_shard(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<ShardInfo, TopoError> {
        let (shard, _) = validate_shard_name(shard)?;
        let shard = shard.as_str();
        match self.get_shard(ctx, keyspace, shard).await {
            Err(err) if err.is_no_node() => {}
            other => return other,
        }

        match self
            .create_keyspace(ctx, keyspace, &proto::Keyspace::default())
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_node_exists() => {}
            Err(err) => return Err(err),
        }
        self.ensure_vschema(ctx, keyspace).await?;
        match self.create_shard(ctx, keyspace, shard).await {
            Ok(()) => {}
            Err(err) if err.is_node_exists() => {}
            Err(err) => return Err(err),
        }

        // Read again: someone may have created it between our first read
        // and taking the keyspace lock.
        self.get_shard(ctx, keyspace, shard).await
    }

    /// Delete one shard record.
    pub async fn delete_shard(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<(), TopoError> {
        self.global_cell()
            .delete(ctx, &shard_file_path(keyspace, shard), None)
            .await?;
        info!(keyspace, shard, "deleted shard");
        Ok(())
    }

    /// All tablet aliases serving the shard, across every cell.
    /// See [`find_all_tablet_aliases_in_shard_by_cell`](Self::find_all_tablet_aliases_in_shard_by_cell).
    pub async fn find_all_tablet_aliases_in_shard(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<(Vec<TabletAlias>, Option<TopoError>), TopoError> {
        self.find_all_tablet_aliases_in_shard_by_cell(ctx, keyspace, shard, &[])
            .await
    }

    /// All tablet aliases serving the shard in the given cells (empty
    /// means every known cell), read from the per-cell replication
    /// graphs.
    ///
    /// Cells with no replication record are skipped. A cell that fails
    /// for any other reason does not cancel its peers: the result is the
    /// set that could be fetched, sorted by `(cell, uid)`, paired with a
    /// `PartialResult` error the caller must check.
    pub async fn find_all_tablet_aliases_in_shard_by_cell(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
        cells: &[String],
    ) -> Result<(Vec<TabletAlias>, Option<TopoError>), TopoError> {
        let cells = if cells.is_empty() {
            self.get_cell_info_names(ctx).await?
        } else {
            cells.to_vec()
        };

        let si = self.get_shard(ctx, keyspace, shard).await?;
        let mut found: HashMap<String, TabletAlias> = HashMap::new();
        if si.has_primary() {
            if let Some(primary) = si.shard.primary_alias.clone() {
                if in_cell_list(&primary.cell, &cells) {
                    found.insert(primary.to_display_string(), primary);
                }
            }
        }

        let mut tasks = JoinSet::new();
        for cell in cells {
            let ts = self.clone();
            let ctx = ctx.clone();
            let keyspace = keyspace.to_string();
            let shard = shard.to_string();
            tasks.spawn(async move {
                match ts.get_shard_replication(&ctx, &cell, &keyspace, &shard).await {
                    Ok(sri) => Ok(sri
                        .replication
                        .nodes
                        .into_iter()
                        .filter_map(|node| node.tablet_alias)
                        .collect::<Vec<_>>()),
                    // No replication graph for this shard in this cell.
                    Err(err) if err.is_no_node() => Ok(Vec::new()),
                    Err(err) => Err(TopoError::Internal(format!(
                        "GetShardReplication({cell}, {keyspace}, {shard}) failed: {err}"
                    ))),
                }
            });
        }

        let mut errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(aliases)) => {
                    for alias in aliases {
                        found.insert(alias.to_display_string(), alias);
                    }
                }
                Ok(Err(err)) => errors.push(err),
                Err(err) => errors.push(TopoError::Internal(format!(
                    "replication fan-out task failed: {err}"
                ))),
            }
        }

        let mut result: Vec<TabletAlias> = found.into_values().collect();
        result.sort();
        if errors.is_empty() {
            Ok((result, None))
        } else {
            warn!(
                keyspace,
                shard,
                errors = errors.len(),
                "tablet alias fan-out got a partial result"
            );
            Ok((result, Some(TopoError::PartialResult(shard.to_string()))))
        }
    }

    /// Watch one shard record. Returns the current decoded record plus a
    /// stream of decoded updates. The stream ends with a final error
    /// record (`Interrupted` on cancellation) and then closes;
    /// cancellation propagates to the underlying backend watch, which is
    /// drained before the stream closes.
    pub async fn watch_shard(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        shard: &str,
    ) -> Result<(Shard, mpsc::Receiver<Result<Shard, TopoError>>), TopoError> {
        let path = shard_file_path(keyspace, shard);
        let child = ctx.child_token();

        let (initial, mut upstream) = match self.global_cell().watch(&child, &path).await {
            Ok(watch) => watch,
            Err(err) => {
                child.cancel();
                return Err(err);
            }
        };
        let value = match Shard::decode(initial.contents.as_ref()) {
            Ok(value) => value,
            Err(err) => {
                child.cancel();
                while upstream.recv().await.is_some() {}
                return Err(TopoError::Internal(format!(
                    "error unpacking initial shard object: {err}"
                )));
            }
        };

        let (tx, rx) = mpsc::channel(10);
        tokio::spawn(async move {
            // Cancel the backend watch when this forwarder exits for any
            // reason.
            let _guard = child.clone().drop_guard();
            while let Some(data) = upstream.recv().await {
                match data {
                    Err(err) => {
                        // Last record, upstream closes right after.
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                    Ok(data) => match Shard::decode(data.contents.as_ref()) {
                        Ok(value) => {
                            if tx.send(Ok(value)).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            child.cancel();
                            while upstream.recv().await.is_some() {}
                            let _ = tx
                                .send(Err(TopoError::Internal(format!(
                                    "error unpacking shard object: {err}"
                                ))))
                                .await;
                            return;
                        }
                    },
                }
            }
        });

        Ok((value, rx))
    }
}
