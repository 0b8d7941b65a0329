//! Shard lifecycle tests against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use proto::{shard_replication::Node, TabletAlias, TabletType};
use topo::memory::MemoryBackend;
use topo::{TopoError, TopoServer};

fn new_server() -> TopoServer {
    let _ = tracing_subscriber::fmt().try_init();
    TopoServer::new(Arc::new(MemoryBackend::new()))
}

fn cells(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn tables(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_create_shard_clears_serving_on_overlap() {
    let ts = new_server();
    let ctx = CancellationToken::new();

    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    let si = ts.get_shard(&ctx, "ks", "-80").await.unwrap();
    assert!(si.shard.is_primary_serving);

    // 40-c0 overlaps -80, so its primary starts out of the serving graph.
    ts.create_shard(&ctx, "ks", "40-c0").await.unwrap();
    let si = ts.get_shard(&ctx, "ks", "40-c0").await.unwrap();
    assert!(!si.shard.is_primary_serving);

    // Creating the same shard again propagates the existence error.
    let err = ts.create_shard(&ctx, "ks", "-80").await.unwrap_err();
    assert!(err.is_node_exists(), "got: {err}");
}

#[tokio::test]
async fn test_create_shard_folds_name_case() {
    let ts = new_server();
    let ctx = CancellationToken::new();

    ts.create_shard(&ctx, "ks", "40-C0").await.unwrap();
    let si = ts.get_shard(&ctx, "ks", "40-c0").await.unwrap();
    assert_eq!(si.shard_name(), "40-c0");
    assert!(ts.get_shard(&ctx, "ks", "40-C0").await.unwrap_err().is_no_node());
}

#[tokio::test]
async fn test_get_or_create_shard_is_idempotent() {
    let ts = new_server();
    let ctx = CancellationToken::new();

    let first = ts.get_or_create_shard(&ctx, "ks", "0").await.unwrap();
    let second = ts.get_or_create_shard(&ctx, "ks", "0").await.unwrap();
    assert_eq!(first.version(), second.version());

    // The keyspace and its default vschema were created along the way.
    ts.get_keyspace(&ctx, "ks").await.unwrap();
    ts.ensure_vschema(&ctx, "ks").await.unwrap();
}

#[tokio::test]
async fn test_update_shard_fields_no_update_needed() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    let before = ts.get_shard(&ctx, "ks", "-80").await.unwrap();

    let result = ts
        .update_shard_fields(&ctx, "ks", "-80", |_si| Err(TopoError::NoUpdateNeeded))
        .await
        .unwrap();
    assert!(result.is_none());

    let after = ts.get_shard(&ctx, "ks", "-80").await.unwrap();
    assert_eq!(before.version(), after.version());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_update_shard_fields_linearizes_concurrent_mutators() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let ts = ts.clone();
        let ctx = ctx.clone();
        tasks.spawn(async move {
            let table = format!("t{i}");
            ts.update_shard_fields(&ctx, "ks", "-80", |si| {
                let control = si
                    .shard
                    .tablet_controls
                    .iter_mut()
                    .find(|tc| tc.tablet_type == TabletType::Replica as i32);
                match control {
                    Some(tc) => tc.denied_tables.push(table.clone()),
                    None => si.shard.tablet_controls.push(proto::TabletControl {
                        tablet_type: TabletType::Replica as i32,
                        cells: vec![],
                        denied_tables: vec![table.clone()],
                    }),
                }
                Ok(())
            })
            .await
            .unwrap();
        });
    }
    while tasks.join_next().await.is_some() {}

    // Every mutation survived: updates interleave at record granularity.
    let si = ts.get_shard(&ctx, "ks", "-80").await.unwrap();
    let control = si.get_tablet_control(TabletType::Replica).unwrap();
    let mut denied = control.denied_tables.clone();
    denied.sort();
    assert_eq!(denied, tables(&["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"]));
}

#[tokio::test]
async fn test_denied_tables_rejects_conflicting_table_set() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    let lock = ts.lock_keyspace(&ctx, "ks", "TestDenylist").await.unwrap();

    ts.update_shard_fields(&ctx, "ks", "-80", |si| {
        si.update_source_denied_tables(
            &lock,
            TabletType::Replica,
            &cells(&["zone1"]),
            false,
            &tables(&["t1", "t2"]),
        )
    })
    .await
    .unwrap();

    // Re-adding with a different table list is rejected.
    let err = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Replica,
                &cells(&["zone2"]),
                false,
                &tables(&["t1", "t3"]),
            )
        })
        .await
        .unwrap_err();
    assert!(
        err.to_string().contains("two different sets"),
        "got: {err}"
    );

    // Same table list merges the cells.
    let si = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Replica,
                &cells(&["zone2"]),
                false,
                &tables(&["t1", "t2"]),
            )
        })
        .await
        .unwrap()
        .unwrap();
    let control = si.get_tablet_control(TabletType::Replica).unwrap();
    assert_eq!(control.cells, cells(&["zone1", "zone2"]));

    lock.unlock().await.unwrap();
}

#[tokio::test]
async fn test_denied_tables_primary_rules() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    let lock = ts.lock_keyspace(&ctx, "ks", "TestDenylist").await.unwrap();

    // Cells are not allowed for a primary control.
    let err = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Primary,
                &cells(&["zone1"]),
                false,
                &tables(&["t1"]),
            )
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cannot specify cells"), "got: {err}");

    ts.update_shard_fields(&ctx, "ks", "-80", |si| {
        si.update_source_denied_tables(&lock, TabletType::Primary, &[], false, &tables(&["t1"]))
    })
    .await
    .unwrap();

    // Adding an overlapping set is rejected.
    let err = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Primary,
                &[],
                false,
                &tables(&["t1", "t2"]),
            )
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already present"), "got: {err}");

    // Removing a table that is not denied is rejected.
    let err = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(&lock, TabletType::Primary, &[], true, &tables(&["t9"]))
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("do not exist"), "got: {err}");

    // Removing the last table drops the whole primary control.
    let si = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(&lock, TabletType::Primary, &[], true, &tables(&["t1"]))
        })
        .await
        .unwrap()
        .unwrap();
    assert!(si.get_tablet_control(TabletType::Primary).is_none());

    // Removing from a missing control logs and succeeds.
    ts.update_shard_fields(&ctx, "ks", "-80", |si| {
        si.update_source_denied_tables(&lock, TabletType::Primary, &[], true, &tables(&["t1"]))
    })
    .await
    .unwrap();

    lock.unlock().await.unwrap();
}

#[tokio::test]
async fn test_denied_tables_cell_removal_drops_empty_control() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    let lock = ts.lock_keyspace(&ctx, "ks", "TestDenylist").await.unwrap();

    ts.update_shard_fields(&ctx, "ks", "-80", |si| {
        si.update_source_denied_tables(
            &lock,
            TabletType::Rdonly,
            &cells(&["zone1", "zone2"]),
            false,
            &tables(&["t1"]),
        )
    })
    .await
    .unwrap();

    let si = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Rdonly,
                &cells(&["zone1"]),
                true,
                &[],
            )
        })
        .await
        .unwrap()
        .unwrap();
    let control = si.get_tablet_control(TabletType::Rdonly).unwrap();
    assert_eq!(control.cells, cells(&["zone2"]));

    let si = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Rdonly,
                &cells(&["zone2"]),
                true,
                &[],
            )
        })
        .await
        .unwrap()
        .unwrap();
    assert!(si.get_tablet_control(TabletType::Rdonly).is_none());

    lock.unlock().await.unwrap();
}

#[tokio::test]
async fn test_denied_tables_requires_matching_lock() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    let lock = ts.lock_keyspace(&ctx, "other", "TestDenylist").await.unwrap();

    let err = ts
        .update_shard_fields(&ctx, "ks", "-80", |si| {
            si.update_source_denied_tables(
                &lock,
                TabletType::Replica,
                &[],
                false,
                &tables(&["t1"]),
            )
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not locked"), "got: {err}");
    lock.unlock().await.unwrap();
}

async fn add_cell_backend(ts: &TopoServer, ctx: &CancellationToken, cell: &str) -> MemoryBackend {
    let backend = MemoryBackend::new();
    ts.create_cell_info(
        ctx,
        cell,
        &proto::CellInfo {
            server_address: format!("{cell}:2379"),
            root: format!("/{cell}"),
        },
    )
    .await
    .unwrap();
    ts.add_cell(cell, Arc::new(backend.clone()));
    backend
}

async fn add_tablet(ts: &TopoServer, ctx: &CancellationToken, cell: &str, uid: u32) {
    ts.update_shard_replication_fields(ctx, cell, "ks", "-80", |sr| {
        sr.nodes.push(Node {
            tablet_alias: Some(TabletAlias {
                cell: cell.to_string(),
                uid,
            }),
        });
        Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_find_all_tablet_aliases_across_cells() {
    let ts = new_server();
    let ctx = CancellationToken::new();

    add_cell_backend(&ts, &ctx, "zone1").await;
    add_cell_backend(&ts, &ctx, "zone2").await;

    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    ts.update_shard_fields(&ctx, "ks", "-80", |si| {
        si.shard.primary_alias = Some(TabletAlias {
            cell: "zone1".to_string(),
            uid: 100,
        });
        Ok(())
    })
    .await
    .unwrap();

    add_tablet(&ts, &ctx, "zone1", 101).await;
    add_tablet(&ts, &ctx, "zone2", 200).await;

    let (aliases, partial) = ts
        .find_all_tablet_aliases_in_shard(&ctx, "ks", "-80")
        .await
        .unwrap();
    assert!(partial.is_none());
    // Primary (zone1-100) seeded the set; results are sorted by
    // (cell, uid).
    let flat: Vec<(String, u32)> = aliases
        .iter()
        .map(|a| (a.cell.clone(), a.uid))
        .collect();
    assert_eq!(
        flat,
        vec![
            ("zone1".to_string(), 100),
            ("zone1".to_string(), 101),
            ("zone2".to_string(), 200),
        ]
    );

    // Filtering by cell drops the others, including the primary.
    let (aliases, partial) = ts
        .find_all_tablet_aliases_in_shard_by_cell(&ctx, "ks", "-80", &cells(&["zone2"]))
        .await
        .unwrap();
    assert!(partial.is_none());
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].uid, 200);
}

#[tokio::test]
async fn test_find_all_tablet_aliases_partial_result() {
    let ts = new_server();
    let ctx = CancellationToken::new();

    add_cell_backend(&ts, &ctx, "zone1").await;
    let zone2 = add_cell_backend(&ts, &ctx, "zone2").await;
    // zone3 is in the roster but has no replication record: silently
    // skipped, not an error.
    add_cell_backend(&ts, &ctx, "zone3").await;

    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    add_tablet(&ts, &ctx, "zone1", 101).await;
    add_tablet(&ts, &ctx, "zone2", 200).await;

    zone2.set_unreachable(true);
    let (aliases, partial) = ts
        .find_all_tablet_aliases_in_shard(&ctx, "ks", "-80")
        .await
        .unwrap();
    let partial = partial.expect("expected a partial result");
    assert!(partial.is_partial_result(), "got: {partial}");
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].uid, 101);
}

#[tokio::test]
async fn test_watch_shard_sees_updates_and_drains_on_cancel() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();

    let watch_ctx = CancellationToken::new();
    let (initial, mut changes) = ts.watch_shard(&watch_ctx, "ks", "-80").await.unwrap();
    assert!(initial.is_primary_serving);

    ts.update_shard_fields(&ctx, "ks", "-80", |si| {
        si.shard.is_primary_serving = false;
        Ok(())
    })
    .await
    .unwrap();

    let updated = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!updated.is_primary_serving);

    // Cancelling the caller's context delivers a final interrupted
    // record, then the channel closes.
    watch_ctx.cancel();
    let last = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(last, Err(TopoError::Interrupted(_))), "got: {last:?}");
    assert!(changes.recv().await.is_none());
}

#[tokio::test]
async fn test_watch_missing_shard_fails() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    let err = ts.watch_shard(&ctx, "ks", "-80").await.err().unwrap();
    assert!(err.is_no_node(), "got: {err}");
}

#[tokio::test]
async fn test_delete_shard() {
    let ts = new_server();
    let ctx = CancellationToken::new();
    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    ts.delete_shard(&ctx, "ks", "-80").await.unwrap();
    assert!(ts.get_shard(&ctx, "ks", "-80").await.unwrap_err().is_no_node());
}
