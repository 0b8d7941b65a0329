//! Server assembly and keyspace-level tests.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use topo::config::TopoConfig;
use topo::memory::MemoryBackend;
use topo::{Conn, TopoError, TopoServer};

#[tokio::test]
async fn test_with_config_registers_cells() {
    let _ = tracing_subscriber::fmt().try_init();
    let ctx = CancellationToken::new();
    let config = TopoConfig::from_yaml(
        r#"
implementation: memory
cells:
  zone1:
    server_address: "zone1:2379"
  zone2:
    server_address: "zone2:2379"
"#,
    )
    .unwrap();

    let ts = TopoServer::with_config(&ctx, &config, |implementation, _addr, _root| {
        assert_eq!(implementation, "memory");
        Ok(Arc::new(MemoryBackend::new()) as Arc<dyn Conn>)
    })
    .await
    .unwrap();

    let mut names = ts.get_cell_info_names(&ctx).await.unwrap();
    names.sort();
    assert_eq!(names, vec!["zone1".to_string(), "zone2".to_string()]);

    let info = ts.get_cell_info(&ctx, "zone1").await.unwrap();
    assert_eq!(info.server_address, "zone1:2379");
    ts.conn_for_cell("zone1").unwrap();
    assert!(ts.conn_for_cell("zone9").is_err());
}

#[tokio::test]
async fn test_cell_roster_empty_without_cells() {
    let ts = TopoServer::new(Arc::new(MemoryBackend::new()));
    let ctx = CancellationToken::new();
    assert!(ts.get_cell_info_names(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keyspace_create_and_lookup() {
    let ts = TopoServer::new(Arc::new(MemoryBackend::new()));
    let ctx = CancellationToken::new();

    ts.create_keyspace(&ctx, "ks", &proto::Keyspace::default())
        .await
        .unwrap();
    let err = ts
        .create_keyspace(&ctx, "ks", &proto::Keyspace::default())
        .await
        .unwrap_err();
    assert!(err.is_node_exists(), "got: {err}");

    let info = ts.get_keyspace(&ctx, "ks").await.unwrap();
    assert_eq!(info.name(), "ks");

    assert_eq!(
        ts.get_keyspace_names(&ctx).await.unwrap(),
        vec!["ks".to_string()]
    );
}

#[tokio::test]
async fn test_ensure_vschema_is_idempotent() {
    let ts = TopoServer::new(Arc::new(MemoryBackend::new()));
    let ctx = CancellationToken::new();
    ts.ensure_vschema(&ctx, "ks").await.unwrap();
    ts.ensure_vschema(&ctx, "ks").await.unwrap();
}

#[tokio::test]
async fn test_find_all_shards_in_keyspace() {
    let ts = TopoServer::new(Arc::new(MemoryBackend::new()));
    let ctx = CancellationToken::new();

    assert!(ts
        .find_all_shards_in_keyspace(&ctx, "ks")
        .await
        .unwrap()
        .is_empty());

    ts.create_shard(&ctx, "ks", "-80").await.unwrap();
    ts.create_shard(&ctx, "ks", "80-").await.unwrap();
    let shards = ts.find_all_shards_in_keyspace(&ctx, "ks").await.unwrap();
    assert_eq!(shards.len(), 2);
    assert!(shards.contains_key("-80"));
    assert!(shards.contains_key("80-"));
}

#[tokio::test]
async fn test_keyspace_lock_is_exclusive() {
    let ts = TopoServer::new(Arc::new(MemoryBackend::new()));
    let ctx = CancellationToken::new();

    let lock = ts.lock_keyspace(&ctx, "ks", "first").await.unwrap();

    let contender_ctx = CancellationToken::new();
    let contender = {
        let ts = ts.clone();
        let contender_ctx = contender_ctx.clone();
        tokio::spawn(async move { ts.lock_keyspace(&contender_ctx, "ks", "second").await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    contender_ctx.cancel();
    let result = contender.await.unwrap();
    assert!(matches!(result, Err(TopoError::Interrupted(_))));

    lock.unlock().await.unwrap();
    let lock = ts.lock_keyspace(&ctx, "ks", "third").await.unwrap();
    lock.unlock().await.unwrap();
}
