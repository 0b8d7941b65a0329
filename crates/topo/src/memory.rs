//! In-memory backend
//!
//! A process-local [`Conn`] implementation used by tests and local
//! development. Nodes live in a flat versioned map; watches fan out
//! through per-path sender lists; locks are per-path async mutexes, so
//! waiters queue the way they would on a real lease.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::conn::{Conn, LockDescriptor, Version, WatchData, WatchReceiver};
use crate::errors::TopoError;

type WatchSender = mpsc::UnboundedSender<Result<WatchData, TopoError>>;

struct MemoryNode {
    contents: Bytes,
    version: u64,
}

#[derive(Default)]
struct MemoryState {
    nodes: HashMap<String, MemoryNode>,
    watchers: HashMap<String, Vec<(u64, WatchSender)>>,
    locks: HashMap<String, Arc<tokio::sync::Mutex<()>>>,
    next_version: u64,
    next_watcher_id: u64,
}

impl MemoryState {
    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn notify(&mut self, path: &str, record: Result<WatchData, TopoError>) {
        let terminal = record.is_err();
        if let Some(watchers) = self.watchers.get_mut(path) {
            for (_, sender) in watchers.iter() {
                let _ = sender.send(record.clone());
            }
            if terminal {
                // Error records are final; dropping the senders closes
                // every stream.
                self.watchers.remove(path);
            }
        }
    }
}

/// In-memory topology backend.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, simulating a partitioned-off
    /// backend. Used to exercise partial-result paths.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self, path: &str) -> Result<(), TopoError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TopoError::Internal(format!(
                "backend unreachable: {path}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Conn for MemoryBackend {
    async fn get(
        &self,
        _ctx: &CancellationToken,
        path: &str,
    ) -> Result<(Bytes, Version), TopoError> {
        self.check_reachable(path)?;
        let state = self.state.lock();
        match state.nodes.get(path) {
            Some(node) => Ok((node.contents.clone(), Version(node.version))),
            None => Err(TopoError::NoNode(path.to_string())),
        }
    }

    async fn create(
        &self,
        _ctx: &CancellationToken,
        path: &str,
        contents: Bytes,
    ) -> Result<Version, TopoError> {
        self.check_reachable(path)?;
        let mut state = self.state.lock();
        if state.nodes.contains_key(path) {
            return Err(TopoError::NodeExists(path.to_string()));
        }
        let version = state.bump_version();
        state.nodes.insert(
            path.to_string(),
            MemoryNode {
                contents,
                version,
            },
        );
        Ok(Version(version))
    }

    async fn update(
        &self,
        _ctx: &CancellationToken,
        path: &str,
        contents: Bytes,
        expected: Option<&Version>,
    ) -> Result<Version, TopoError> {
        self.check_reachable(path)?;
        let mut state = self.state.lock();
        match (state.nodes.get(path), expected) {
            (Some(node), Some(expected)) if node.version != expected.0 => {
                return Err(TopoError::BadVersion(format!(
                    "{path}: expected {} got {}",
                    expected.0, node.version
                )));
            }
            (None, Some(_)) => return Err(TopoError::NoNode(path.to_string())),
            _ => {}
        }
        let version = state.bump_version();
        state.nodes.insert(
            path.to_string(),
            MemoryNode {
                contents: contents.clone(),
                version,
            },
        );
        state.notify(
            path,
            Ok(WatchData {
                contents,
                version: Version(version),
            }),
        );
        Ok(Version(version))
    }

    async fn delete(
        &self,
        _ctx: &CancellationToken,
        path: &str,
        expected: Option<&Version>,
    ) -> Result<(), TopoError> {
        self.check_reachable(path)?;
        let mut state = self.state.lock();
        let Some(node) = state.nodes.get(path) else {
            return Err(TopoError::NoNode(path.to_string()));
        };
        if let Some(expected) = expected {
            if node.version != expected.0 {
                return Err(TopoError::BadVersion(format!(
                    "{path}: expected {} got {}",
                    expected.0, node.version
                )));
            }
        }
        state.nodes.remove(path);
        state.notify(path, Err(TopoError::NoNode(path.to_string())));
        Ok(())
    }

    async fn list_dir(
        &self,
        _ctx: &CancellationToken,
        path: &str,
    ) -> Result<Vec<String>, TopoError> {
        self.check_reachable(path)?;
        let state = self.state.lock();
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}/")
        };
        let mut children: Vec<String> = state
            .nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| match rest.split_once('/') {
                Some((first, _)) => first.to_string(),
                None => rest.to_string(),
            })
            .collect();
        children.sort();
        children.dedup();
        if children.is_empty() {
            return Err(TopoError::NoNode(path.to_string()));
        }
        Ok(children)
    }

    async fn watch(
        &self,
        ctx: &CancellationToken,
        path: &str,
    ) -> Result<(WatchData, WatchReceiver), TopoError> {
        self.check_reachable(path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        // Snapshot and registration happen under one lock so no update
        // can slip between the initial read and the watch.
        let (initial, watcher_id) = {
            let mut state = self.state.lock();
            let Some(node) = state.nodes.get(path) else {
                return Err(TopoError::NoNode(path.to_string()));
            };
            let initial = WatchData {
                contents: node.contents.clone(),
                version: Version(node.version),
            };
            state.next_watcher_id += 1;
            let watcher_id = state.next_watcher_id;
            state
                .watchers
                .entry(path.to_string())
                .or_default()
                .push((watcher_id, tx));
            (initial, watcher_id)
        };

        // On cancellation, deliver a final Interrupted record and close
        // the stream.
        let state = Arc::clone(&self.state);
        let ctx = ctx.clone();
        let path = path.to_string();
        tokio::spawn(async move {
            ctx.cancelled().await;
            let mut state = state.lock();
            if let Some(watchers) = state.watchers.get_mut(&path) {
                if let Some(index) = watchers.iter().position(|(id, _)| *id == watcher_id) {
                    let (_, sender) = watchers.swap_remove(index);
                    let _ = sender.send(Err(TopoError::Interrupted(path.clone())));
                }
                if watchers.is_empty() {
                    state.watchers.remove(&path);
                }
            }
        });

        Ok((initial, rx))
    }

    async fn lock(
        &self,
        ctx: &CancellationToken,
        path: &str,
        _contents: &str,
    ) -> Result<Box<dyn LockDescriptor>, TopoError> {
        self.check_reachable(path)?;
        let mutex = {
            let mut state = self.state.lock();
            Arc::clone(
                state
                    .locks
                    .entry(path.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let guard = tokio::select! {
            guard = mutex.lock_owned() => guard,
            _ = ctx.cancelled() => return Err(TopoError::Interrupted(path.to_string())),
        };
        Ok(Box::new(MemoryLockDescriptor {
            _guard: guard,
        }))
    }
}

struct MemoryLockDescriptor {
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

#[async_trait]
impl LockDescriptor for MemoryLockDescriptor {
    async fn unlock(self: Box<Self>) -> Result<(), TopoError> {
        // Dropping the guard releases the lease.
        Ok(())
    }
}
