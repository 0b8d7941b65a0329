//! Keyspace locking
//!
//! Multi-record operations on a keyspace (shard creation, denylist
//! edits during resharding) run under a lease taken on the keyspace path
//! in the global backend. The lease is carried as a [`KeyspaceLock`]
//! value; mutations that require it take the guard by reference and
//! verify it covers the keyspace they are about to touch.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::conn::LockDescriptor;
use crate::errors::TopoError;
use crate::{keyspace_path, TopoServer};

/// Proof of holding the lease on one keyspace.
pub struct KeyspaceLock {
    keyspace: String,
    descriptor: Option<Box<dyn LockDescriptor>>,
}

impl KeyspaceLock {
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    /// Release the lease. Dropping the guard also releases it, but going
    /// through `unlock` surfaces release errors.
    pub async fn unlock(mut self) -> Result<(), TopoError> {
        match self.descriptor.take() {
            Some(descriptor) => descriptor.unlock().await,
            None => Ok(()),
        }
    }

    /// Verify this lease covers `keyspace`.
    pub(crate) fn check(&self, keyspace: &str) -> Result<(), TopoError> {
        if self.keyspace != keyspace {
            return Err(TopoError::InvalidArgument(format!(
                "keyspace {keyspace} is not locked (lock held for {})",
                self.keyspace
            )));
        }
        Ok(())
    }
}

impl TopoServer {
    /// Take the lease on a keyspace. `action` describes the caller for
    /// diagnostics and ends up in the lock contents.
    pub async fn lock_keyspace(
        &self,
        ctx: &CancellationToken,
        keyspace: &str,
        action: &str,
    ) -> Result<KeyspaceLock, TopoError> {
        let descriptor = self
            .global_cell()
            .lock(ctx, &keyspace_path(keyspace), action)
            .await?;
        debug!(keyspace, action, "locked keyspace");
        Ok(KeyspaceLock {
            keyspace: keyspace.to_string(),
            descriptor: Some(descriptor),
        })
    }
}
