use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use sandbox::SandboxFactory;
use tracing::{debug, warn};
use uuid::Uuid;

/// A sandbox that exists on the backend on behalf of a running invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxEntry {
    pub invocation_id: Uuid,
    pub function_id: String,
    pub sandbox_name: String,
    pub created_at: DateTime<Utc>,
}

/// Live sandboxes keyed by invocation id. At most one entry per invocation.
#[derive(Clone, Default)]
pub(crate) struct SandboxTable {
    entries: Arc<Mutex<HashMap<Uuid, SandboxEntry>>>,
}

impl SandboxTable {
    // Critical sections never panic, so a poisoned lock still holds a
    // consistent map.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SandboxEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry previously registered for the same invocation.
    fn insert(&self, entry: SandboxEntry) -> Option<SandboxEntry> {
        self.lock().insert(entry.invocation_id, entry)
    }

    fn remove(&self, invocation_id: &Uuid) -> Option<SandboxEntry> {
        self.lock().remove(invocation_id)
    }

    /// Entries ordered by sandbox name.
    pub(crate) fn snapshot(&self) -> Vec<SandboxEntry> {
        let mut entries: Vec<_> = self.lock().values().cloned().collect();
        entries.sort_by(|a, b| a.sandbox_name.cmp(&b.sandbox_name));
        entries
    }

    /// Remove and return every entry.
    pub(crate) fn drain(&self) -> Vec<SandboxEntry> {
        self.lock().drain().map(|(_, entry)| entry).collect()
    }
}

/// Registration of one sandbox in the [`SandboxTable`].
///
/// `release()` is the normal path, called after the sandbox has been
/// destroyed. If the lease is dropped without it (a panic, an aborted
/// task) the entry is removed and a forced removal is scheduled on the
/// current runtime.
pub(crate) struct SandboxLease {
    table: SandboxTable,
    factory: Arc<dyn SandboxFactory>,
    invocation_id: Uuid,
    sandbox_name: String,
    released: bool,
}

impl SandboxLease {
    pub(crate) fn acquire(
        table: &SandboxTable,
        factory: Arc<dyn SandboxFactory>,
        entry: SandboxEntry,
    ) -> Self {
        let invocation_id = entry.invocation_id;
        let sandbox_name = entry.sandbox_name.clone();
        if let Some(previous) = table.insert(entry) {
            warn!(
                invocation_id = %invocation_id,
                previous = %previous.sandbox_name,
                "replaced live sandbox entry for the same invocation"
            );
        }
        Self {
            table: table.clone(),
            factory,
            invocation_id,
            sandbox_name,
            released: false,
        }
    }

    pub(crate) fn release(mut self) {
        self.table.remove(&self.invocation_id);
        self.released = true;
    }
}

impl Drop for SandboxLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Already drained by an engine shutdown, which removes it itself.
        if self.table.remove(&self.invocation_id).is_none() {
            return;
        }
        warn!(sandbox = %self.sandbox_name, "sandbox lease dropped without release, forcing removal");
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(sandbox = %self.sandbox_name, "no runtime available, sandbox left behind");
            return;
        };
        let factory = Arc::clone(&self.factory);
        let name = std::mem::take(&mut self.sandbox_name);
        runtime.spawn(async move {
            match factory.remove(&name).await {
                Ok(()) => debug!(sandbox = %name, "orphaned sandbox removed"),
                Err(e) => warn!(sandbox = %name, error = %e, "failed to remove orphaned sandbox"),
            }
        });
    }
}
