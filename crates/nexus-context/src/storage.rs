//! Shared key-value storage with cross-context change events.
//!
//! Models `localStorage` plus the `storage` DOM event: all contexts of an
//! origin read and write the same map, and every mutation is announced to
//! every *other* context. The writer never hears its own change — that
//! suppression is what lets the coordinator broadcast activity without
//! guarding against an infinite local notify loop at this layer.
//!
//! Delivery is at-least-once and best-effort: a slow listener that lags
//! behind the broadcast channel drops the oldest events, which is safe
//! because every payload carries an absolute timestamp and consumers
//! always recompute from it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::StorageError;

/// Capacity of the change-event channel. Sized for bursts of activity
/// resets, not sustained throughput.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Opaque identifier for a browsing context (one simulated tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// A change notification delivered to sibling contexts.
///
/// `new_value` is `None` when the key was removed. Listeners that only
/// care about writes (activity, logout broadcasts) ignore removals.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    pub writer: ContextId,
}

struct StorageInner {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
    write_errors: AtomicBool,
}

/// The origin-wide storage area. One per simulated origin.
///
/// Cheap to clone; clones share the same map and event channel.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<StorageInner>,
}

impl SharedStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StorageInner {
                entries: Mutex::new(HashMap::new()),
                events,
                next_context: AtomicU64::new(1),
                write_errors: AtomicBool::new(false),
            }),
        }
    }

    /// Mints a handle for a new browsing context.
    ///
    /// Every tab gets exactly one handle; the session store, the
    /// broadcaster, and the event subscription of that tab must all share
    /// it (or clones of it) so self-suppression works.
    pub fn context(&self) -> StorageHandle {
        let id = ContextId(
            self.inner.next_context.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(context = %id, "storage context created");
        StorageHandle {
            context: id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Failure injection: when enabled, every `set`/`remove` fails with
    /// [`StorageError::WriteFailed`]. Simulates quota-exceeded/disabled
    /// storage for degraded-mode tests.
    pub fn set_write_errors(&self, enabled: bool) {
        self.inner.write_errors.store(enabled, Ordering::SeqCst);
    }
}

impl Default for SharedStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// One context's view of the shared storage area.
///
/// Clones keep the same [`ContextId`].
#[derive(Clone)]
pub struct StorageHandle {
    context: ContextId,
    inner: Arc<StorageInner>,
}

impl StorageHandle {
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// Writes a key and notifies sibling contexts.
    pub fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        if self.inner.write_errors.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(key.to_string()));
        }
        self.inner
            .entries
            .lock()
            .expect("storage map poisoned")
            .insert(key.to_string(), value.to_string());
        // No receivers is fine — nobody else is listening yet.
        let _ = self.inner.events.send(StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            writer: self.context,
        });
        Ok(())
    }

    /// Reads a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner
            .entries
            .lock()
            .expect("storage map poisoned")
            .get(key)
            .cloned()
    }

    /// Removes a key and notifies sibling contexts with a `None` value.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.inner.write_errors.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(key.to_string()));
        }
        let removed = self
            .inner
            .entries
            .lock()
            .expect("storage map poisoned")
            .remove(key)
            .is_some();
        if removed {
            let _ = self.inner.events.send(StorageEvent {
                key: key.to_string(),
                new_value: None,
                writer: self.context,
            });
        }
        Ok(())
    }

    /// Subscribes to change events from *other* contexts.
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            context: self.context,
            rx: self.inner.events.subscribe(),
        }
    }
}

/// A stream of storage changes made by sibling contexts.
pub struct StorageEvents {
    context: ContextId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageEvents {
    /// Waits for the next event from another context.
    ///
    /// Returns `None` when the storage area itself has been dropped.
    /// Events written by this subscriber's own context are skipped, and a
    /// lagged receiver silently resumes from the oldest retained event.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.writer == self.context => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        context = %self.context,
                        skipped,
                        "storage listener lagged, dropping old events"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
