//! In-flight render registry
//!
//! Every prepared render registers a cancellation flag under its [`TaskId`].
//! The entry is removed when the task's [`RegistryGuard`] drops, whichever
//! way the task ends.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Opaque render task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared cooperative cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Registry of in-flight renders
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, CancellationFlag>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task; the entry lives as long as the returned guard
    pub fn register(self: &Arc<Self>) -> RegistryGuard {
        let id = TaskId::new();
        let flag = CancellationFlag::new();
        self.tasks.lock().insert(id, flag.clone());
        debug!(task = %id, "Registered render task");

        RegistryGuard {
            registry: Arc::clone(self),
            id,
            flag,
        }
    }

    /// Request cancellation of one task
    pub fn cancel(&self, id: TaskId) -> bool {
        match self.tasks.lock().get(&id) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every registered task
    pub fn cancel_all(&self) -> usize {
        let tasks = self.tasks.lock();
        for flag in tasks.values() {
            flag.cancel();
        }
        tasks.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.lock().contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn active_ids(&self) -> Vec<TaskId> {
        self.tasks.lock().keys().copied().collect()
    }

    fn remove(&self, id: TaskId) {
        self.tasks.lock().remove(&id);
    }
}

/// Registry membership of one task
#[derive(Debug)]
pub struct RegistryGuard {
    registry: Arc<TaskRegistry>,
    id: TaskId,
    flag: CancellationFlag,
}

impl RegistryGuard {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn flag(&self) -> &CancellationFlag {
        &self.flag
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        debug!(task = %self.id, "Released render task");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_removes_entry() {
        let registry = Arc::new(TaskRegistry::new());
        let guard = registry.register();
        let id = guard.id();

        assert!(registry.contains(id));
        assert_eq!(registry.active_count(), 1);

        drop(guard);
        assert!(!registry.contains(id));
        assert!(!registry.cancel(id));
    }

    #[test]
    fn test_cancel_one() {
        let registry = Arc::new(TaskRegistry::new());
        let a = registry.register();
        let b = registry.register();

        assert!(registry.cancel(a.id()));
        assert!(a.flag().is_cancelled());
        assert!(!b.flag().is_cancelled());
    }

    #[test]
    fn test_cancel_all() {
        let registry = Arc::new(TaskRegistry::new());
        let guards: Vec<_> = (0..3).map(|_| registry.register()).collect();

        assert_eq!(registry.cancel_all(), 3);
        assert!(guards.iter().all(|g| g.flag().is_cancelled()));
    }
}
