//! Document-store surface: ordered collections of JSON documents with
//! per-record CRUD, all-or-nothing batched writes, and live-query
//! subscriptions delivering full snapshots.

pub mod file;
pub mod memory;

pub use memory::MemoryStore;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TasksyncError;

/// Slash-joined path to an ordered collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collection layout of the board: categories per user, tasks nested under
/// their category.
pub mod paths {
    use super::CollectionPath;

    pub fn categories(user: &str) -> CollectionPath {
        CollectionPath::new(format!("users/{user}/categories"))
    }

    pub fn tasks(user: &str, category_id: &str) -> CollectionPath {
        CollectionPath::new(format!("users/{user}/categories/{category_id}/tasks"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// An ordered live query: a collection plus the field snapshots are sorted
/// by, ascending. Documents missing the field sort first; ties break by id.
#[derive(Debug, Clone)]
pub struct Query {
    pub path: CollectionPath,
    pub order_by: String,
}

impl Query {
    pub fn new(path: CollectionPath, order_by: impl Into<String>) -> Self {
        Self {
            path,
            order_by: order_by.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// Full ordered snapshot of the collection after a change.
    Snapshot(Vec<Document>),
    /// Transport-level failure. The listener stays registered; the store
    /// resumes snapshot delivery once the underlying condition clears.
    Error(TasksyncError),
}

/// Owned teardown closure for one registered listener. Runs exactly once,
/// on `release` or on drop.
pub struct ListenerGuard(Option<Box<dyn FnOnce() + Send>>);

impl ListenerGuard {
    pub fn new(unregister: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(unregister)))
    }

    pub fn release(mut self) {
        if let Some(unregister) = self.0.take() {
            unregister();
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(unregister) = self.0.take() {
            unregister();
        }
    }
}

/// A live listener over one collection. Dropping it cancels the listener.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<ListenerEvent>,
    _guard: ListenerGuard,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<ListenerEvent>, guard: ListenerGuard) -> Self {
        Self {
            events,
            _guard: guard,
        }
    }

    /// Next event, or `None` once the transport has gone away.
    pub async fn next_event(&mut self) -> Option<ListenerEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant used by synchronous tests.
    pub fn try_next_event(&mut self) -> Option<ListenerEvent> {
        self.events.try_recv().ok()
    }
}

/// The transport surface the live layer depends on.
pub trait LiveStore: Clone + Send + 'static {
    fn subscribe(&self, query: &Query) -> Subscription;
}

#[derive(Debug)]
pub(crate) enum BatchOp {
    Set {
        path: CollectionPath,
        id: String,
        data: Value,
    },
    Update {
        path: CollectionPath,
        id: String,
        fields: Value,
    },
    Delete {
        path: CollectionPath,
        id: String,
    },
}

/// Record mutations committed as one all-or-nothing unit. Listeners observe
/// either none of the batch or all of it, never an interleaving.
#[derive(Debug, Default)]
pub struct WriteBatch {
    pub(crate) ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: CollectionPath, id: impl Into<String>, data: Value) {
        self.ops.push(BatchOp::Set {
            path,
            id: id.into(),
            data,
        });
    }

    pub fn update(&mut self, path: CollectionPath, id: impl Into<String>, fields: Value) {
        self.ops.push(BatchOp::Update {
            path,
            id: id.into(),
            fields,
        });
    }

    pub fn delete(&mut self, path: CollectionPath, id: impl Into<String>) {
        self.ops.push(BatchOp::Delete {
            path,
            id: id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
