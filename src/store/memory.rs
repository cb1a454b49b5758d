use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::mpsc;
use ulid::Ulid;

use crate::error::TasksyncError;
use crate::store::{
    BatchOp, CollectionPath, Document, ListenerEvent, ListenerGuard, LiveStore, Query,
    Subscription, WriteBatch,
};

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

struct Watcher {
    id: u64,
    query: Query,
    tx: mpsc::UnboundedSender<ListenerEvent>,
}

#[derive(Default)]
struct Inner {
    collections: Collections,
    watchers: Vec<Watcher>,
    next_watcher: u64,
}

/// In-memory document store with live-query listeners. All mutations and
/// notifications happen under one lock, so a batch is observed either not
/// at all or in full.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_collections(collections: Collections) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                collections,
                ..Inner::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    /// Create a document with a fresh id and return it.
    pub fn create(&self, path: &CollectionPath, data: Value) -> Result<Document, TasksyncError> {
        if !data.is_object() {
            return Err(TasksyncError::validation("document data must be an object"));
        }
        let id = Ulid::new().to_string();
        let mut inner = self.lock();
        inner
            .collections
            .entry(path.as_str().to_string())
            .or_default()
            .insert(id.clone(), data.clone());
        notify_path(&mut inner, path.as_str());
        Ok(Document { id, data })
    }

    pub fn get(&self, path: &CollectionPath, id: &str) -> Result<Document, TasksyncError> {
        let inner = self.lock();
        inner
            .collections
            .get(path.as_str())
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
            .ok_or_else(|| TasksyncError::document_not_found(path.as_str(), id))
    }

    /// Merge `fields` into an existing document.
    pub fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        fields: Value,
    ) -> Result<(), TasksyncError> {
        let mut inner = self.lock();
        merge_into(&mut inner.collections, path.as_str(), id, fields)?;
        notify_path(&mut inner, path.as_str());
        Ok(())
    }

    pub fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), TasksyncError> {
        let mut inner = self.lock();
        let removed = inner
            .collections
            .get_mut(path.as_str())
            .and_then(|docs| docs.remove(id));
        if removed.is_none() {
            return Err(TasksyncError::document_not_found(path.as_str(), id));
        }
        notify_path(&mut inner, path.as_str());
        Ok(())
    }

    /// One-shot ordered read of a collection.
    pub fn list(&self, query: &Query) -> Vec<Document> {
        let inner = self.lock();
        snapshot(&inner.collections, query)
    }

    /// Commit a batch all-or-nothing. Ops are validated against a working
    /// copy in order, so a Set followed by an Update of the same record is
    /// legal; on any failure the store is untouched and nothing is
    /// delivered to listeners.
    pub fn commit(&self, batch: WriteBatch) -> Result<(), TasksyncError> {
        let mut inner = self.lock();
        let mut next = inner.collections.clone();
        let mut touched = BTreeSet::new();

        for op in &batch.ops {
            match op {
                BatchOp::Set { path, id, data } => {
                    if !data.is_object() {
                        return Err(TasksyncError::validation("document data must be an object"));
                    }
                    next.entry(path.as_str().to_string())
                        .or_default()
                        .insert(id.clone(), data.clone());
                    touched.insert(path.as_str().to_string());
                }
                BatchOp::Update { path, id, fields } => {
                    merge_into(&mut next, path.as_str(), id, fields.clone())?;
                    touched.insert(path.as_str().to_string());
                }
                BatchOp::Delete { path, id } => {
                    let removed = next.get_mut(path.as_str()).and_then(|docs| docs.remove(id));
                    if removed.is_none() {
                        return Err(TasksyncError::document_not_found(path.as_str(), id));
                    }
                    touched.insert(path.as_str().to_string());
                }
            }
        }

        inner.collections = next;
        for path in &touched {
            notify_path(&mut inner, path);
        }
        Ok(())
    }

    /// Swap in a full data set, notifying only the collections whose
    /// content actually changed. Used when the backing file is reloaded.
    pub fn replace_all(&self, collections: Collections) {
        let mut inner = self.lock();
        let mut changed = BTreeSet::new();
        for path in inner.collections.keys().chain(collections.keys()) {
            if inner.collections.get(path) != collections.get(path) {
                changed.insert(path.clone());
            }
        }
        inner.collections = collections;
        for path in &changed {
            notify_path(&mut inner, path);
        }
    }

    /// A copy of the full data set, for persistence.
    pub fn export(&self) -> Collections {
        self.lock().collections.clone()
    }

    /// Deliver a transport error to the current listeners of a collection.
    /// The listeners stay registered and resume snapshots on the next
    /// change to the collection.
    pub fn inject_error(&self, path: &CollectionPath, error: TasksyncError) {
        let mut inner = self.lock();
        inner.watchers.retain(|w| {
            if w.query.path.as_str() != path.as_str() {
                return true;
            }
            w.tx.send(ListenerEvent::Error(error.clone())).is_ok()
        });
    }

    pub fn listener_count(&self, path: &CollectionPath) -> usize {
        self.lock()
            .watchers
            .iter()
            .filter(|w| w.query.path.as_str() == path.as_str())
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.lock().watchers.len()
    }
}

impl LiveStore for MemoryStore {
    fn subscribe(&self, query: &Query) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_watcher;
        inner.next_watcher += 1;

        // Initial snapshot is delivered at registration time.
        let initial = snapshot(&inner.collections, query);
        let _ = tx.send(ListenerEvent::Snapshot(initial));

        inner.watchers.push(Watcher {
            id,
            query: query.clone(),
            tx,
        });
        drop(inner);

        let handle = Arc::clone(&self.inner);
        let guard = ListenerGuard::new(move || {
            if let Ok(mut inner) = handle.lock() {
                inner.watchers.retain(|w| w.id != id);
            }
        });
        Subscription::new(rx, guard)
    }
}

fn merge_into(
    collections: &mut Collections,
    path: &str,
    id: &str,
    fields: Value,
) -> Result<(), TasksyncError> {
    let incoming = match fields {
        Value::Object(map) => map,
        _ => return Err(TasksyncError::validation("update fields must be an object")),
    };
    let existing = collections
        .get_mut(path)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| TasksyncError::document_not_found(path, id))?;
    match existing {
        Value::Object(map) => {
            for (key, value) in incoming {
                map.insert(key, value);
            }
            Ok(())
        }
        _ => Err(TasksyncError::storage(format!(
            "document {id} in {path} is not an object"
        ))),
    }
}

fn notify_path(inner: &mut Inner, path: &str) {
    let snapshots: Vec<(usize, Vec<Document>)> = inner
        .watchers
        .iter()
        .enumerate()
        .filter(|(_, w)| w.query.path.as_str() == path)
        .map(|(i, w)| (i, snapshot(&inner.collections, &w.query)))
        .collect();
    let mut dead = Vec::new();
    for (i, docs) in snapshots {
        if inner.watchers[i].tx.send(ListenerEvent::Snapshot(docs)).is_err() {
            dead.push(inner.watchers[i].id);
        }
    }
    if !dead.is_empty() {
        inner.watchers.retain(|w| !dead.contains(&w.id));
    }
}

fn snapshot(collections: &Collections, query: &Query) -> Vec<Document> {
    let mut docs: Vec<Document> = collections
        .get(query.path.as_str())
        .map(|docs| {
            docs.iter()
                .map(|(id, data)| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    docs.sort_by(|a, b| {
        cmp_order_values(a.data.get(&query.order_by), b.data.get(&query.order_by))
            .then_with(|| a.id.cmp(&b.id))
    });
    docs
}

/// Ordering over JSON field values: missing/null first, then booleans,
/// numbers, strings; anything else compares by its serialized form.
fn cmp_order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)).then_with(|| match (a, b) {
            (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
            _ => Ordering::Equal,
        }),
    }
}
