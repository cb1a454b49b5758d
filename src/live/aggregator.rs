use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::TasksyncError;
use crate::models::{Category, CategoryView, Task};
use crate::store::{Document, ListenerEvent, LiveStore, Query};

/// How long the first emission waits for the task snapshots of a freshly
/// discovered category set before going out with whatever has arrived.
pub const INITIAL_LOAD_GRACE: Duration = Duration::from_millis(100);

/// Running subscription over the merged board. Tearing it down stops the
/// category listener, every per-category task listener, and any pending
/// grace timer; no update callback runs after `unsubscribe` returns.
pub struct AggregatorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AggregatorHandle {
    /// Idempotent: safe to call any number of times.
    pub fn unsubscribe(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl Drop for AggregatorHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Subscribe to the merged live board.
///
/// `parent_query` identifies the category collection (ordered by
/// position); `child_query` maps a category id to the live query for its
/// tasks (ordered by creation time). `on_update` receives a fresh,
/// fully-sorted copy of the board every time either level changes;
/// `on_error` receives transport-level listener failures, which never
/// clear previously delivered state.
///
/// Must be called from within a tokio runtime.
pub fn subscribe<S, F, U, E>(
    store: S,
    parent_query: Query,
    child_query: F,
    on_update: U,
    on_error: E,
) -> AggregatorHandle
where
    S: LiveStore,
    F: Fn(&str) -> Query + Send + 'static,
    U: FnMut(Vec<CategoryView>) + Send + 'static,
    E: FnMut(TasksyncError) + Send + 'static,
{
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        run(store, parent_query, child_query, on_update, on_error, task_cancel).await;
    });
    AggregatorHandle { cancel, task }
}

/// One category's slot in the working state. The task list is whatever the
/// latest task snapshot for this category materialized to.
struct CategoryEntry {
    category: Category,
    tasks: Vec<Task>,
}

/// An owned task listener for one category: a forwarder task that funnels
/// its subscription events into the aggregator's merge channel. Dropping
/// it aborts the forwarder, which cancels the underlying listener.
struct ChildListener {
    forwarder: JoinHandle<()>,
}

impl Drop for ChildListener {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

enum InitialLoad {
    /// No category snapshot seen yet.
    Waiting,
    /// First category snapshot seen; ids whose first task snapshot is
    /// still outstanding.
    Pending(HashSet<String>),
    Done,
}

async fn run<S, F, U, E>(
    store: S,
    parent_query: Query,
    child_query: F,
    mut on_update: U,
    mut on_error: E,
    cancel: CancellationToken,
) where
    S: LiveStore,
    F: Fn(&str) -> Query + Send + 'static,
    U: FnMut(Vec<CategoryView>) + Send + 'static,
    E: FnMut(TasksyncError) + Send + 'static,
{
    let mut parent_sub = store.subscribe(&parent_query);
    let (child_tx, mut child_rx) = mpsc::unbounded_channel::<(String, ListenerEvent)>();
    let mut listeners: HashMap<String, ChildListener> = HashMap::new();
    let mut entries: HashMap<String, CategoryEntry> = HashMap::new();
    let mut initial = InitialLoad::Waiting;

    let grace = time::sleep(INITIAL_LOAD_GRACE);
    tokio::pin!(grace);
    let mut grace_armed = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            () = grace.as_mut(), if grace_armed => {
                grace_armed = false;
                initial = InitialLoad::Done;
                on_update(build_snapshot(&entries));
            }

            event = parent_sub.next_event() => {
                let Some(event) = event else { break };
                match event {
                    ListenerEvent::Error(err) => on_error(err),
                    ListenerEvent::Snapshot(docs) => {
                        reconcile(
                            &store,
                            &child_query,
                            &child_tx,
                            &mut listeners,
                            &mut entries,
                            &mut initial,
                            &docs,
                        );
                        match &mut initial {
                            InitialLoad::Waiting => {
                                if entries.is_empty() {
                                    initial = InitialLoad::Done;
                                    on_update(Vec::new());
                                } else {
                                    initial =
                                        InitialLoad::Pending(entries.keys().cloned().collect());
                                    grace.as_mut().reset(Instant::now() + INITIAL_LOAD_GRACE);
                                    grace_armed = true;
                                }
                            }
                            InitialLoad::Pending(pending) => {
                                // The set may have emptied: either every
                                // remaining category has delivered, or the
                                // board itself emptied out.
                                if pending.is_empty() || entries.is_empty() {
                                    initial = InitialLoad::Done;
                                    grace_armed = false;
                                    on_update(build_snapshot(&entries));
                                }
                            }
                            InitialLoad::Done => on_update(build_snapshot(&entries)),
                        }
                    }
                }
            }

            Some((category_id, event)) = child_rx.recv() => {
                match event {
                    ListenerEvent::Error(err) => on_error(err),
                    ListenerEvent::Snapshot(docs) => {
                        // A task event for a category that has since left
                        // the board is stale; discard it.
                        let Some(entry) = entries.get_mut(&category_id) else {
                            continue;
                        };
                        entry.tasks = decode_tasks(&docs);
                        match &mut initial {
                            InitialLoad::Pending(pending) => {
                                pending.remove(&category_id);
                                if pending.is_empty() {
                                    initial = InitialLoad::Done;
                                    grace_armed = false;
                                    on_update(build_snapshot(&entries));
                                }
                            }
                            InitialLoad::Done => on_update(build_snapshot(&entries)),
                            InitialLoad::Waiting => {}
                        }
                    }
                }
            }
        }
    }
}

/// Bring the set of task listeners in line with the categories present in
/// the snapshot: open listeners for new categories, close them for
/// removed ones. Listeners of surviving categories are left untouched so
/// no in-flight task updates are dropped.
fn reconcile<S, F>(
    store: &S,
    child_query: &F,
    child_tx: &mpsc::UnboundedSender<(String, ListenerEvent)>,
    listeners: &mut HashMap<String, ChildListener>,
    entries: &mut HashMap<String, CategoryEntry>,
    initial: &mut InitialLoad,
    docs: &[Document],
) where
    S: LiveStore,
    F: Fn(&str) -> Query + Send + 'static,
{
    let mut seen = HashSet::with_capacity(docs.len());
    for doc in docs {
        let category = match Category::from_document(doc) {
            Ok(category) => category,
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping undecodable category");
                continue;
            }
        };
        seen.insert(doc.id.clone());
        match entries.entry(doc.id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().category = category,
            Entry::Vacant(slot) => {
                slot.insert(CategoryEntry {
                    category,
                    tasks: Vec::new(),
                });
            }
        }
        if !listeners.contains_key(&doc.id) {
            listeners.insert(
                doc.id.clone(),
                spawn_child(store, child_query(&doc.id), doc.id.clone(), child_tx.clone()),
            );
            if let InitialLoad::Pending(pending) = initial {
                pending.insert(doc.id.clone());
            }
        }
    }

    entries.retain(|id, _| seen.contains(id));
    listeners.retain(|id, _| seen.contains(id));
    if let InitialLoad::Pending(pending) = initial {
        pending.retain(|id| seen.contains(id));
    }
}

fn spawn_child<S: LiveStore>(
    store: &S,
    query: Query,
    category_id: String,
    tx: mpsc::UnboundedSender<(String, ListenerEvent)>,
) -> ChildListener {
    let store = store.clone();
    let forwarder = tokio::spawn(async move {
        let mut sub = store.subscribe(&query);
        while let Some(event) = sub.next_event().await {
            if tx.send((category_id.clone(), event)).is_err() {
                break;
            }
        }
    });
    ChildListener { forwarder }
}

fn decode_tasks(docs: &[Document]) -> Vec<Task> {
    docs.iter()
        .filter_map(|doc| match Task::from_document(doc) {
            Ok(task) => Some(task),
            Err(err) => {
                tracing::warn!(id = %doc.id, error = %err, "skipping undecodable task");
                None
            }
        })
        .collect()
}

/// A deep, fully re-sorted copy of the working state. Consumers never see
/// the aggregator's own storage.
fn build_snapshot(entries: &HashMap<String, CategoryEntry>) -> Vec<CategoryView> {
    let mut views: Vec<CategoryView> = entries
        .values()
        .map(|entry| CategoryView {
            category: entry.category.clone(),
            tasks: entry.tasks.clone(),
        })
        .collect();
    views.sort_by(|a, b| {
        a.category
            .position
            .cmp(&b.category.position)
            .then_with(|| a.category.id.cmp(&b.category.id))
    });
    for view in &mut views {
        view.tasks
            .sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::error::ErrorCode;
    use crate::store::{CollectionPath, ListenerGuard, MemoryStore, Subscription, WriteBatch};

    // ─── scripted transport ────────────────────────────────────────

    /// A transport whose snapshots are fed by hand, so tests control
    /// delivery order and timing exactly.
    #[derive(Clone, Default)]
    struct ScriptedStore {
        inner: Arc<Mutex<ScriptedInner>>,
    }

    #[derive(Default)]
    struct ScriptedInner {
        senders: Vec<(u64, String, mpsc::UnboundedSender<ListenerEvent>)>,
        subscribe_counts: HashMap<String, usize>,
        next: u64,
    }

    impl LiveStore for ScriptedStore {
        fn subscribe(&self, query: &Query) -> Subscription {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next;
            inner.next += 1;
            let path = query.path.as_str().to_string();
            *inner.subscribe_counts.entry(path.clone()).or_default() += 1;
            inner.senders.push((id, path, tx));
            let handle = Arc::clone(&self.inner);
            Subscription::new(
                rx,
                ListenerGuard::new(move || {
                    handle.lock().unwrap().senders.retain(|(sid, _, _)| *sid != id);
                }),
            )
        }
    }

    impl ScriptedStore {
        fn send_snapshot(&self, path: &str, docs: Vec<Document>) {
            let inner = self.inner.lock().unwrap();
            for (_, p, tx) in inner.senders.iter().filter(|(_, p, _)| p == path) {
                let _ = tx.send(ListenerEvent::Snapshot(docs.clone()));
            }
        }

        fn send_error(&self, path: &str, err: TasksyncError) {
            let inner = self.inner.lock().unwrap();
            for (_, p, tx) in inner.senders.iter().filter(|(_, p, _)| p == path) {
                let _ = tx.send(ListenerEvent::Error(err.clone()));
            }
        }

        fn active_paths(&self) -> BTreeSet<String> {
            self.inner
                .lock()
                .unwrap()
                .senders
                .iter()
                .map(|(_, p, _)| p.clone())
                .collect()
        }

        fn subscribe_count(&self, path: &str) -> usize {
            self.inner
                .lock()
                .unwrap()
                .subscribe_counts
                .get(path)
                .copied()
                .unwrap_or(0)
        }
    }

    // ─── helpers ───────────────────────────────────────────────────

    fn parent_query() -> Query {
        Query::new(CollectionPath::new("categories"), "position")
    }

    fn child_query(category_id: &str) -> Query {
        Query::new(
            CollectionPath::new(format!("categories/{category_id}/tasks")),
            "createdAt",
        )
    }

    fn cat_doc(id: &str, title: &str, position: i64) -> Document {
        Document {
            id: id.into(),
            data: json!({ "title": title, "position": position }),
        }
    }

    fn task_doc(id: &str, name: &str, created_at: &str) -> Document {
        Document {
            id: id.into(),
            data: json!({
                "name": name,
                "status": "not-started",
                "completed": false,
                "createdAt": created_at
            }),
        }
    }

    type Emissions = Arc<Mutex<Vec<Vec<CategoryView>>>>;

    fn collector() -> (Emissions, impl FnMut(Vec<CategoryView>) + Send + 'static) {
        let emissions: Emissions = Arc::default();
        let sink = Arc::clone(&emissions);
        (emissions, move |board| sink.lock().unwrap().push(board))
    }

    type Errors = Arc<Mutex<Vec<TasksyncError>>>;

    fn error_collector() -> (Errors, impl FnMut(TasksyncError) + Send + 'static) {
        let errors: Errors = Arc::default();
        let sink = Arc::clone(&errors);
        (errors, move |err| sink.lock().unwrap().push(err))
    }

    /// Let spawned listeners and forwarders run without advancing time.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn titles(board: &[CategoryView]) -> Vec<String> {
        board.iter().map(|v| v.category.title.clone()).collect()
    }

    fn task_names(board: &[CategoryView], category_id: &str) -> Vec<String> {
        board
            .iter()
            .find(|v| v.category.id == category_id)
            .map(|v| v.tasks.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    }

    // ─── tests ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_empty_board_emits_immediately() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot("categories", vec![]);
        settle().await;

        let got = emissions.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert!(got[0].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_load_emits_once_when_all_children_arrive() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot(
            "categories",
            vec![cat_doc("a", "Project Setup", 0), cat_doc("b", "Deployment", 1)],
        );
        settle().await;
        assert!(emissions.lock().unwrap().is_empty());

        store.send_snapshot(
            "categories/a/tasks",
            vec![task_doc("t1", "Define Objectives", "2024-07-01T00:00:00+00:00")],
        );
        settle().await;
        assert!(emissions.lock().unwrap().is_empty());

        store.send_snapshot("categories/b/tasks", vec![]);
        settle().await;
        {
            let got = emissions.lock().unwrap();
            assert_eq!(got.len(), 1);
            assert_eq!(titles(&got[0]), ["Project Setup", "Deployment"]);
            assert_eq!(task_names(&got[0], "a"), ["Define Objectives"]);
            assert!(task_names(&got[0], "b").is_empty());
        }

        // The grace timer is disarmed; letting it lapse adds nothing.
        time::sleep(INITIAL_LOAD_GRACE * 2).await;
        assert_eq!(emissions.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_load_grace_period_expires() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot(
            "categories",
            vec![cat_doc("a", "Project Setup", 0), cat_doc("b", "Deployment", 1)],
        );
        settle().await;

        // One category delivers quickly, the other never does.
        time::sleep(Duration::from_millis(5)).await;
        store.send_snapshot(
            "categories/a/tasks",
            vec![task_doc("t1", "Define Objectives", "2024-07-01T00:00:00+00:00")],
        );
        settle().await;
        assert!(emissions.lock().unwrap().is_empty());

        time::sleep(INITIAL_LOAD_GRACE * 2).await;
        let got = emissions.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(titles(&got[0]), ["Project Setup", "Deployment"]);
        assert_eq!(task_names(&got[0], "a"), ["Define Objectives"]);
        assert!(task_names(&got[0], "b").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_listeners_follow_parent_set() {
        let store = ScriptedStore::default();
        let (_, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot(
            "categories",
            vec![cat_doc("a", "A", 0), cat_doc("b", "B", 1)],
        );
        settle().await;
        assert_eq!(
            store.active_paths(),
            ["categories", "categories/a/tasks", "categories/b/tasks"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );

        store.send_snapshot(
            "categories",
            vec![cat_doc("b", "B", 0), cat_doc("c", "C", 1)],
        );
        settle().await;
        assert_eq!(
            store.active_paths(),
            ["categories", "categories/b/tasks", "categories/c/tasks"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        );
        // The surviving category's listener was reused, not reopened.
        assert_eq!(store.subscribe_count("categories/b/tasks"), 1);
        assert_eq!(store.subscribe_count("categories/a/tasks"), 1);
        assert_eq!(store.subscribe_count("categories/c/tasks"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reorder_changes_emitted_order() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot(
            "categories",
            vec![cat_doc("a", "A", 0), cat_doc("b", "B", 1), cat_doc("c", "C", 2)],
        );
        settle().await;
        for id in ["a", "b", "c"] {
            store.send_snapshot(&format!("categories/{id}/tasks"), vec![]);
        }
        settle().await;
        assert_eq!(titles(&emissions.lock().unwrap()[0]), ["A", "B", "C"]);

        // Reorder to [c, a, b]: the batch re-assigns dense positions.
        store.send_snapshot(
            "categories",
            vec![cat_doc("c", "C", 0), cat_doc("a", "A", 1), cat_doc("b", "B", 2)],
        );
        settle().await;
        let got = emissions.lock().unwrap();
        assert_eq!(titles(got.last().unwrap()), ["C", "A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_order_is_by_creation_time_not_delivery_order() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot("categories", vec![cat_doc("a", "A", 0)]);
        settle().await;
        // Later-created task delivered first within the snapshot.
        store.send_snapshot(
            "categories/a/tasks",
            vec![
                task_doc("t2", "Second", "2024-07-02T00:00:00+00:00"),
                task_doc("t1", "First", "2024-07-01T00:00:00+00:00"),
            ],
        );
        settle().await;

        let got = emissions.lock().unwrap();
        assert_eq!(task_names(got.last().unwrap(), "a"), ["First", "Second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_category_disappears_and_late_events_are_discarded() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot(
            "categories",
            vec![cat_doc("a", "A", 0), cat_doc("b", "B", 1)],
        );
        settle().await;
        store.send_snapshot(
            "categories/a/tasks",
            vec![task_doc("t1", "Keep", "2024-07-01T00:00:00+00:00")],
        );
        store.send_snapshot(
            "categories/b/tasks",
            vec![
                task_doc("t2", "Gone 1", "2024-07-01T00:00:00+00:00"),
                task_doc("t3", "Gone 2", "2024-07-02T00:00:00+00:00"),
                task_doc("t4", "Gone 3", "2024-07-03T00:00:00+00:00"),
            ],
        );
        settle().await;

        store.send_snapshot("categories", vec![cat_doc("a", "A", 0)]);
        settle().await;
        let count_after_delete = {
            let got = emissions.lock().unwrap();
            let last = got.last().unwrap();
            assert_eq!(titles(last), ["A"]);
            assert!(last.iter().all(|v| v.category.id != "b"));
            got.len()
        };
        assert!(!store.active_paths().contains("categories/b/tasks"));

        // A straggling task event for the deleted category changes nothing.
        store.send_snapshot(
            "categories/b/tasks",
            vec![task_doc("t5", "Ghost", "2024-07-04T00:00:00+00:00")],
        );
        settle().await;
        assert_eq!(emissions.lock().unwrap().len(), count_after_delete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_is_idempotent_and_final() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot("categories", vec![cat_doc("a", "A", 0)]);
        settle().await;
        store.send_snapshot("categories/a/tasks", vec![]);
        settle().await;
        assert_eq!(emissions.lock().unwrap().len(), 1);

        // An event still in flight when teardown begins must be dropped.
        store.send_snapshot(
            "categories/a/tasks",
            vec![task_doc("t1", "Late", "2024-07-01T00:00:00+00:00")],
        );
        handle.unsubscribe();
        handle.unsubscribe();
        settle().await;
        time::sleep(INITIAL_LOAD_GRACE * 2).await;

        assert_eq!(emissions.lock().unwrap().len(), 1);
        assert!(store.active_paths().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_tears_down() {
        let store = ScriptedStore::default();
        let (_, on_update) = collector();
        let (_, on_error) = error_collector();
        let handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;
        store.send_snapshot("categories", vec![cat_doc("a", "A", 0)]);
        settle().await;
        assert!(!store.active_paths().is_empty());

        drop(handle);
        settle().await;
        assert!(store.active_paths().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_errors_reach_error_channel_and_keep_state() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (errors, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot("categories", vec![cat_doc("a", "A", 0)]);
        settle().await;
        store.send_snapshot(
            "categories/a/tasks",
            vec![task_doc("t1", "Keep", "2024-07-01T00:00:00+00:00")],
        );
        settle().await;
        assert_eq!(emissions.lock().unwrap().len(), 1);

        store.send_error(
            "categories/a/tasks",
            TasksyncError::transport("connection reset"),
        );
        settle().await;

        {
            let errs = errors.lock().unwrap();
            assert_eq!(errs.len(), 1);
            assert_eq!(errs[0].code, ErrorCode::Transport);
        }
        // No update was emitted for the error and the last board stands.
        let got = emissions.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(task_names(&got[0], "a"), ["Keep"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_after_initial_load_are_immediate() {
        let store = ScriptedStore::default();
        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let _handle = subscribe(store.clone(), parent_query(), child_query, on_update, on_error);
        settle().await;

        store.send_snapshot("categories", vec![cat_doc("a", "A", 0)]);
        settle().await;
        store.send_snapshot("categories/a/tasks", vec![]);
        settle().await;
        assert_eq!(emissions.lock().unwrap().len(), 1);

        store.send_snapshot(
            "categories/a/tasks",
            vec![task_doc("t1", "One", "2024-07-01T00:00:00+00:00")],
        );
        settle().await;
        store.send_snapshot(
            "categories/a/tasks",
            vec![
                task_doc("t1", "One", "2024-07-01T00:00:00+00:00"),
                task_doc("t2", "Two", "2024-07-02T00:00:00+00:00"),
            ],
        );
        settle().await;
        assert_eq!(emissions.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_over_memory_store() {
        let store = MemoryStore::new();
        let user = "u1";
        let categories = crate::store::paths::categories(user);

        let c1 = store
            .create(&categories, json!({ "title": "Project Setup", "position": 0 }))
            .unwrap();
        let c2 = store
            .create(&categories, json!({ "title": "Deployment", "position": 1 }))
            .unwrap();
        let tasks_c1 = crate::store::paths::tasks(user, &c1.id);
        let tasks_c2 = crate::store::paths::tasks(user, &c2.id);
        store
            .create(
                &tasks_c1,
                json!({
                    "name": "Define Objectives",
                    "status": "completed",
                    "completed": true,
                    "createdAt": "2024-07-01T00:00:00+00:00"
                }),
            )
            .unwrap();

        let (emissions, on_update) = collector();
        let (_, on_error) = error_collector();
        let owner = user.to_string();
        let handle = subscribe(
            store.clone(),
            Query::new(categories.clone(), "position"),
            move |category_id| {
                Query::new(crate::store::paths::tasks(&owner, category_id), "createdAt")
            },
            on_update,
            on_error,
        );
        settle().await;
        time::sleep(INITIAL_LOAD_GRACE * 2).await;
        assert_eq!(emissions.lock().unwrap().len(), 1);

        // A move interrupted between its two steps leaves the task visible
        // in both categories.
        let moved = store.get(&tasks_c1, &store.list(&Query::new(tasks_c1.clone(), "createdAt"))[0].id);
        let moved = moved.unwrap();
        store.create(&tasks_c2, moved.data.clone()).unwrap();
        settle().await;
        {
            let got = emissions.lock().unwrap();
            let last = got.last().unwrap();
            assert_eq!(task_names(last, &c1.id), ["Define Objectives"]);
            assert_eq!(task_names(last, &c2.id), ["Define Objectives"]);
        }

        // The delete step resolves the duplication.
        store.delete(&tasks_c1, &moved.id).unwrap();
        settle().await;
        {
            let got = emissions.lock().unwrap();
            let last = got.last().unwrap();
            assert!(task_names(last, &c1.id).is_empty());
            assert_eq!(task_names(last, &c2.id), ["Define Objectives"]);
        }

        // Deleting a category in one batch removes it and its tasks
        // together and closes its listener.
        let mut batch = WriteBatch::new();
        for doc in store.list(&Query::new(tasks_c2.clone(), "createdAt")) {
            batch.delete(tasks_c2.clone(), doc.id);
        }
        batch.delete(categories.clone(), c2.id.clone());
        store.commit(batch).unwrap();
        settle().await;
        {
            let got = emissions.lock().unwrap();
            let last = got.last().unwrap();
            assert_eq!(titles(last), ["Project Setup"]);
        }
        assert_eq!(store.listener_count(&tasks_c2), 0);

        handle.unsubscribe();
        settle().await;
        assert_eq!(store.total_listeners(), 0);
    }
}
