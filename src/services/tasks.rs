use serde_json::{json, Map, Value};

use crate::error::TasksyncError;
use crate::models::{Assignee, Category, Priority, Task, TaskStatus};
use crate::services::{categories_query, now, tasks_query};
use crate::store::{paths, MemoryStore};

#[derive(Debug, Default)]
pub struct NewTask {
    pub name: String,
    pub due_date: String,
    pub assignee: Assignee,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: TaskStatus,
}

/// Create a task in a category. The task lands at the end of the
/// category's list (creation time is the sort key).
pub fn add_task(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    new: NewTask,
) -> Result<Task, TasksyncError> {
    if new.name.trim().is_empty() {
        return Err(TasksyncError::validation("task name cannot be empty"));
    }
    store
        .get(&paths::categories(user), category_id)
        .map_err(|_| TasksyncError::category_not_found(category_id))?;

    let stamp = now();
    let task = Task {
        id: String::new(),
        name: new.name.trim().to_string(),
        due_date: new.due_date,
        assignee: new.assignee,
        completed: new.status.is_completed(),
        status: new.status,
        comments: 0,
        task_comments: Vec::new(),
        description: new.description,
        priority: new.priority,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    let doc = store.create(&paths::tasks(user, category_id), task.to_fields())?;
    Task::from_document(&doc)
}

/// Partial task edit; only the provided fields change.
#[derive(Debug, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub due_date: Option<String>,
    pub assignee: Option<Assignee>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.due_date.is_none()
            && self.assignee.is_none()
            && self.description.is_none()
            && self.priority.is_none()
    }
}

pub fn update_task(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    task_id: &str,
    patch: TaskPatch,
) -> Result<(), TasksyncError> {
    if patch.is_empty() {
        return Err(TasksyncError::validation("nothing to update"));
    }
    let path = paths::tasks(user, category_id);
    store
        .get(&path, task_id)
        .map_err(|_| TasksyncError::task_not_found(task_id))?;

    let mut fields = Map::new();
    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(TasksyncError::validation("task name cannot be empty"));
        }
        fields.insert("name".into(), json!(name.trim()));
    }
    if let Some(due_date) = patch.due_date {
        fields.insert("dueDate".into(), json!(due_date));
    }
    if let Some(assignee) = patch.assignee {
        fields.insert("assignee".into(), serde_json::to_value(assignee)?);
    }
    if let Some(description) = patch.description {
        fields.insert("description".into(), json!(description));
    }
    if let Some(priority) = patch.priority {
        fields.insert("priority".into(), json!(priority.as_str()));
    }
    fields.insert("updatedAt".into(), json!(now()));
    store.update(&path, task_id, Value::Object(fields))
}

/// Set the status and keep the `completed` flag consistent with it.
pub fn set_task_status(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    task_id: &str,
    status: TaskStatus,
) -> Result<(), TasksyncError> {
    let path = paths::tasks(user, category_id);
    store
        .get(&path, task_id)
        .map_err(|_| TasksyncError::task_not_found(task_id))?;
    store.update(
        &path,
        task_id,
        json!({
            "status": status.as_str(),
            "completed": status.is_completed(),
            "updatedAt": now(),
        }),
    )
}

/// Check a task off (or back on); status follows the flag.
pub fn set_task_completion(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    task_id: &str,
    completed: bool,
) -> Result<(), TasksyncError> {
    let status = if completed {
        TaskStatus::Completed
    } else {
        TaskStatus::NotStarted
    };
    set_task_status(store, user, category_id, task_id, status)
}

pub fn delete_task(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    task_id: &str,
) -> Result<(), TasksyncError> {
    let path = paths::tasks(user, category_id);
    store
        .get(&path, task_id)
        .map_err(|_| TasksyncError::task_not_found(task_id))?;
    store.delete(&path, task_id)
}

/// Copy a task within its category. The copy keeps the fields (comments
/// included) but starts unchecked, under a " (Copy)" name.
pub fn duplicate_task(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    task_id: &str,
) -> Result<Task, TasksyncError> {
    let path = paths::tasks(user, category_id);
    let doc = store
        .get(&path, task_id)
        .map_err(|_| TasksyncError::task_not_found(task_id))?;
    let mut copy = Task::from_document(&doc)?;
    copy.name = format!("{} (Copy)", copy.name);
    copy.completed = false;
    copy.status = TaskStatus::NotStarted;
    let stamp = now();
    copy.created_at = stamp.clone();
    copy.updated_at = stamp;

    let created = store.create(&path, copy.to_fields())?;
    Task::from_document(&created)
}

/// Move a task to another category: create in the destination, then
/// delete from the source. The two steps are not atomic; if the delete
/// never runs the task stays visible in both categories (duplicated, not
/// lost) and the caller resolves it. The destination assigns a fresh id
/// and creation time, so the task lands at the end of its new category.
pub fn move_task(
    store: &MemoryStore,
    user: &str,
    from_category: &str,
    to_category: &str,
    task_id: &str,
) -> Result<Task, TasksyncError> {
    let source = paths::tasks(user, from_category);
    let doc = store
        .get(&source, task_id)
        .map_err(|_| TasksyncError::task_not_found(task_id))?;
    store
        .get(&paths::categories(user), to_category)
        .map_err(|_| TasksyncError::category_not_found(to_category))?;

    let mut task = Task::from_document(&doc)?;
    let stamp = now();
    task.created_at = stamp.clone();
    task.updated_at = stamp;

    let created = store.create(&paths::tasks(user, to_category), task.to_fields())?;
    store.delete(&source, task_id)?;
    Task::from_document(&created)
}

/// Resolve a task by exact id or id prefix across all of the user's
/// categories.
pub fn find_task(
    store: &MemoryStore,
    user: &str,
    reference: &str,
) -> Result<(Category, Task), TasksyncError> {
    let mut exact = Vec::new();
    let mut prefixed = Vec::new();
    for doc in store.list(&categories_query(user)) {
        let category = match Category::from_document(&doc) {
            Ok(category) => category,
            Err(_) => continue,
        };
        for task_doc in store.list(&tasks_query(user, &category.id)) {
            if task_doc.id == reference {
                exact.push((category.clone(), task_doc));
            } else if task_doc.id.starts_with(reference) {
                prefixed.push((category.clone(), task_doc));
            }
        }
    }

    let matches = if exact.is_empty() { prefixed } else { exact };
    match matches.len() {
        0 => Err(TasksyncError::task_not_found(reference)),
        1 => {
            let (category, doc) = &matches[0];
            Ok((category.clone(), Task::from_document(doc)?))
        }
        _ => {
            let candidates: Vec<String> = matches
                .iter()
                .map(|(_, d)| {
                    let name = d.data.get("name").and_then(|n| n.as_str()).unwrap_or("?");
                    format!("{name} ({})", d.id)
                })
                .collect();
            Err(TasksyncError::ambiguous_ref(reference, &candidates))
        }
    }
}
