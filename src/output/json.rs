use serde_json::{json, Value};

use crate::error::TasksyncError;
use crate::models::{Category, CategoryView, Comment, Task};
use crate::services::comments::FeedEntry;

pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data
    })
}

pub fn error(err: &TasksyncError) -> Value {
    json!({
        "success": false,
        "error": {
            "code": err.code.as_str(),
            "message": err.message
        }
    })
}

pub fn category_json(c: &Category) -> Value {
    json!({
        "id": c.id,
        "title": c.title,
        "position": c.position,
        "created_at": c.created_at,
        "updated_at": c.updated_at
    })
}

pub fn task_summary(t: &Task) -> Value {
    let mut v = json!({
        "id": t.id,
        "name": t.name,
        "status": t.status.as_str(),
        "completed": t.completed,
        "due_date": t.due_date,
        "assignee": { "name": t.assignee.name, "avatar": t.assignee.avatar },
        "comments": t.comments
    });
    if let Some(ref priority) = t.priority {
        v["priority"] = json!(priority.as_str());
    }
    v
}

pub fn task_detail(t: &Task) -> Value {
    let mut v = task_summary(t);
    v["description"] = json!(t.description);
    v["created_at"] = json!(t.created_at);
    v["updated_at"] = json!(t.updated_at);
    v["task_comments"] = json!(t.task_comments.iter().map(comment_json).collect::<Vec<_>>());
    v
}

pub fn comment_json(c: &Comment) -> Value {
    json!({
        "id": c.id,
        "author": c.author,
        "avatar": c.avatar,
        "text": c.text,
        "created_at": c.created_at
    })
}

pub fn feed_entry_json(e: &FeedEntry) -> Value {
    let mut v = comment_json(&e.comment);
    v["task_id"] = json!(e.task_id);
    v["task_name"] = json!(e.task_name);
    v["category_id"] = json!(e.category_id);
    v["category_title"] = json!(e.category_title);
    v
}

pub fn board_json(views: &[CategoryView]) -> Value {
    json!(views
        .iter()
        .map(|v| {
            let mut c = category_json(&v.category);
            c["tasks"] = json!(v.tasks.iter().map(task_summary).collect::<Vec<_>>());
            c
        })
        .collect::<Vec<_>>())
}
