use serde_json::json;
use ulid::Ulid;

use crate::error::TasksyncError;
use crate::models::{Comment, Task};
use crate::services::categories::list_categories;
use crate::services::now;
use crate::store::{paths, MemoryStore};

/// Append a comment to a task. The comment list and its count live inside
/// the task document, so one record update keeps them consistent.
pub fn add_comment(
    store: &MemoryStore,
    user: &str,
    category_id: &str,
    task_id: &str,
    author: &str,
    avatar: &str,
    text: &str,
) -> Result<Comment, TasksyncError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TasksyncError::validation("comment text cannot be empty"));
    }
    let path = paths::tasks(user, category_id);
    let doc = store
        .get(&path, task_id)
        .map_err(|_| TasksyncError::task_not_found(task_id))?;
    let mut task = Task::from_document(&doc)?;

    let comment = Comment {
        id: Ulid::new().to_string(),
        author: author.to_string(),
        avatar: avatar.to_string(),
        text: text.to_string(),
        created_at: now(),
    };
    task.task_comments.push(comment.clone());

    store.update(
        &path,
        task_id,
        json!({
            "taskComments": serde_json::to_value(&task.task_comments)?,
            "comments": task.task_comments.len(),
            "updatedAt": now(),
        }),
    )?;
    Ok(comment)
}

/// One row of the global comments feed.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub comment: Comment,
    pub task_id: String,
    pub task_name: String,
    pub category_id: String,
    pub category_title: String,
}

/// Every comment across the board, newest first.
pub fn comment_feed(store: &MemoryStore, user: &str) -> Result<Vec<FeedEntry>, TasksyncError> {
    let mut feed = Vec::new();
    for view in list_categories(store, user)? {
        for task in &view.tasks {
            for comment in &task.task_comments {
                feed.push(FeedEntry {
                    comment: comment.clone(),
                    task_id: task.id.clone(),
                    task_name: task.name.clone(),
                    category_id: view.category.id.clone(),
                    category_title: view.category.title.clone(),
                });
            }
        }
    }
    feed.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::{Assignee, TaskStatus};
    use crate::services::categories::add_category;
    use crate::services::tasks::{add_task, find_task, NewTask};

    fn setup() -> (MemoryStore, String, String) {
        let store = MemoryStore::new();
        let cat = add_category(&store, "u1", "Project Setup").unwrap();
        let task = add_task(
            &store,
            "u1",
            &cat.id,
            NewTask {
                name: "Gather Requirements".into(),
                due_date: "07/07/24".into(),
                assignee: Assignee {
                    name: "Sarah".into(),
                    avatar: "👤".into(),
                },
                description: None,
                priority: None,
                status: TaskStatus::NotStarted,
            },
        )
        .unwrap();
        (store, cat.id, task.id)
    }

    #[test]
    fn test_add_comment_bumps_count() {
        let (store, cat_id, task_id) = setup();
        add_comment(&store, "u1", &cat_id, &task_id, "Alex", "👤", "Looks good").unwrap();
        add_comment(&store, "u1", &cat_id, &task_id, "Sarah", "👤", "On it").unwrap();

        let (_, task) = find_task(&store, "u1", &task_id).unwrap();
        assert_eq!(task.comments, 2);
        assert_eq!(task.task_comments.len(), 2);
        assert_eq!(task.task_comments[0].text, "Looks good");
    }

    #[test]
    fn test_add_comment_rejects_empty_text() {
        let (store, cat_id, task_id) = setup();
        let err = add_comment(&store, "u1", &cat_id, &task_id, "Alex", "👤", "  ").unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[test]
    fn test_feed_is_newest_first() {
        let (store, cat_id, task_id) = setup();
        add_comment(&store, "u1", &cat_id, &task_id, "Alex", "👤", "first").unwrap();
        add_comment(&store, "u1", &cat_id, &task_id, "Sarah", "👤", "second").unwrap();

        let feed = comment_feed(&store, "u1").unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].comment.text, "second");
        assert_eq!(feed[0].category_title, "Project Setup");
        assert_eq!(feed[1].comment.text, "first");
    }
}
