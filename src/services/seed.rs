use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use ulid::Ulid;

use crate::error::TasksyncError;
use crate::models::TaskStatus;
use crate::services::categories_query;
use crate::store::{paths, MemoryStore, WriteBatch};

struct SampleTask {
    name: &'static str,
    due: &'static str,
    assignee: &'static str,
    avatar: &'static str,
    status: TaskStatus,
}

fn sample_task(
    name: &'static str,
    due: &'static str,
    assignee: &'static str,
    avatar: &'static str,
    status: TaskStatus,
) -> SampleTask {
    SampleTask {
        name,
        due,
        assignee,
        avatar,
        status,
    }
}

fn sample_board() -> Vec<(&'static str, Vec<SampleTask>)> {
    use TaskStatus::*;
    vec![
        (
            "Project Setup",
            vec![
                sample_task("Define Project Objectives", "07/01/24", "Alex", "👤", Completed),
                sample_task("Gather Requirements", "07/07/24", "Sarah", "👤", Completed),
                sample_task("Get Stakeholder Approval", "07/07/24", "Jordan", "👤", NotStarted),
                sample_task("Create Project Timeline", "07/14/24", "Alex", "👤", InProgress),
            ],
        ),
        (
            "Planning & Design",
            vec![
                sample_task("Complete Research Phase", "07/01/24", "Morgan", "👤", Completed),
                sample_task("Create Wireframes", "07/14/24", "Team", "👥", Completed),
                sample_task("Conduct User Testing", "07/26/24", "Team", "👥", NotStarted),
            ],
        ),
        (
            "Implementation & Testing",
            vec![
                sample_task("Setup Development Environment", "07/01/24", "Riley", "👤", Completed),
                sample_task("Build Core Features", "07/14/24", "Team", "👥", Completed),
                sample_task("Security Review", "07/14/24", "Jamie", "👤", NotStarted),
            ],
        ),
        ("Deployment", vec![]),
    ]
}

/// Seed the sample project checklist for a user in one batch. Skipped
/// (returns false) when the user already has categories.
pub fn seed(store: &MemoryStore, user: &str) -> Result<bool, TasksyncError> {
    if !store.list(&categories_query(user)).is_empty() {
        return Ok(false);
    }

    let base = Utc::now();
    // Creation times step forward one tick per document so every list has
    // a stable order from the start.
    let mut tick = 0i64;
    let mut stamp = move || {
        let at = timestamp(base, tick);
        tick += 1;
        at
    };

    let mut batch = WriteBatch::new();
    for (position, (title, tasks)) in sample_board().into_iter().enumerate() {
        let category_id = Ulid::new().to_string();
        let at = stamp();
        batch.set(
            paths::categories(user),
            category_id.clone(),
            json!({
                "title": title,
                "position": position as i64,
                "createdAt": at,
                "updatedAt": at,
            }),
        );
        for task in tasks {
            let at = stamp();
            batch.set(
                paths::tasks(user, &category_id),
                Ulid::new().to_string(),
                json!({
                    "name": task.name,
                    "dueDate": task.due,
                    "assignee": { "name": task.assignee, "avatar": task.avatar },
                    "status": task.status.as_str(),
                    "completed": task.status.is_completed(),
                    "comments": 0,
                    "createdAt": at,
                    "updatedAt": at,
                }),
            );
        }
    }
    store.commit(batch)?;
    Ok(true)
}

fn timestamp(base: DateTime<Utc>, tick: i64) -> String {
    (base + Duration::milliseconds(tick)).to_rfc3339()
}
