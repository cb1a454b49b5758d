use serde_json::json;

use crate::cli::commands::TaskCommands;
use crate::error::TasksyncError;
use crate::models::{Assignee, Priority, TaskStatus};
use crate::output;
use crate::services::{categories, comments, tasks};
use crate::store::file;

pub fn run(cmd: TaskCommands, json_output: bool, user: &str) -> i32 {
    let result = match cmd {
        TaskCommands::Add {
            category,
            name,
            due,
            assignee,
            avatar,
            description,
            priority,
        } => run_add(
            &category,
            &name,
            due,
            assignee,
            avatar,
            description,
            priority,
            json_output,
            user,
        ),
        TaskCommands::Show { id } => run_show(&id, json_output, user),
        TaskCommands::Edit {
            id,
            name,
            due,
            assignee,
            avatar,
            description,
            priority,
        } => run_edit(
            &id,
            name,
            due,
            assignee,
            avatar,
            description,
            priority,
            json_output,
            user,
        ),
        TaskCommands::Status { id, status } => run_status(&id, &status, json_output, user),
        TaskCommands::Done { id } => run_completion(&id, true, json_output, user),
        TaskCommands::Undone { id } => run_completion(&id, false, json_output, user),
        TaskCommands::Duplicate { id } => run_duplicate(&id, json_output, user),
        TaskCommands::Move { id, to } => run_move(&id, &to, json_output, user),
        TaskCommands::Delete { id } => run_delete(&id, json_output, user),
        TaskCommands::Comment {
            id,
            text,
            author,
            avatar,
        } => run_comment(&id, &text, &author, &avatar, json_output, user),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output::json::error(&e)).unwrap()
                );
            } else {
                eprintln!("Error: {}", e.message);
            }
            1
        }
    }
}

fn parse_priority(value: Option<String>) -> Result<Option<Priority>, TasksyncError> {
    match value {
        None => Ok(None),
        Some(s) => Priority::from_str(&s)
            .map(Some)
            .ok_or_else(|| TasksyncError::validation(format!("unknown priority '{s}'"))),
    }
}

fn parse_status(value: &str) -> Result<TaskStatus, TasksyncError> {
    TaskStatus::from_str(value)
        .ok_or_else(|| TasksyncError::validation(format!("unknown status '{value}'")))
}

#[allow(clippy::too_many_arguments)]
fn run_add(
    category_ref: &str,
    name: &str,
    due: String,
    assignee: String,
    avatar: String,
    description: Option<String>,
    priority: Option<String>,
    json_output: bool,
    user: &str,
) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let category = categories::resolve_category(&store, user, category_ref)?;
    let task = tasks::add_task(
        &store,
        user,
        &category.id,
        tasks::NewTask {
            name: name.to_string(),
            due_date: due,
            assignee: Assignee {
                name: assignee,
                avatar,
            },
            description,
            priority: parse_priority(priority)?,
            status: TaskStatus::NotStarted,
        },
    )?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "category_id": category.id,
                "task": output::json::task_summary(&task)
            })))
            .unwrap()
        );
    } else {
        println!(
            "Added task: {} ({}) in {}",
            task.name, task.id, category.title
        );
    }
    Ok(0)
}

fn run_show(id: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, _) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "category": output::json::category_json(&category),
                "task": output::json::task_detail(&task)
            })))
            .unwrap()
        );
    } else {
        output::text::print_task(&task);
        println!("  Category: {}", category.title);
    }
    Ok(0)
}

#[allow(clippy::too_many_arguments)]
fn run_edit(
    id: &str,
    name: Option<String>,
    due: Option<String>,
    assignee: Option<String>,
    avatar: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    json_output: bool,
    user: &str,
) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;

    // Assignee updates merge with what is already on the task, so either
    // half can change on its own.
    let new_assignee = if assignee.is_some() || avatar.is_some() {
        let mut merged = task.assignee.clone();
        if let Some(name) = assignee {
            merged.name = name;
        }
        if let Some(avatar) = avatar {
            merged.avatar = avatar;
        }
        Some(merged)
    } else {
        None
    };

    tasks::update_task(
        &store,
        user,
        &category.id,
        &task.id,
        tasks::TaskPatch {
            name,
            due_date: due,
            assignee: new_assignee,
            description,
            priority: parse_priority(priority)?,
        },
    )?;
    file::save_store(&store, &path)?;

    let (_, updated) = tasks::find_task(&store, user, &task.id)?;
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "task": output::json::task_summary(&updated)
            })))
            .unwrap()
        );
    } else {
        println!("Updated task {}", updated.id);
    }
    Ok(0)
}

fn run_status(id: &str, status: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let status = parse_status(status)?;
    let (store, path) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;
    tasks::set_task_status(&store, user, &category.id, &task.id, status.clone())?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "task": { "id": task.id, "status": status.as_str() }
            })))
            .unwrap()
        );
    } else {
        println!("Task {} → {}", task.id, status.as_str());
    }
    Ok(0)
}

fn run_completion(
    id: &str,
    completed: bool,
    json_output: bool,
    user: &str,
) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;
    tasks::set_task_completion(&store, user, &category.id, &task.id, completed)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "task": { "id": task.id, "completed": completed }
            })))
            .unwrap()
        );
    } else {
        println!(
            "Task {} {}",
            task.id,
            if completed { "checked off" } else { "unchecked" }
        );
    }
    Ok(0)
}

fn run_duplicate(id: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;
    let copy = tasks::duplicate_task(&store, user, &category.id, &task.id)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "task": output::json::task_summary(&copy)
            })))
            .unwrap()
        );
    } else {
        println!("Duplicated task as {} ({})", copy.name, copy.id);
    }
    Ok(0)
}

fn run_move(id: &str, to: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let (from_category, task) = tasks::find_task(&store, user, id)?;
    let destination = categories::resolve_category(&store, user, to)?;
    let moved = tasks::move_task(&store, user, &from_category.id, &destination.id, &task.id)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "task": output::json::task_summary(&moved),
                "from": from_category.id,
                "to": destination.id
            })))
            .unwrap()
        );
    } else {
        println!(
            "Moved task {} from {} to {}",
            moved.name, from_category.title, destination.title
        );
    }
    Ok(0)
}

fn run_delete(id: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;
    tasks::delete_task(&store, user, &category.id, &task.id)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "deleted": { "id": task.id, "name": task.name }
            })))
            .unwrap()
        );
    } else {
        println!("Deleted task {}", task.name);
    }
    Ok(0)
}

fn run_comment(
    id: &str,
    text: &str,
    author: &str,
    avatar: &str,
    json_output: bool,
    user: &str,
) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let (category, task) = tasks::find_task(&store, user, id)?;
    let comment = comments::add_comment(&store, user, &category.id, &task.id, author, avatar, text)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "task_id": task.id,
                "comment": output::json::comment_json(&comment)
            })))
            .unwrap()
        );
    } else {
        println!("Commented on {}: {}", task.name, comment.text);
    }
    Ok(0)
}
