use serde_json::json;

use crate::cli::commands::CategoryCommands;
use crate::error::TasksyncError;
use crate::output;
use crate::services::categories;
use crate::store::file;

pub fn run(cmd: CategoryCommands, json_output: bool, user: &str) -> i32 {
    let result = match cmd {
        CategoryCommands::Add { title } => run_add(&title, json_output, user),
        CategoryCommands::Rename { reference, title } => {
            run_rename(&reference, &title, json_output, user)
        }
        CategoryCommands::Delete { reference } => run_delete(&reference, json_output, user),
        CategoryCommands::Reorder { references } => run_reorder(&references, json_output, user),
        CategoryCommands::List => run_list(json_output, user),
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

fn run_add(title: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let category = categories::add_category(&store, user, title)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "category": output::json::category_json(&category)
            })))
            .unwrap()
        );
    } else {
        println!("Added category: {} ({})", category.title, category.id);
    }
    Ok(0)
}

fn run_rename(
    reference: &str,
    title: &str,
    json_output: bool,
    user: &str,
) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let category = categories::resolve_category(&store, user, reference)?;
    categories::rename_category(&store, user, &category.id, title)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "renamed": { "id": category.id, "title": title }
            })))
            .unwrap()
        );
    } else {
        println!("Renamed category {} to {title}", category.id);
    }
    Ok(0)
}

fn run_delete(reference: &str, json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    let category = categories::resolve_category(&store, user, reference)?;
    categories::delete_category(&store, user, &category.id)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "deleted": { "id": category.id, "title": category.title }
            })))
            .unwrap()
        );
    } else {
        println!("Deleted category {} and its tasks", category.title);
    }
    Ok(0)
}

fn run_reorder(references: &[String], json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, path) = file::open_store()?;
    // Resolve references first so a typo fails before any writes.
    let mut ordered_ids = Vec::with_capacity(references.len());
    for reference in references {
        ordered_ids.push(categories::resolve_category(&store, user, reference)?.id);
    }
    categories::reorder_categories(&store, user, &ordered_ids)?;
    file::save_store(&store, &path)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "order": ordered_ids
            })))
            .unwrap()
        );
    } else {
        println!("Reordered {} categories", ordered_ids.len());
    }
    Ok(0)
}

fn run_list(json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, _) = file::open_store()?;
    let views = categories::list_categories(&store, user)?;

    if json_output {
        let list: Vec<_> = views
            .iter()
            .map(|v| {
                let mut c = output::json::category_json(&v.category);
                c["task_count"] = json!(v.tasks.len());
                c
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({ "categories": list })))
                .unwrap()
        );
    } else {
        output::text::print_category_list(&views);
    }
    Ok(0)
}
