use serde_json::json;

use crate::error::TasksyncError;
use crate::output;
use crate::services::{categories, comments};
use crate::store::file;

pub fn run_board(json_output: bool, user: &str) -> i32 {
    match board_inner(json_output, user) {
        Ok(code) => code,
        Err(e) => print_error(&e, json_output),
    }
}

fn board_inner(json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, _) = file::open_store()?;
    let views = categories::list_categories(&store, user)?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "categories": output::json::board_json(&views)
            })))
            .unwrap()
        );
    } else {
        output::text::print_board(&views);
    }
    Ok(0)
}

pub fn run_comments(json_output: bool, user: &str) -> i32 {
    match comments_inner(json_output, user) {
        Ok(code) => code,
        Err(e) => print_error(&e, json_output),
    }
}

fn comments_inner(json_output: bool, user: &str) -> Result<i32, TasksyncError> {
    let (store, _) = file::open_store()?;
    let feed = comments::comment_feed(&store, user)?;

    if json_output {
        let entries: Vec<_> = feed.iter().map(output::json::feed_entry_json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::success(json!({
                "comments": entries
            })))
            .unwrap()
        );
    } else {
        output::text::print_comment_feed(&feed);
    }
    Ok(0)
}

fn print_error(e: &TasksyncError, json_output: bool) -> i32 {
    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&output::json::error(e)).unwrap()
        );
    } else {
        eprintln!("Error: {}", e.message);
    }
    1
}
