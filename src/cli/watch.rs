use std::time::Duration;

use chrono::Utc;

use crate::error::TasksyncError;
use crate::live::aggregator;
use crate::output;
use crate::services::{categories_query, tasks_query};
use crate::store::file;

/// Follow the board live. The aggregator merges the category and task
/// listeners; a poll loop feeds external edits of the board file into the
/// store, which fans them out to the listeners.
pub fn run(interval_ms: u64, json_output: bool, user: &str) -> i32 {
    match run_inner(interval_ms, json_output, user) {
        Ok(()) => 0,
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

fn run_inner(interval_ms: u64, json_output: bool, user: &str) -> Result<(), TasksyncError> {
    let (store, path) = file::open_store()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| TasksyncError::storage(e.to_string()))?;

    runtime.block_on(async move {
        let owner = user.to_string();
        let child_owner = owner.clone();
        let _handle = aggregator::subscribe(
            store.clone(),
            categories_query(&owner),
            move |category_id| tasks_query(&child_owner, category_id),
            move |board| {
                if json_output {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&output::json::board_json(&board)).unwrap()
                    );
                } else {
                    println!("\n[{}]", Utc::now().format("%H:%M:%S"));
                    output::text::print_board(&board);
                }
            },
            |err| {
                // Non-fatal: the last known board stays on screen while
                // the transport recovers.
                eprintln!("warning: {}", err.message);
            },
        );

        let mut last_modified = file::modified(&path)?;
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));
        loop {
            ticker.tick().await;
            if let Err(err) = file::reload_if_changed(&store, &path, &mut last_modified) {
                tracing::warn!(error = %err, "failed to reload board file");
            }
        }
    })
}
