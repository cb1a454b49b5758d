use std::path::PathBuf;

use serde_json::json;

use crate::error::TasksyncError;
use crate::output;
use crate::services::seed;
use crate::store::file;

pub fn run(seed_board: bool, json_output: bool, user: &str) -> i32 {
    match run_inner(seed_board, user) {
        Ok((path, seeded)) => {
            if json_output {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output::json::success(json!({
                        "path": path.to_string_lossy(),
                        "seeded": seeded
                    })))
                    .unwrap()
                );
            } else {
                println!("Initialized tasksync board at {}", path.display());
                if seeded {
                    println!("Seeded the sample project checklist.");
                }
            }
            0
        }
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

fn run_inner(seed_board: bool, user: &str) -> Result<(PathBuf, bool), TasksyncError> {
    let path = file::init_data_file()?;
    let mut seeded = false;
    if seed_board {
        let (store, path) = file::open_store()?;
        seeded = seed::seed(&store, user)?;
        if seeded {
            file::save_store(&store, &path)?;
        }
    }
    Ok((path, seeded))
}
