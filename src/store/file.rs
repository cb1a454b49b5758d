use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{env, fs};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TasksyncError;
use crate::store::MemoryStore;

pub const DATA_DIR: &str = ".tasksync";
pub const DATA_FILE: &str = "board.json";

/// Persisted shape of the whole board: every collection keyed by path,
/// every document keyed by id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BoardData {
    pub collections: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Find the board root by walking up from `start`.
fn find_board_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(DATA_DIR).is_dir() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Path to the board file for the current directory tree.
pub fn data_path() -> Result<PathBuf, TasksyncError> {
    let cwd = env::current_dir().map_err(|e| TasksyncError::storage(e.to_string()))?;
    find_board_root(&cwd)
        .map(|root| root.join(DATA_DIR).join(DATA_FILE))
        .ok_or_else(TasksyncError::not_initialized)
}

/// Create the board file under `dir` if it does not exist yet.
pub fn init_at(dir: &Path) -> Result<PathBuf, TasksyncError> {
    let data_dir = dir.join(DATA_DIR);
    fs::create_dir_all(&data_dir)?;
    let path = data_dir.join(DATA_FILE);
    if !path.exists() {
        write_board(&path, &BoardData::default())?;
    }
    Ok(path)
}

/// Initialize a board in the current directory. Idempotent.
pub fn init_data_file() -> Result<PathBuf, TasksyncError> {
    let cwd = env::current_dir().map_err(|e| TasksyncError::storage(e.to_string()))?;
    init_at(&cwd)
}

/// Load the board into a fresh in-memory store.
pub fn open_store() -> Result<(MemoryStore, PathBuf), TasksyncError> {
    let path = data_path()?;
    if !path.exists() {
        return Err(TasksyncError::not_initialized());
    }
    let data = read_board(&path)?;
    Ok((MemoryStore::from_collections(data.collections), path))
}

pub fn save_store(store: &MemoryStore, path: &Path) -> Result<(), TasksyncError> {
    write_board(
        path,
        &BoardData {
            collections: store.export(),
        },
    )
}

pub fn read_board(path: &Path) -> Result<BoardData, TasksyncError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_board(path: &Path, data: &BoardData) -> Result<(), TasksyncError> {
    // Write to a temp file and rename, so a crash never leaves a
    // truncated board behind.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn modified(path: &Path) -> Result<SystemTime, TasksyncError> {
    Ok(fs::metadata(path)?.modified()?)
}

/// Reload the board file into the store when its mtime has moved on.
/// Returns whether a reload happened; the store only notifies listeners
/// of collections whose content actually changed.
pub fn reload_if_changed(
    store: &MemoryStore,
    path: &Path,
    last_modified: &mut SystemTime,
) -> Result<bool, TasksyncError> {
    let current = modified(path)?;
    if current == *last_modified {
        return Ok(false);
    }
    *last_modified = current;
    let data = read_board(path)?;
    store.replace_all(data.collections);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let first = init_at(dir.path()).unwrap();
        let second = init_at(dir.path()).unwrap();
        assert_eq!(first, second);
        assert!(first.exists());
    }

    #[test]
    fn test_find_board_root_walks_up() {
        let dir = TempDir::new().unwrap();
        init_at(dir.path()).unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let root = find_board_root(&nested).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_save_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = init_at(dir.path()).unwrap();

        let store = MemoryStore::new();
        store
            .create(
                &crate::store::paths::categories("u1"),
                json!({ "title": "Project Setup", "position": 0 }),
            )
            .unwrap();
        save_store(&store, &path).unwrap();

        let data = read_board(&path).unwrap();
        let docs = data.collections.get("users/u1/categories").unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_reload_if_changed_detects_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = init_at(dir.path()).unwrap();
        let store = MemoryStore::new();
        let mut last = modified(&path).unwrap();

        assert!(!reload_if_changed(&store, &path, &mut last).unwrap());

        let other = MemoryStore::new();
        other
            .create(
                &crate::store::paths::categories("u1"),
                json!({ "title": "Deployment", "position": 0 }),
            )
            .unwrap();
        // Make sure the mtime moves even on coarse filesystems.
        std::thread::sleep(std::time::Duration::from_millis(20));
        save_store(&other, &path).unwrap();

        assert!(reload_if_changed(&store, &path, &mut last).unwrap());
        assert_eq!(
            store
                .list(&crate::store::Query::new(
                    crate::store::paths::categories("u1"),
                    "position"
                ))
                .len(),
            1
        );
    }
}
