//! Board operations over the document store: category and task mutations,
//! comments, and one-shot reads.

pub mod categories;
pub mod comments;
pub mod seed;
pub mod tasks;

use chrono::Utc;

use crate::store::{paths, Query};

/// Live query over a user's categories, ordered by position.
pub fn categories_query(user: &str) -> Query {
    Query::new(paths::categories(user), "position")
}

/// Live query over one category's tasks, ordered by creation time.
pub fn tasks_query(user: &str, category_id: &str) -> Query {
    Query::new(paths::tasks(user, category_id), "createdAt")
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}
