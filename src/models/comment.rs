use serde::{Deserialize, Serialize};

/// A comment on a task. Comments live inside the task document and are
/// append-only: they are never edited or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub avatar: String,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
}
