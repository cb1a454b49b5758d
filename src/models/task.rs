use serde::{Deserialize, Serialize};

use crate::error::TasksyncError;
use crate::models::Comment;
use crate::store::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not-started" => Some(Self::NotStarted),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The `completed` flag a task must carry for this status.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assignee {
    pub name: String,
    pub avatar: String,
}

/// Invariant: `completed` always equals `status.is_completed()`. Every
/// mutation that touches one side sets the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub assignee: Assignee,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub completed: bool,
    /// Number of comments, kept equal to `task_comments.len()`.
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub task_comments: Vec<Comment>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Task {
    pub fn from_document(doc: &Document) -> Result<Self, TasksyncError> {
        let mut task: Task = serde_json::from_value(doc.data.clone())?;
        task.id = doc.id.clone();
        Ok(task)
    }

    /// The persisted field map, without the document id.
    pub fn to_fields(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("task serializes")
    }
}
