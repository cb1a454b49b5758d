use serde::{Deserialize, Serialize};

use crate::error::TasksyncError;
use crate::models::Task;
use crate::store::Document;

/// An ordered container of tasks. `position` defines the display order of
/// categories and is re-assigned densely (0..n) on every reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Category {
    pub fn from_document(doc: &Document) -> Result<Self, TasksyncError> {
        let mut category: Category = serde_json::from_value(doc.data.clone())?;
        category.id = doc.id.clone();
        Ok(category)
    }

    /// The persisted field map, without the document id.
    pub fn to_fields(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("category serializes")
    }
}

/// A category with its materialized task list — the shape handed to
/// consumers of the live board and of one-shot reads. Tasks are ordered by
/// creation time ascending.
#[derive(Debug, Clone)]
pub struct CategoryView {
    pub category: Category,
    pub tasks: Vec<Task>,
}
