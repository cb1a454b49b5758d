use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
    Transport,
    NotFound,
    Validation,
    AmbiguousRef,
    Storage,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::Transport => "TRANSPORT",
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::AmbiguousRef => "AMBIGUOUS_REF",
            Self::Storage => "STORAGE",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TasksyncError {
    pub code: ErrorCode,
    pub message: String,
}

impl TasksyncError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "tasksync is not initialized here. Run `tasksync init` first.",
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    pub fn category_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Category not found: {reference}"),
        )
    }

    pub fn task_not_found(reference: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Task not found: {reference}"))
    }

    pub fn document_not_found(path: &str, id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("No document {id} in {path}"))
    }

    pub fn ambiguous_ref(reference: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousRef,
            format!(
                "Ambiguous reference '{}'. Candidates: {}",
                reference,
                candidates.join(", ")
            ),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Storage, message)
    }
}

impl From<std::io::Error> for TasksyncError {
    fn from(e: std::io::Error) -> Self {
        Self::storage(e.to_string())
    }
}

impl From<serde_json::Error> for TasksyncError {
    fn from(e: serde_json::Error) -> Self {
        Self::storage(e.to_string())
    }
}
