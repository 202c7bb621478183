#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unresolved field '{field}' on model '{model}'")]
    UnresolvedField { model: String, field: String },
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Backing store error: {0}")]
    BackingStore(String),
    #[error("Storage operation failed: {0}")]
    StorageOperation(String),
    #[error("Invalid view configuration: {0}")]
    InvalidView(#[from] serde_json::Error),
    #[error("Stored view not found: {0}")]
    ViewNotFound(String),
    #[error("Edit form failed: {0}")]
    EditForm(String),
}

impl ModelError {
    pub fn unresolved(model: impl Into<String>, field: impl Into<String>) -> Self {
        ModelError::UnresolvedField {
            model: model.into(),
            field: field.into(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
