use tabula_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Cannot convert '{input}' for field '{field}'")]
    ValueConversion { field: String, input: String },
    #[error("Widget construction failed for '{primitive}': {reason}")]
    WidgetConstruction { primitive: String, reason: String },
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Storage operation failed: {0}")]
    StorageOperation(String),
    #[error("Field '{0}' is not configured for this operation")]
    NotConfigured(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl FormError {
    pub fn conversion(field: &str, input: impl std::fmt::Display) -> Self {
        FormError::ValueConversion {
            field: field.to_string(),
            input: input.to_string(),
        }
    }
}

pub type FormResult<T> = Result<T, FormError>;
