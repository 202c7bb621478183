use tabula_forms::FormError;
use tabula_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Grid view has been destroyed")]
    Destroyed,
    #[error("Invalid grid state: {0}")]
    InvalidState(String),
}

pub type GridResult<T> = Result<T, GridError>;
