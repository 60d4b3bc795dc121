use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Unexpected document shape: {0}")]
    InputShape(String),

    #[error("Document store error: {0}")]
    Store(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
