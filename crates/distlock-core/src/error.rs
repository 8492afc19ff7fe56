use thiserror::Error;

/// Errors that can occur on a single storage node.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
