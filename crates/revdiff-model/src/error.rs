use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid server version: {0}")]
    InvalidVersion(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
