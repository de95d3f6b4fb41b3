//! Storage errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrderStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
