//! Store-level errors and their RPC mapping.

use tonic::Status;

/// Failures raised by the storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Insert rejected because the key is already present.
    #[error("record already exists")]
    AlreadyExists,

    /// Backend I/O failure (disk image store).
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => Status::already_exists(err.to_string()),
            StoreError::Io(_) => Status::internal(err.to_string()),
        }
    }
}
