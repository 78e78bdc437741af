use crate::error::StoreError;

/// Result type for key-value store operations
pub type StoreResult<T> = Result<T, StoreError>;
