//! Convenience result type alias for statuswatch.

use crate::error::AppError;

/// A specialized `Result` type for statuswatch operations.
pub type AppResult<T> = Result<T, AppError>;
