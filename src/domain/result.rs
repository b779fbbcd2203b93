//! Result type alias for the PII pipeline
//!
//! This module provides a convenient Result type alias that uses
//! `PiiProcessError` as the error type.

use super::errors::PiiProcessError;

/// Result type alias for pipeline operations
///
/// # Examples
///
/// ```
/// use pii_process::domain::result::Result;
/// use pii_process::domain::errors::PiiProcessError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PiiProcessError::Config("missing section".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PiiProcessError>;
