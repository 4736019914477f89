use crate::common::error::DepsyncError;
use crate::domain::entities::dependency::Dependency;

/// Result alias used throughout the crate.
///
/// # Examples
///
/// ```
/// use depsync::common::result::DepsyncResult;
/// use depsync::common::error::DepsyncError;
///
/// fn example_function() -> DepsyncResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> DepsyncResult<()> {
///     Err(DepsyncError::internal_error("Something went wrong"))
/// }
/// ```
pub type DepsyncResult<T> = Result<T, DepsyncError>;

/// Conversion helpers from `Option` into `DepsyncResult`.
pub trait OptionExt<T> {
    /// Convert `None` into an internal error with the given message.
    ///
    /// ```
    /// use depsync::common::result::{DepsyncResult, OptionExt};
    ///
    /// let none_value: Option<String> = None;
    /// let result: DepsyncResult<String> = none_value.ok_or_internal_error("Value not found");
    /// assert!(result.is_err());
    /// ```
    fn ok_or_internal_error(self, message: impl Into<String>) -> DepsyncResult<T>;

    /// Convert `None` into a configuration error with the given message.
    fn ok_or_config_error(self, message: impl Into<String>) -> DepsyncResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_internal_error(self, message: impl Into<String>) -> DepsyncResult<T> {
        self.ok_or_else(|| DepsyncError::internal_error(message))
    }

    fn ok_or_config_error(self, message: impl Into<String>) -> DepsyncResult<T> {
        self.ok_or_else(|| DepsyncError::config_error(message))
    }
}

/// Conversion helpers from foreign `Result`s into `DepsyncResult`.
pub trait ResultExt<T, E> {
    fn map_depsync_err<F>(self, f: F) -> DepsyncResult<T>
    where
        F: FnOnce(E) -> DepsyncError;

    fn with_internal_error(self, message: impl Into<String>) -> DepsyncResult<T>
    where
        E: std::error::Error + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn map_depsync_err<F>(self, f: F) -> DepsyncResult<T>
    where
        F: FnOnce(E) -> DepsyncError,
    {
        self.map_err(f)
    }

    fn with_internal_error(self, message: impl Into<String>) -> DepsyncResult<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.map_err(|e| DepsyncError::internal_error_with_source(message, e))
    }
}

/// Helpers for chaining `DepsyncResult` operations.
pub trait DepsyncResultExt<T> {
    /// Annotate an error with the dependency chain active at the time of failure.
    fn with_chain(self, chain: impl FnOnce() -> Vec<Dependency>) -> DepsyncResult<T>;

    /// Log the error and convert into an `Option`.
    fn to_option_logged(self) -> Option<T>;
}

impl<T> DepsyncResultExt<T> for DepsyncResult<T> {
    fn with_chain(self, chain: impl FnOnce() -> Vec<Dependency>) -> DepsyncResult<T> {
        self.map_err(|e| e.with_chain(chain()))
    }

    fn to_option_logged(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }
}
