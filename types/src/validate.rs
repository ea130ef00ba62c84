/// A representation of an error that can occur when validating the data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Validation failed: {0}")]
pub struct ValidationError(pub String);

/// Early return a [`ValidationError`] with a formatted message.
#[macro_export]
macro_rules! bail_validation {
    ($($arg:tt)*) => {
        return Err($crate::ValidationError(format!($($arg)*)).into())
    };
}

/// Trait for performing basic validation of the data without any context.
pub trait ValidateBasic {
    /// Perform a basic validation of the data.
    fn validate_basic(&self) -> Result<(), ValidationError>;
}
