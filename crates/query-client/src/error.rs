use std::borrow::Cow;

/// Errors raised while building operations or composing query text.
///
/// These are programmer errors: they are returned synchronously and never
/// retried. Transport failures are reported through [`ExecutionError`] instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("The provided operation is missing a name property!")]
    MissingName,
    #[error("Unrecognized operation source: {0}")]
    UnrecognizedSource(Cow<'static, str>),
    #[error("Operations of type '{0}' are not supported.")]
    UnsupportedOperationType(String),
    #[error("Expected whitespace between fragment references, found {text:?} in segment {segment}.")]
    ExpectedWhitespace { segment: usize, text: String },
    #[error("Expected {expected} text segments around the interpolated fragments, got {actual}.")]
    SegmentMismatch { expected: usize, actual: usize },
    #[error("Could not parse the GraphQL document: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by an execution link while running an operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("{0}")]
    AnyError(String),
    #[error("The server responded without data: {0}")]
    MissingData(String),
}

impl ExecutionError {
    pub fn any(error: impl ToString) -> Self {
        ExecutionError::AnyError(error.to_string())
    }
}

pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
