use thiserror::Error;

/// Errors that can be returned by a [`Converter`](crate::Converter).
///
/// Only [`ConvertError::Syntax`] and [`ConvertError::Serialize`] are meant to
/// reach the client verbatim; their messages describe a problem with the
/// submitted dictionary. Everything else is an environment or program defect.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input could not be read as the declared or detected format.
    #[error("{0}")]
    Syntax(String),

    /// The dictionary lacks data that the target format requires.
    #[error("{0}")]
    Serialize(String),

    /// Reading the uploaded file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other converter failure.
    #[error("internal converter error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    pub(crate) fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize(message.into())
    }
}
