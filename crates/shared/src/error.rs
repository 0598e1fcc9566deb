use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkFailure,
    ServerFailure,
    MalformedResponse,
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("server failure ({status}): {message}")]
    ServerFailure { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GalleryError {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::ServerFailure {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::ServerFailure { .. } => ErrorKind::ServerFailure,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// Text shown to the user; the kind prefix is left out.
    pub fn detail(&self) -> &str {
        match self {
            Self::NetworkFailure(message)
            | Self::ServerFailure { message, .. }
            | Self::MalformedResponse(message)
            | Self::InvalidInput(message) => message,
        }
    }
}
