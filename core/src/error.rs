use std::fmt;
use thiserror::Error;

/// The error type for blobsas operations
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Access policy is malformed: bad time window, empty permissions or bad name
    InvalidPolicy,

    /// Adding a stored policy would exceed the container's limit
    CapacityExceeded,

    /// Token references a stored policy that does not exist (validation time only)
    PolicyNotFound,

    /// Token signature does not match its signed fields
    SignatureInvalid,

    /// Token is past its expiry
    TokenExpired,

    /// Token is presented before its start time
    TokenNotYetValid,

    /// Conditional write lost against a concurrent writer
    PreconditionFailed,

    /// Token is valid but does not grant the requested operation
    PermissionDenied,

    /// Container or object does not exist
    ResourceNotFound,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Unexpected errors (encoding, I/O, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Check if this error is raised while validating a presented token.
    ///
    /// These errors belong to the party presenting the token, not the issuer.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::PolicyNotFound
                | ErrorKind::SignatureInvalid
                | ErrorKind::TokenExpired
                | ErrorKind::TokenNotYetValid
                | ErrorKind::PermissionDenied
        )
    }
}

// Convenience constructors
impl Error {
    /// Create an invalid policy error
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPolicy, message)
    }

    /// Create a capacity exceeded error
    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityExceeded, message)
    }

    /// Create a policy not found error
    pub fn policy_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PolicyNotFound, message)
    }

    /// Create a signature invalid error
    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureInvalid, message)
    }

    /// Create a token expired error
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a token not yet valid error
    pub fn token_not_yet_valid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenNotYetValid, message)
    }

    /// Create a precondition failed error
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, message)
    }

    /// Create a permission denied error
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Create a resource not found error
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceNotFound, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidPolicy => write!(f, "invalid policy"),
            ErrorKind::CapacityExceeded => write!(f, "capacity exceeded"),
            ErrorKind::PolicyNotFound => write!(f, "policy not found"),
            ErrorKind::SignatureInvalid => write!(f, "signature invalid"),
            ErrorKind::TokenExpired => write!(f, "token expired"),
            ErrorKind::TokenNotYetValid => write!(f, "token not yet valid"),
            ErrorKind::PreconditionFailed => write!(f, "precondition failed"),
            ErrorKind::PermissionDenied => write!(f, "permission denied"),
            ErrorKind::ResourceNotFound => write!(f, "resource not found"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::signature_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
