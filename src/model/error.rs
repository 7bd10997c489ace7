use std::fmt;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};

/// General categories of storage and dispatch failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bucket, key or function does not exist
    NotFound,
    AccessDenied,
    /// Bucket already exists or is not empty
    Conflict,
    /// Throttling, timeouts and other failures worth retrying
    Transient,
    UnknownOperation,
    InvalidInput,
    /// The remote function failed or answered with an undecodable payload
    Invocation,
    Service,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Transient => "transient",
            ErrorKind::UnknownOperation => "unknown_operation",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Invocation => "invocation",
            ErrorKind::Service => "service",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

fn kind_from_code(code: Option<&str>) -> ErrorKind {
    match code {
        Some("NoSuchBucket" | "NoSuchKey" | "NotFound" | "ResourceNotFoundException") => {
            ErrorKind::NotFound
        }
        Some("AccessDenied" | "AccessDeniedException" | "Forbidden") => ErrorKind::AccessDenied,
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou" | "BucketNotEmpty") => {
            ErrorKind::Conflict
        }
        Some(
            "SlowDown" | "InternalError" | "ServiceUnavailable" | "TooManyRequestsException",
        ) => ErrorKind::Transient,
        _ => ErrorKind::Service,
    }
}

impl<E, R> From<SdkError<E, R>> for StoreError
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
    R: Send + Sync + fmt::Debug + 'static,
{
    fn from(value: SdkError<E, R>) -> Self {
        let kind = match &value {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
                ErrorKind::Transient
            }
            _ => kind_from_code(value.code()),
        };

        let detail = match (value.code(), value.message()) {
            (Some(code), Some(msg)) => format!("{}: {}: {}", value, code, msg),
            (Some(code), None) => format!("{}: {}", value, code),
            _ => value.to_string(),
        };

        StoreError::new(kind, detail)
    }
}

impl From<aws_sdk_s3::error::BuildError> for StoreError {
    fn from(value: aws_sdk_s3::error::BuildError) -> Self {
        StoreError::invalid_input(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::invalid_input(format!("failed to decode json: {}", value))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        let kind = match value.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied,
            _ => ErrorKind::InvalidInput,
        };
        StoreError::new(kind, value.to_string())
    }
}
