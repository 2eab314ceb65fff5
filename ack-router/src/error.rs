//! Error taxonomy for the request pipeline.
//!
//! Every stage failure is terminal for the current request. Each error carries
//! the HTTP status the transport should answer with.

use std::fmt;

use thiserror::Error;

/// Coarse error category, used as a structured logging field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Body,
    Payload,
    Routing,
    Ack,
    Handler,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Body => "body",
            ErrorKind::Payload => "payload",
            ErrorKind::Routing => "routing",
            ErrorKind::Ack => "ack",
            ErrorKind::Handler => "handler",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request method must be POST, got {0}")]
    MethodNotAllowed(String),

    #[error("signing key is not configured")]
    MissingSigningKey,

    #[error("signature header is missing")]
    MissingSignature,

    #[error("timestamp header is missing")]
    MissingTimestamp,

    #[error("timestamp is not an integer: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp is outside the allowed window ({age}s > {max_age}s)")]
    Expired { age: u64, max_age: u64 },

    #[error("unsupported signature scheme")]
    UnsupportedScheme,

    #[error("signature mismatch")]
    Mismatch,
}

/// Request body decoding failures.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body is empty")]
    Empty,

    #[error("request body is not valid UTF-8")]
    NotUtf8,

    #[error("request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decoded payload is not a JSON object")]
    NotAnObject,

    #[error("decoded payload is empty")]
    EmptyPayload,
}

/// Failures deriving a routable identity from a payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload has neither a type nor a command field")]
    MissingType,

    #[error("unsupported payload type: {0}")]
    UnsupportedType(String),

    #[error("payload of type {kind} is missing id field {path}")]
    MissingId { kind: String, path: String },
}

/// Main error type for the pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("body error: {0}")]
    Body(#[from] BodyError),

    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("no route for type={kind} id={id}")]
    RouteNotFound { kind: String, id: String },

    #[error("ack error: {0}")]
    Ack(String),

    #[error("handler error: {0:#}")]
    Handler(anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Auth(_) => ErrorKind::Auth,
            AppError::Body(_) => ErrorKind::Body,
            AppError::Payload(_) => ErrorKind::Payload,
            AppError::RouteNotFound { .. } => ErrorKind::Routing,
            AppError::Ack(_) => ErrorKind::Ack,
            AppError::Handler(_) => ErrorKind::Handler,
        }
    }

    /// HTTP status code the transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Auth => 401,
            ErrorKind::Body | ErrorKind::Payload => 400,
            ErrorKind::Routing => 404,
            ErrorKind::Ack | ErrorKind::Handler => 500,
        }
    }

    /// Wrap a handler failure, keeping the original kind if the handler
    /// returned an `AppError` of its own.
    pub fn from_handler(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Handler(other),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
