// Error types for the Aqua framework

use crate::binding::ValidationError;
use std::fmt;
use thiserror::Error;

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error(transparent)]
    Validation(#[from] RequestValidationError),

    #[error("Controller {0} is not declared as a controller")]
    MissingControllerDeclaration(String),

    #[error("Handler {handler} not found in controller {controller}")]
    HandlerNotFound { handler: String, controller: String },

    #[error("Handler {handler} binds argument {index}, beyond the maximum of {max}")]
    InvalidBinding {
        handler: String,
        index: usize,
        max: usize,
    },

    #[error("Cannot write response: headers already sent")]
    HeadersAlreadySent,

    #[error("Invalid handler argument: {0}")]
    Argument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a handler failure carrying a message.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Get the HTTP status code for this error.
    ///
    /// Only routing and validation failures are client errors; every other
    /// failure surfaces as a generic 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => STATUS_NOT_FOUND,
            Error::Validation(_) => STATUS_BAD_REQUEST,
            _ => STATUS_INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Whether this error is raised while registering controllers.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Error::MissingControllerDeclaration(_)
                | Error::HandlerNotFound { .. }
                | Error::InvalidBinding { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Aggregated parameter validation failure.
///
/// Holds every field-level error collected while binding a request, so
/// callers only ever need to handle this one type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestValidationError {
    pub errors: Vec<ValidationError>,
}

impl RequestValidationError {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// The 400 response payload.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": "Validation Error",
            "message": self.to_string(),
            "details": self.errors,
        })
    }
}

impl fmt::Display for RequestValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestValidationError {}
