//! Error types and HTTP status mapping

use axum::http::StatusCode;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Result type alias using the framework setup error
pub type Result<T> = std::result::Result<T, Error>;

/// Setup-time error: configuration loading, socket binding, registration.
///
/// Request-time failures are [`WebApiError`] and never travel through this
/// type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource registration error
    #[error("{0}")]
    Registry(#[from] RegistryError),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Category of a request-time error
///
/// Each kind carries its HTTP status; the wire name is the name a client
/// sees in the `type` field of a serialized error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource the identifier refers to does not exist
    NotFound,
    /// The resource cannot be created because it already exists
    Exists,
    /// The payload is malformed or missing mandatory fields
    BadRepresentation,
    /// The query arguments do not conform to the expected format
    BadQueryArguments,
    /// The request cannot be performed for a reason not caused by the client
    Unable,
    /// The connector declines the operation
    NotImplemented,
    /// Unexpected server-side failure; details are logged, never serialized
    Internal,
}

impl ErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Exists => StatusCode::CONFLICT,
            Self::BadRepresentation | Self::BadQueryArguments => StatusCode::BAD_REQUEST,
            Self::Unable | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// The wire-visible type name for this error kind
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::Exists => "Exists",
            Self::BadRepresentation => "BadRepresentation",
            Self::BadQueryArguments => "BadQueryArguments",
            Self::Unable => "Unable",
            Self::NotImplemented => "NotImplemented",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-time error carried from connectors and pipeline stages to the
/// HTTP response.
///
/// Carries an optional human message and optional structured `info`
/// key/values that become part of the serialized representation. Generic
/// failures wrap their cause as [`ErrorKind::Internal`]; the cause is logged
/// server-side and never rendered to the client.
///
/// # Example
///
/// ```rust
/// use restbone::error::{ErrorKind, WebApiError};
///
/// let err = WebApiError::bad_representation("unprocessable")
///     .with_info("foo", "bar");
/// assert_eq!(err.kind, ErrorKind::BadRepresentation);
/// assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
/// ```
#[derive(Debug)]
pub struct WebApiError {
    /// The category of error
    pub kind: ErrorKind,
    /// Optional human-readable message
    pub message: Option<String>,
    /// Optional structured key/value details for the serialized body
    pub info: Option<Map<String, Value>>,
    source: Option<anyhow::Error>,
}

impl WebApiError {
    /// Create an error of the given kind with no message
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            info: None,
            source: None,
        }
    }

    /// The resource was not found
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// The resource already exists
    #[must_use]
    pub fn exists() -> Self {
        Self::new(ErrorKind::Exists)
    }

    /// The payload representation is invalid
    pub fn bad_representation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRepresentation).with_message(message)
    }

    /// The query arguments are invalid
    pub fn bad_query_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadQueryArguments).with_message(message)
    }

    /// The request cannot be performed; not the client's fault
    #[must_use]
    pub fn unable() -> Self {
        Self::new(ErrorKind::Unable)
    }

    /// The connector declines this operation; maps to 405
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::new(ErrorKind::NotImplemented)
    }

    /// Wrap an unexpected failure. The cause is kept for server-side logging
    /// only and is never serialized to the client.
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: None,
            info: None,
            source: Some(source.into()),
        }
    }

    /// Attach a human-readable message
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach one structured info entry
    #[must_use]
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.info
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Whether this is an unexpected failure rather than a taxonomy error
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }
}

impl fmt::Display for WebApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for WebApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl From<anyhow::Error> for WebApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

/// Validation error from the trait engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraitError {
    /// The assigned value does not match the trait's type constraint
    #[error("trait '{trait_name}' expects {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the offending trait
        trait_name: String,
        /// Expected type constraint
        expected: &'static str,
        /// Short description of the rejected value
        actual: String,
    },

    /// An empty string was assigned to a trait that forbids it
    #[error("trait '{trait_name}' must not be empty")]
    EmptyString {
        /// Name of the offending trait
        trait_name: String,
    },

    /// The trait name is not declared on the schema
    #[error("unknown trait '{name}'")]
    UnknownTrait {
        /// The undeclared name
        name: String,
    },

    /// The requested scope string is not `input` or `output`
    #[error("invalid scope '{value}', expected 'input' or 'output'")]
    InvalidScope {
        /// The rejected scope string
        value: String,
    },

    /// An identifier was supplied for a type that does not carry one
    #[error("'{type_name}' does not accept an identifier")]
    IdentifierNotAllowed {
        /// Schema type name
        type_name: String,
    },

    /// An instance of the wrong schema type was supplied
    #[error("expected an instance of '{expected}', got '{actual}'")]
    SchemaMismatch {
        /// Expected schema type name
        expected: String,
        /// Actual schema type name
        actual: String,
    },
}

/// Error raised while registering a connector
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Two connectors resolve to the same bound name
    #[error("name '{name}' is already registered by '{existing}', cannot register '{incoming}'")]
    DuplicateName {
        /// The colliding bound name
        name: String,
        /// Schema type of the already-registered connector
        existing: String,
        /// Schema type of the rejected connector
        incoming: String,
    },

    /// The connector's schema is not an addressable category
    #[error("'{type_name}' is a {kind} and cannot be registered")]
    NotRegistrable {
        /// Schema type name
        type_name: String,
        /// Schema category (e.g. "fragment")
        kind: &'static str,
    },
}
