//! Error types for the split framework.

use std::fmt;

/// Result type for split operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for split framework.
///
/// Every coordinator operation returns `Result<T>`. A failure is reported once
/// to the caller; only `BackendError` is ever retried, and only when a retry
/// count is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Event or participant record is absent.
    ///
    /// Also returned by `DocumentStore::update` when the target document
    /// does not exist.
    NotFound(String),

    /// Operation is not allowed for the target record.
    ///
    /// Raised when a caller tries to change the creator's paid status.
    Forbidden(String),

    /// Input data failed validation.
    ///
    /// This is raised when:
    /// - A scanned bill payload breaks the item/tax/fee validity rules
    /// - An event has no creator or more than one creator
    /// - An item assignment names an item the event does not own
    /// - `Record::validate()` rejects a decoded record
    ValidationError(String),

    /// Document store read/write failure.
    ///
    /// Common causes:
    /// - Store connection lost
    /// - Network timeout
    /// - Write rejected by the store
    ///
    /// **Recovery:** Retried automatically when `CoordinatorConfig::retry_count` > 0.
    BackendError(String),

    /// Encoding a record into a document failed.
    SerializationError(String),

    /// Decoding a document into a record failed.
    ///
    /// This indicates a malformed document in the store, for example a
    /// missing field or a field of the wrong type.
    DeserializationError(String),

    /// Schema version mismatch between code and stored document.
    ///
    /// Raised when a document carries a `schema_version` other than
    /// `CURRENT_SCHEMA_VERSION`.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from stored document)
        found: u32,
    },

    /// Invalid coordinator configuration.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Document version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether a retry of the same store call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::BackendError(_))
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
