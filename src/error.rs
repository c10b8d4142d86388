use std::path::PathBuf;

/// Errors that can occur when persisting or configuring a data container.
///
/// Typed reads never produce these: a missing key or a kind mismatch is
/// reported as `found == false` plus the caller's default.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Filesystem failure while reading or writing a data file
    #[error("failed to {operation} {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Save or load was requested with no explicit or stored path
    #[error("no data path set")]
    MissingPath,

    /// The encoded text could not be produced or parsed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The encoded text parsed but violates the store's invariants
    #[error("corrupted data file: {0}")]
    Corrupted(String),

    /// A float payload was NaN or infinite and cannot be encoded
    #[error("value for key `{key}` is not a finite number")]
    NonFiniteFloat { key: String },

    /// A custom-data payload encodes to JSON that would not decode back, for
    /// example because it holds a NaN
    #[error("custom data for key `{key}` cannot be saved: {source}")]
    UnencodableData {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Custom data of a type that was never registered
    #[error("custom data type `{0}` is not registered")]
    UnregisteredType(&'static str),

    /// Two different types were registered under the same name
    #[error("custom data type name `{name}` is already registered to another type")]
    DuplicateType { name: &'static str },

    /// The process-wide container was initialised twice
    #[error("the global data container is already initialised")]
    AlreadyInitialized,
}

impl DataError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result alias for container operations.
pub type DataResult<T> = Result<T, DataError>;
