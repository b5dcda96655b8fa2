use thiserror::Error;

/// Core error type for encoding and read-back operations
#[derive(Error, Debug)]
pub enum ParquetError {
    /// IO errors from the output sink or input buffer
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the thrift compact codec used for headers and the footer
    #[error("Thrift error: {0}")]
    Thrift(#[from] thrift::Error),

    /// Errors from the parquet crate's writer plumbing
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Errors decoding a JSON record or schema document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema-related errors, raised at compile time only
    #[error("Schema error: {0}")]
    Schema(String),

    /// Unsupported or failing compression codec
    #[error("Codec error: {0}")]
    Codec(String),

    /// Structurally invalid file contents found while reading back
    #[error("Corrupt file: {0}")]
    Corrupt(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted on a writer that is closed or failed
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Unsupported operation errors
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Internal errors that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for encoder operations
pub type Result<T> = std::result::Result<T, ParquetError>;

impl ParquetError {
    /// Create a new schema error
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        ParquetError::Schema(msg.into())
    }

    /// Create a new codec error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        ParquetError::Codec(msg.into())
    }

    /// Create a new corrupt-file error
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        ParquetError::Corrupt(msg.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ParquetError::InvalidArgument(msg.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        ParquetError::InvalidState(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        ParquetError::Unsupported(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        ParquetError::Internal(msg.into())
    }

    /// Whether this error came from the underlying byte stream
    pub fn is_io(&self) -> bool {
        matches!(self, ParquetError::Io(_))
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ParquetError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| wrap(e.into(), ctx.into()))
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| wrap(e.into(), f().into()))
    }
}

// I/O failures keep their variant so callers can still tell a broken sink
// apart from a logic error.
fn wrap(base: ParquetError, ctx: String) -> ParquetError {
    match base {
        ParquetError::Io(e) => {
            ParquetError::Io(std::io::Error::new(e.kind(), format!("{}: {}", ctx, e)))
        }
        ParquetError::Corrupt(msg) => ParquetError::Corrupt(format!("{}: {}", ctx, msg)),
        // thrift is only ever decoded from file bytes
        ParquetError::Thrift(e) => ParquetError::Corrupt(format!("{}: {}", ctx, e)),
        ParquetError::Codec(msg) => ParquetError::Codec(format!("{}: {}", ctx, msg)),
        other => ParquetError::Internal(format!("{}: {}", ctx, other)),
    }
}
