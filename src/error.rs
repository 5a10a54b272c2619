//! Error type for the travels engine.

/// Error type for engine operations.
///
/// The server boundary maps these onto HTTP status codes; inside the engine
/// they carry just enough context for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Create called without an id (or with id 0).
    MissingId,
    /// Update body carries an id different from the path id.
    UpdateId,
    /// Id already taken, or email already registered to another user.
    Duplicate,
    /// No record under the requested id, or a visit refers to an unknown
    /// user or location.
    NotFound,
    /// Request body failed to parse, or a field carried an explicit null.
    BadPayload(String),
    /// The merged entity failed validation.
    Validation(String),
    /// A query-string parameter failed to parse.
    BadParam(String),
    /// Anything else.
    Internal(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::MissingId => write!(f, "missing id"),
            Error::UpdateId => write!(f, "id field cannot be changed"),
            Error::Duplicate => write!(f, "duplicate key"),
            Error::NotFound => write!(f, "not found"),
            Error::BadPayload(msg) => write!(f, "bad payload: {}", msg),
            Error::Validation(msg) => write!(f, "validation failed: {}", msg),
            Error::BadParam(msg) => write!(f, "bad parameter: {}", msg),
            Error::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(format!("io error: {}", err))
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
