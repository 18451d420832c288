use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for ORM operations.
///
/// Each kind describes one category of failure so callers can branch on the
/// failure policy rather than on message strings. The mapping to recovery
/// expectations:
///
/// - `NotFound` is recoverable and routinely caught (the upsert path relies
///   on it).
/// - `DriverError` wraps anything the connection adapter reports.
/// - `MappingError` marks a row that could not be hydrated into an entity;
///   batch hydration skips such rows instead of aborting.
/// - `PreconditionError` marks caller-logic bugs such as updating an entity
///   with no primary-key value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// A lookup matched zero rows.
    NotFound,
    /// The connection adapter reported a failure during prepare/execute.
    DriverError,
    /// A row could not be hydrated into an entity.
    MappingError,
    /// An operation was invoked on an entity that cannot be targeted safely
    /// (e.g. update/delete without a primary-key value).
    PreconditionError,
    /// The operation is not valid in the current context.
    InvalidOperation,
    /// A value had a type that the target field cannot accept.
    InvalidDataType,
    /// Internal error (usually indicates a bug).
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::DriverError => write!(f, "Driver error"),
            ErrorKind::MappingError => write!(f, "Mapping error"),
            ErrorKind::PreconditionError => write!(f, "Precondition error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Crate-wide error type.
///
/// `OrmError` carries a message, an [`ErrorKind`], an optional cause chain,
/// and a backtrace captured at construction time.
///
/// # Examples
///
/// ```rust,ignore
/// use tablemap::errors::{OrmError, ErrorKind, OrmResult};
///
/// fn example() -> OrmResult<()> {
///     Err(OrmError::new("No data found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Clone)]
pub struct OrmError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<OrmError>>,
    backtrace: Atomic<Backtrace>,
}

impl OrmError {
    /// Creates a new `OrmError` with the specified message and error kind.
    pub fn new(message: impl Into<String>, error_kind: ErrorKind) -> Self {
        OrmError {
            message: message.into(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `OrmError` with an underlying cause attached.
    ///
    /// The cause error is preserved so the whole chain stays inspectable for
    /// debugging.
    pub fn new_with_cause(message: impl Into<String>, error_kind: ErrorKind, cause: OrmError) -> Self {
        OrmError {
            message: message.into(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.error_kind
    }

    pub fn cause(&self) -> Option<&OrmError> {
        self.cause.as_deref()
    }
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for OrmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for ORM operations.
///
/// All fallible operations in this crate return `OrmResult<T>`.
pub type OrmResult<T> = Result<T, OrmError>;

impl From<String> for OrmError {
    fn from(msg: String) -> Self {
        OrmError::new(msg, ErrorKind::InternalError)
    }
}

impl From<&str> for OrmError {
    fn from(msg: &str) -> Self {
        OrmError::new(msg, ErrorKind::InternalError)
    }
}
