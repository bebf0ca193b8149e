use thiserror::Error;

use crate::CompanyId;

/// Every failure the storage layer or the company service can report.
///
/// The set is closed: adapters translate their own failures into one of
/// these variants before returning, and anything they cannot classify
/// becomes [`CompanyError::TransactionFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompanyError {
    /// The underlying store could not be reached.
    #[error("database connection error")]
    StoreUnavailable,

    /// A storage failure that fits no other kind.
    #[error("{0}")]
    TransactionFailed(String),

    /// No company exists with the given identity.
    #[error("Record with ID {0} not found")]
    NotFound(CompanyId),

    /// Another company already uses this name.
    #[error("Company with name {0} already exists")]
    AlreadyExists(String),

    /// An update payload carried an identity different from its target.
    #[error("ID {0} cannot be updated")]
    IdentityMismatch(CompanyId),

    /// A client-supplied identity is not a valid UUID.
    #[error("Invalid ID {0}")]
    InvalidIdentity(String),

    /// The company type is outside the fixed enumeration.
    #[error("invalid company type: {0}")]
    InvalidType(String),

    /// A required input was missing or empty.
    #[error("{0}")]
    InvalidArgument(String),
}

/// The classification label of a [`CompanyError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StoreUnavailable,
    TransactionFailed,
    NotFound,
    AlreadyExists,
    IdentityMismatch,
    InvalidIdentity,
    InvalidType,
    InvalidArgument,
}

impl ErrorKind {
    /// Transport status code recommended for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::StoreUnavailable => 503,
            ErrorKind::TransactionFailed => 500,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists
            | ErrorKind::IdentityMismatch
            | ErrorKind::InvalidIdentity
            | ErrorKind::InvalidType
            | ErrorKind::InvalidArgument => 400,
        }
    }

    /// Stable snake_case label, used for metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::StoreUnavailable => "store_unavailable",
            ErrorKind::TransactionFailed => "transaction_failed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::IdentityMismatch => "identity_mismatch",
            ErrorKind::InvalidIdentity => "invalid_identity",
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::InvalidArgument => "invalid_argument",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CompanyError {
    /// Coerces an unclassified failure into `TransactionFailed`, keeping only its message.
    pub fn transaction(err: impl std::fmt::Display) -> Self {
        CompanyError::TransactionFailed(err.to_string())
    }

    /// Shorthand for an `InvalidArgument` with the given message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CompanyError::InvalidArgument(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompanyError::StoreUnavailable => ErrorKind::StoreUnavailable,
            CompanyError::TransactionFailed(_) => ErrorKind::TransactionFailed,
            CompanyError::NotFound(_) => ErrorKind::NotFound,
            CompanyError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CompanyError::IdentityMismatch(_) => ErrorKind::IdentityMismatch,
            CompanyError::InvalidIdentity(_) => ErrorKind::InvalidIdentity,
            CompanyError::InvalidType(_) => ErrorKind::InvalidType,
            CompanyError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Transport status code recommended for this error.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// Result type for company operations.
pub type Result<T> = std::result::Result<T, CompanyError>;
