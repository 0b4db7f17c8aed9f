//! Error types and result definitions for star loading.
//!
//! [`EtlError`] classifies every failure with an [`ErrorKind`], keeps the call-site location and
//! a backtrace, and can carry a dynamic detail and an originating error. Several errors can be
//! aggregated into one value.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for loader operations using [`EtlError`] as the error type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Detailed payload stored for single [`EtlError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for loader operations.
#[derive(Debug, Clone)]
pub struct EtlError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    Many {
        errors: Vec<EtlError>,
        location: &'static Location<'static>,
    },
}

/// Categories of failures, grouped by the stage that produces them.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connectivity
    SourceConnectionFailed,
    DestinationConnectionFailed,
    AuthenticationError,

    // Extraction
    SourceQueryFailed,
    SourceSchemaError,
    ConversionError,

    // Transform invariants
    ContractViolation,
    MissingDimensionKeys,
    InvalidData,

    // Load
    DestinationQueryFailed,
    ConstraintViolation,
    ClearStrategyMismatch,

    // Environment
    ConfigError,
    IoError,
    EncryptionError,
    InvalidState,

    Unknown,
}

impl EtlError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the static description of this error.
    ///
    /// For multiple errors, returns the description of the first error.
    pub fn description(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.description.as_ref()),
            ErrorRepr::Many { ref errors, .. } => errors.first().and_then(|e| e.description()),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first error as the source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        EtlError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f, 1)?;
                write_backtrace(payload.backtrace.as_ref(), f, 1)?;

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if errors.is_empty() {
                    write!(f, "\n  (no inner errors provided)")?;
                }

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first_line) => write!(f, "\n  {}. {}", index + 1, first_line)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }

                    for line in lines {
                        if line.is_empty() {
                            write!(f, "\n     ")?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty() {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates a vector of errors.
///
/// A vector holding exactly one error yields that error unchanged.
impl<E> From<Vec<E>> for EtlError
where
    E: Into<EtlError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> EtlError {
        let location = Location::caller();

        let mut errors: Vec<EtlError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        EtlError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    #[track_caller]
    fn from(err: std::io::Error) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`rustls::Error`] to [`EtlError`] with [`ErrorKind::EncryptionError`].
impl From<rustls::Error> for EtlError {
    #[track_caller]
    fn from(err: rustls::Error) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::EncryptionError,
            Cow::Borrowed("TLS configuration failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`tokio_postgres::Error`] to [`EtlError`] with a source-side error kind.
///
/// The transactional store is only ever read through tokio-postgres, so every kind produced here
/// belongs to the connectivity or extraction groups.
impl From<tokio_postgres::Error> for EtlError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> EtlError {
        let (kind, description) = match err.code() {
            Some(sqlstate) => {
                use tokio_postgres::error::SqlState;

                match *sqlstate {
                    SqlState::CONNECTION_EXCEPTION
                    | SqlState::CONNECTION_DOES_NOT_EXIST
                    | SqlState::CONNECTION_FAILURE
                    | SqlState::SQLCLIENT_UNABLE_TO_ESTABLISH_SQLCONNECTION
                    | SqlState::SQLSERVER_REJECTED_ESTABLISHMENT_OF_SQLCONNECTION
                    | SqlState::TOO_MANY_CONNECTIONS
                    | SqlState::CANNOT_CONNECT_NOW
                    | SqlState::ADMIN_SHUTDOWN
                    | SqlState::CRASH_SHUTDOWN => (
                        ErrorKind::SourceConnectionFailed,
                        "PostgreSQL connection failed",
                    ),

                    SqlState::INVALID_AUTHORIZATION_SPECIFICATION | SqlState::INVALID_PASSWORD => (
                        ErrorKind::AuthenticationError,
                        "PostgreSQL authentication failed",
                    ),

                    SqlState::DATA_EXCEPTION
                    | SqlState::INVALID_TEXT_REPRESENTATION
                    | SqlState::INVALID_DATETIME_FORMAT
                    | SqlState::NUMERIC_VALUE_OUT_OF_RANGE
                    | SqlState::DIVISION_BY_ZERO => (
                        ErrorKind::ConversionError,
                        "PostgreSQL data conversion failed",
                    ),

                    SqlState::UNDEFINED_TABLE
                    | SqlState::UNDEFINED_COLUMN
                    | SqlState::UNDEFINED_FUNCTION
                    | SqlState::UNDEFINED_SCHEMA
                    | SqlState::INVALID_CATALOG_NAME => (
                        ErrorKind::SourceSchemaError,
                        "PostgreSQL schema object not found",
                    ),

                    _ => (ErrorKind::SourceQueryFailed, "PostgreSQL query failed"),
                }
            }
            // Errors without a SQLSTATE never reached the server.
            None => (
                ErrorKind::SourceConnectionFailed,
                "PostgreSQL connection failed",
            ),
        };

        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`EtlError`] with a destination-side error kind.
///
/// The reporting store is only ever reached through sqlx, so SQLSTATE classes are mapped onto
/// the connectivity and load groups.
impl From<sqlx::Error> for EtlError {
    #[track_caller]
    fn from(err: sqlx::Error) -> EtlError {
        let (kind, description) = match &err {
            sqlx::Error::Database(db_error) => match db_error.code().as_deref() {
                // Class 23: integrity constraint violation.
                Some(code) if code.starts_with("23") => (
                    ErrorKind::ConstraintViolation,
                    "PostgreSQL constraint violation",
                ),
                // Class 0A: truncate of a table referenced by a foreign key.
                Some("0A000") => (
                    ErrorKind::ClearStrategyMismatch,
                    "PostgreSQL refused to clear a referenced table",
                ),
                Some(code) if code.starts_with("28") => (
                    ErrorKind::AuthenticationError,
                    "PostgreSQL authentication failed",
                ),
                Some(code) if code.starts_with("08") || code.starts_with("57P") => (
                    ErrorKind::DestinationConnectionFailed,
                    "PostgreSQL connection failed",
                ),
                Some(code) if code.starts_with("22") => (
                    ErrorKind::ConversionError,
                    "PostgreSQL data conversion failed",
                ),
                _ => (
                    ErrorKind::DestinationQueryFailed,
                    "PostgreSQL statement failed",
                ),
            },
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => (
                ErrorKind::DestinationConnectionFailed,
                "PostgreSQL connection failed",
            ),
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => (
                ErrorKind::DestinationConnectionFailed,
                "PostgreSQL connection failed",
            ),
            sqlx::Error::Configuration(_) => {
                (ErrorKind::ConfigError, "PostgreSQL connection misconfigured")
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => (
                ErrorKind::ConversionError,
                "PostgreSQL value decoding failed",
            ),
            _ => (
                ErrorKind::DestinationQueryFailed,
                "PostgreSQL statement failed",
            ),
        };

        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
