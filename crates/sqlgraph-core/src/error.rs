//! Error types for sqlgraph operations.

use std::fmt;

/// The primary error type for all sqlgraph operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (open, close, lost handle)
    Connection(ConnectionError),
    /// Statement preparation or execution errors reported by the driver
    Query(QueryError),
    /// Value conversion errors outside of a mapping session
    Type(TypeError),
    /// Result-set-to-entity mapping errors
    Mapping(MappingError),
    /// A statement touched a different number of rows than required
    ResultSize(ResultSizeError),
    /// File result cache errors
    Cache(CacheError),
    /// I/O errors
    Io(std::io::Error),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to open the database
    Connect,
    /// Handle was closed or lost during operation
    Disconnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Parameter could not be bound
    Bind,
    /// Database busy or locked
    Busy,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

/// Classification of mapping failures.
///
/// None of these are retryable: each one means the query, the entity
/// declarations or the row data disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// Missing key declaration, unknown relation property, or an accessor
    /// that cannot accept the value it was given.
    Configuration,
    /// A `{Type.*}` macro names a type that was never registered.
    UnregisteredEntity,
    /// A key column of the primary entity is absent (or NULL) in the row.
    NoColumnFound,
    /// A column value cannot be converted to the property type.
    Conversion,
}

impl MappingErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MappingErrorKind::Configuration => "configuration error",
            MappingErrorKind::UnregisteredEntity => "unregistered entity",
            MappingErrorKind::NoColumnFound => "no column found",
            MappingErrorKind::Conversion => "conversion error",
        }
    }
}

/// An error raised while turning rows into entities.
#[derive(Debug)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    /// Entity (short type name) being mapped, if known
    pub entity: Option<String>,
    /// Property on that entity, if the failure is property-scoped
    pub property: Option<String>,
    /// Column label that was looked up
    pub column: Option<String>,
    /// 1-based column position in the result set
    pub position: Option<usize>,
    /// Rust type the value was requested as
    pub requested: Option<&'static str>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MappingError {
    fn bare(kind: MappingErrorKind, message: String) -> Self {
        Self {
            kind,
            entity: None,
            property: None,
            column: None,
            position: None,
            requested: None,
            message,
            source: None,
        }
    }

    /// A configuration problem on `entity`.
    pub fn configuration(entity: &str, message: impl Into<String>) -> Self {
        let mut err = Self::bare(MappingErrorKind::Configuration, message.into());
        err.entity = Some(entity.to_string());
        err
    }

    /// A macro referenced `name`, which is not registered for expansion.
    pub fn unregistered(name: &str) -> Self {
        let mut err = Self::bare(
            MappingErrorKind::UnregisteredEntity,
            format!("type {name} is not registered, add it with JoiningRowHandler::entity"),
        );
        err.entity = Some(name.to_string());
        err
    }

    /// A required key column of `entity` could not be read.
    pub fn no_column(entity: &str, property: &str, column: &str, message: impl Into<String>) -> Self {
        let mut err = Self::bare(MappingErrorKind::NoColumnFound, message.into());
        err.entity = Some(entity.to_string());
        err.property = Some(property.to_string());
        err.column = Some(column.to_string());
        err
    }

    /// Converting the value at `position` into `requested` failed.
    pub fn conversion(
        entity: &str,
        property: &str,
        position: usize,
        requested: &'static str,
        cause: Error,
    ) -> Self {
        let mut err = Self::bare(
            MappingErrorKind::Conversion,
            format!(
                "failed to retrieve {entity}.{property} from result set at column {position} using type {requested}: {cause}"
            ),
        );
        err.entity = Some(entity.to_string());
        err.property = Some(property.to_string());
        err.position = Some(position);
        err.requested = Some(requested);
        err.source = Some(Box::new(cause));
        err
    }
}

/// Row count assertion failure.
#[derive(Debug)]
pub struct ResultSizeError {
    pub expected: u64,
    pub actual: u64,
    pub sql: String,
    pub message: String,
}

#[derive(Debug)]
pub struct CacheError {
    pub path: String,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// The mapping error kind, when this is a mapping failure.
    pub fn mapping_kind(&self) -> Option<MappingErrorKind> {
        match self {
            Error::Mapping(m) => Some(m.kind),
            _ => None,
        }
    }

    /// Is this a mapping error of the given kind?
    pub fn is_mapping(&self, kind: MappingErrorKind) -> bool {
        self.mapping_kind() == Some(kind)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            Error::ResultSize(r) => Some(&r.sql),
            _ => None,
        }
    }

    /// Wrap a driver-level failure with the statement it belongs to.
    pub fn query(kind: QueryErrorKind, sql: &str, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: Some(sql.to_string()),
            message: message.into(),
            source: None,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => match &e.sql {
                Some(sql) => write!(f, "Query error: {} <{}>", e.message, sql),
                None => write!(f, "Query error: {}", e.message),
            },
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Mapping(e) => write!(f, "Mapping error ({}): {}", e.kind.as_str(), e.message),
            Error::ResultSize(e) => write!(f, "Incorrect result size: {}", e.message),
            Error::Cache(e) => write!(f, "Cache error ({}): {}", e.path, e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Mapping(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Cache(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<ResultSizeError> for Error {
    fn from(err: ResultSizeError) -> Self {
        Error::ResultSize(err)
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Self {
        Error::Cache(err)
    }
}

/// Result type alias for sqlgraph operations.
pub type Result<T> = std::result::Result<T, Error>;
