//! Error types for the dependency conflict engine.

use std::fmt;

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine.
///
/// Each variant wraps a concern-specific error enum with context to help with
/// debugging and error reporting.
///
/// # Error Categories
///
/// - **Normalize**: tree-normalization errors (malformed enumerator output)
/// - **Index**: package-index client errors
/// - **Resolver**: dependency resolution errors
/// - **Executor**: plan execution (subprocess) errors
/// - **Lock**: lock-file errors
/// - **Io**: file system and I/O errors
/// - **Other**: miscellaneous errors
#[derive(Debug)]
pub enum Error {
    /// Tree-normalization related errors
    Normalize(NormalizeError),
    /// Package-index related errors
    Index(IndexError),
    /// Dependency resolution related errors
    Resolver(ResolverError),
    /// Plan execution related errors
    Executor(ExecutorError),
    /// Lock file related errors
    Lock(LockError),
    /// I/O related errors
    Io(std::io::Error),
    /// Other errors
    Other(String),
}

/// Tree normalizer error types
#[derive(Debug)]
pub enum NormalizeError {
    /// The enumerator output was not a JSON array
    InvalidRoot(String),
    /// A tree element matched neither the nested nor the flat shape
    MalformedElement(String),
}

/// Package index client error types
#[derive(Debug)]
pub enum IndexError {
    /// The package does not exist in the index
    NotFound(String),
    /// The index responded with something other than valid metadata JSON
    MalformedResponse(String),
    /// The request could not be completed (connection, timeout, DNS, ...)
    Unreachable(String),
}

/// Resolver error types
#[derive(Debug)]
pub enum ResolverError {
    /// No candidate version satisfies the combined specifier set for a package
    Unsatisfiable(String),
    /// A dependency cycle was found while ordering the plan
    Cycle(String),
    /// Internal invariant violation; indicates a bug rather than bad input
    Internal(String),
}

/// Plan executor error types
#[derive(Debug)]
pub enum ExecutorError {
    /// The package-manager adapter returned a non-zero exit status
    CommandFailed {
        /// Package the failing command targeted
        package: String,
        /// Exit status returned by the adapter
        status: i32,
        /// Captured stdout/stderr
        output: String,
    },
    /// The adapter itself could not be invoked
    SpawnFailed(String),
}

/// Lock file error types
#[derive(Debug)]
pub enum LockError {
    /// The file could not be parsed as a `LockFile`
    Malformed(String),
    /// The file declares a schema version this engine does not understand
    UnsupportedSchema(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Normalize(e) => write!(f, "normalization error: {}", e),
            Error::Index(e) => write!(f, "index error: {}", e),
            Error::Resolver(e) => write!(f, "resolver error: {}", e),
            Error::Executor(e) => write!(f, "executor error: {}", e),
            Error::Lock(e) => write!(f, "lock error: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::InvalidRoot(msg) => write!(f, "invalid enumerator output: {}", msg),
            NormalizeError::MalformedElement(msg) => write!(f, "malformed tree element: {}", msg),
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::NotFound(name) => write!(f, "package '{}' not found in index", name),
            IndexError::MalformedResponse(msg) => write!(f, "malformed index response: {}", msg),
            IndexError::Unreachable(msg) => write!(f, "index unreachable: {}", msg),
        }
    }
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverError::Unsatisfiable(name) => {
                write!(f, "no version of '{}' satisfies the combined constraints", name)
            }
            ResolverError::Cycle(msg) => write!(f, "dependency cycle: {}", msg),
            ResolverError::Internal(msg) => write!(f, "internal resolver error: {}", msg),
        }
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::CommandFailed { package, status, output } => write!(
                f,
                "package manager exited with status {} for '{}': {}",
                status, package, output
            ),
            ExecutorError::SpawnFailed(msg) => write!(f, "failed to invoke package manager: {}", msg),
        }
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Malformed(msg) => write!(f, "malformed lock file: {}", msg),
            LockError::UnsupportedSchema(v) => write!(f, "unsupported lock schema version: {}", v),
        }
    }
}

impl std::error::Error for Error {}
impl std::error::Error for NormalizeError {}
impl std::error::Error for IndexError {}
impl std::error::Error for ResolverError {}
impl std::error::Error for ExecutorError {}
impl std::error::Error for LockError {}

// Conversion implementations
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<NormalizeError> for Error {
    fn from(err: NormalizeError) -> Self {
        Error::Normalize(err)
    }
}

impl From<IndexError> for Error {
    fn from(err: IndexError) -> Self {
        Error::Index(err)
    }
}

impl From<ResolverError> for Error {
    fn from(err: ResolverError) -> Self {
        Error::Resolver(err)
    }
}

impl From<ExecutorError> for Error {
    fn from(err: ExecutorError) -> Self {
        Error::Executor(err)
    }
}

impl From<LockError> for Error {
    fn from(err: LockError) -> Self {
        Error::Lock(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", err))
    }
}
