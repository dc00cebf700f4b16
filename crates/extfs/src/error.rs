//! Filesystem error types.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Filesystem error type.
#[derive(Debug, Error)]
pub enum FsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied by the storage layer.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Request path escapes the filesystem base directory.
    #[error("chroot boundary crossed: {0}")]
    PathEscapesRoot(String),

    /// A base directory must be absolute.
    #[error("need an absolute path here: {0}")]
    NeedAbsolutePath(String),

    /// No backend handles this URL scheme.
    #[error("unsupported filesystem scheme: {0:?}")]
    UnsupportedScheme(String),

    /// Connection URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Handle was opened write-only.
    #[error("file can only be written: {0}")]
    WriteOnly(String),

    /// Handle was opened read-only.
    #[error("file can only be read: {0}")]
    ReadOnly(String),

    /// Operation is not supported by this backend or handle.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Open flags the backend cannot express.
    #[error("invalid open flags: {0}")]
    InvalidFlags(String),

    /// Handle was already closed.
    #[error("file already closed: {0}")]
    Closed(String),

    /// Remote client connection was closed.
    #[error("client connection closed")]
    ClientClosed,

    /// No remote client connector is registered for the scheme.
    #[error("no client connector for {0} filesystems")]
    NoClient(&'static str),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Coarse error taxonomy, stable across backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    BoundaryViolation,
    NeedsAbsolutePath,
    UnsupportedScheme,
    ModeViolation,
    InvalidFlags,
    AlreadyExists,
    NotFound,
    Config,
    Io,
}

impl FsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidFlags error.
    pub fn invalid_flags(msg: impl Into<String>) -> Self {
        Self::InvalidFlags(msg.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Attach a path to an I/O error from the host storage layer.
    ///
    /// `NotFound` and `AlreadyExists` become their dedicated variants so
    /// callers can branch on them; everything else stays an `Io` error.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let shown = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(shown),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(shown),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(shown),
            io::ErrorKind::NotADirectory => Self::NotADirectory(shown),
            io::ErrorKind::IsADirectory => Self::IsADirectory(shown),
            _ => Self::Io(io::Error::new(err.kind(), format!("{shown}: {err}"))),
        }
    }

    /// Taxonomy kind of this error.
    pub fn kind(&self) -> FsErrorKind {
        match self {
            Self::PathEscapesRoot(_) => FsErrorKind::BoundaryViolation,
            Self::NeedAbsolutePath(_) => FsErrorKind::NeedsAbsolutePath,
            Self::UnsupportedScheme(_) => FsErrorKind::UnsupportedScheme,
            Self::WriteOnly(_) | Self::ReadOnly(_) | Self::Unsupported(_) | Self::Closed(_) => {
                FsErrorKind::ModeViolation
            }
            Self::InvalidFlags(_) => FsErrorKind::InvalidFlags,
            Self::AlreadyExists(_) => FsErrorKind::AlreadyExists,
            Self::NotFound(_) => FsErrorKind::NotFound,
            Self::InvalidUrl(_) | Self::Config(_) | Self::NoClient(_) | Self::ClientClosed => {
                FsErrorKind::Config
            }
            Self::PermissionDenied(_)
            | Self::NotADirectory(_)
            | Self::IsADirectory(_)
            | Self::Io(_)
            | Self::Other(_) => FsErrorKind::Io,
        }
    }

    /// Returns true if the target did not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == FsErrorKind::NotFound
    }
}

/// Convert FsError to std::io::Error for compatibility.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            FsError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            FsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            FsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            FsError::PathEscapesRoot(msg) => io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("chroot boundary crossed: {msg}"),
            ),
            FsError::Unsupported(op) => io::Error::new(io::ErrorKind::Unsupported, op),
            FsError::Io(e) => e,
            other @ (FsError::NeedAbsolutePath(_)
            | FsError::UnsupportedScheme(_)
            | FsError::InvalidUrl(_)
            | FsError::InvalidFlags(_)
            | FsError::Config(_)) => io::Error::new(io::ErrorKind::InvalidInput, other.to_string()),
            other => io::Error::other(other.to_string()),
        }
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;
