use std::fmt;
use std::io;

use thiserror::Error;

use crate::blob::BlobError;

pub type Result<T> = std::result::Result<T, Error>;

/// Operation names carried by path-scoped errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Op {
    Open,
    Read,
    Seek,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Open => "open",
            Op::Read => "read",
            Op::Seek => "seek",
        };
        f.write_str(name)
    }
}

/// Coarse classification of an [`Error`], independent of the wrappers around it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The path is not a well-formed relative slash-separated path.
    InvalidPath,
    /// Neither an object nor a directory exists at the path.
    NotExist,
    /// A file operation was applied to a directory or vice versa.
    WrongKind,
    /// The blob store failed.
    Backend,
    /// Unknown seek reference point or a resulting offset outside `[0, size]`.
    SeekRange,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid path")]
    InvalidPath,

    #[error("file does not exist")]
    NotExist,

    #[error("is a directory")]
    IsDir,

    #[error("not a directory")]
    NotDir,

    #[error("invalid argument")]
    SeekRange,

    #[error(transparent)]
    Backend(#[from] BlobError),

    /// The backend failed after `read` bytes had already been delivered.
    #[error("short read after {read} bytes: {source}")]
    ShortRead { read: usize, source: Box<Error> },

    /// The object ended after `read` bytes, short of the `expected` size it was resolved with.
    #[error("unexpected end of object: read {read} of {expected} bytes")]
    Truncated { read: usize, expected: u64 },

    #[error("{op} {path}: {source}")]
    Path {
        op: Op,
        path: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `self` into a path-scoped error.
    pub fn with_path(self, op: Op, path: impl Into<String>) -> Error {
        Error::Path {
            op,
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost cause, skipping `Path` and `ShortRead` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Path { source, .. } | Error::ShortRead { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            Error::InvalidPath => ErrorKind::InvalidPath,
            Error::NotExist => ErrorKind::NotExist,
            Error::IsDir | Error::NotDir => ErrorKind::WrongKind,
            Error::SeekRange => ErrorKind::SeekRange,
            _ => ErrorKind::Backend,
        }
    }

    /// Number of bytes delivered before the failure, if any were.
    pub fn bytes_read(&self) -> Option<usize> {
        match self {
            Error::ShortRead { read, .. } => Some(*read),
            Error::Path { source, .. } => source.bytes_read(),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = match err.root_cause() {
            Error::InvalidPath | Error::SeekRange => io::ErrorKind::InvalidInput,
            Error::NotExist => io::ErrorKind::NotFound,
            Error::IsDir => io::ErrorKind::IsADirectory,
            Error::NotDir => io::ErrorKind::NotADirectory,
            Error::Backend(BlobError::Io(e)) => e.kind(),
            Error::Backend(BlobError::NotFound { .. }) => io::ErrorKind::NotFound,
            Error::Truncated { .. } => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub(crate) mod utils {
    use std::path::{Component, Path, PathBuf};

    /// Marker used for the root of the file system.
    pub const ROOT: &str = ".";

    /// Path separator of both the file system view and blob keys.
    pub const SEPARATOR: char = '/';

    /// Reports whether `name` is a valid path: `.` or an unrooted slash-separated sequence
    /// of non-empty elements, none of which is `.` or `..`.
    pub fn valid_path(name: &str) -> bool {
        if name == ROOT {
            return true;
        }
        !name.is_empty()
            && name
                .split(SEPARATOR)
                .all(|elem| !elem.is_empty() && elem != "." && elem != "..")
    }

    /// Returns the final segment of `key`, ignoring a trailing separator.
    /// The empty key names the root.
    pub fn base_name(key: &str) -> &str {
        let key = key.strip_suffix(SEPARATOR).unwrap_or(key);
        if key.is_empty() {
            return ROOT;
        }
        match key.rfind(SEPARATOR) {
            Some(idx) => &key[idx + 1..],
            None => key,
        }
    }

    /// Removes `.` components and resolves `..` against the preceding ones.
    pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if let Some(parent) = result.parent() {
                        result = parent.to_path_buf();
                    }
                }
                _ => result.push(component),
            }
        }
        result
    }
}
