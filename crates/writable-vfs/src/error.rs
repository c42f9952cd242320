use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{Error as IoError, ErrorKind};

use thiserror::Error;


/// The `Result` type returned by filesystem operations in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The name of the operation which produced a [`PathError`].
///
/// The [`Display`] strings are stable, and match the operation names used by other filesystem
/// implementations and test harnesses; code matching on error messages may rely on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Open,
    Read,
    Write,
    ReadDir,
    ReadFile,
    Glob,
    Stat,
    Sub,
    MkdirAll,
    Create,
    CreateFile,
    WriteFile,
    Remove,
    RemoveFile,
    RemoveAll,
}

impl Op {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open       => "Open",
            Self::Read       => "Read",
            Self::Write      => "Write",
            Self::ReadDir    => "ReadDir",
            Self::ReadFile   => "ReadFile",
            Self::Glob       => "Glob",
            Self::Stat       => "Stat",
            Self::Sub        => "Sub",
            Self::MkdirAll   => "MkdirAll",
            Self::Create     => "Create",
            Self::CreateFile => "CreateFile",
            Self::WriteFile  => "WriteFile",
            Self::Remove     => "Remove",
            Self::RemoveFile => "RemoveFile",
            Self::RemoveAll  => "RemoveAll",
        }
    }
}

impl Display for Op {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Why an operation on a particular path failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Cause {
    /// The path was malformed, or the entry at the path (or one of its parents) had the wrong
    /// type for the operation.
    #[error("invalid argument")]
    Invalid,
    #[error("file does not exist")]
    NotExist,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    /// The filesystem (or a delegate) does not provide the requested capability.
    #[error("not implemented")]
    NotImplemented,
    #[error(transparent)]
    Io(#[from] IoError),
}

/// An error tied to the operation and path which caused it.
#[derive(Debug, Error)]
#[error("{op} {path}: {cause}")]
pub struct PathError {
    pub op:    Op,
    pub path:  String,
    #[source]
    pub cause: Cause,
}

impl PathError {
    #[inline]
    #[must_use]
    pub fn new(op: Op, path: impl Into<String>, cause: Cause) -> Self {
        Self {
            op,
            path: path.into(),
            cause,
        }
    }

    #[inline]
    #[must_use]
    pub fn invalid(op: Op, path: impl Into<String>) -> Self {
        Self::new(op, path, Cause::Invalid)
    }

    #[inline]
    #[must_use]
    pub fn not_exist(op: Op, path: impl Into<String>) -> Self {
        Self::new(op, path, Cause::NotExist)
    }

    #[inline]
    #[must_use]
    pub fn not_implemented(op: Op, path: impl Into<String>) -> Self {
        Self::new(op, path, Cause::NotImplemented)
    }

    /// Wrap an I/O error from the underlying system, translating "not found" into
    /// [`Cause::NotExist`].
    #[must_use]
    pub fn from_io(op: Op, path: impl Into<String>, err: IoError) -> Self {
        let cause = match err.kind() {
            ErrorKind::NotFound      => Cause::NotExist,
            ErrorKind::NotADirectory => Cause::NotADirectory,
            ErrorKind::IsADirectory  => Cause::IsADirectory,
            _                        => Cause::Io(err),
        };
        Self::new(op, path, cause)
    }
}

/// Any error returned by a filesystem in this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("syntax error in pattern: {0}")]
    BadPattern(#[from] glob::PatternError),
    /// A paged directory read ran past the last entry.
    #[error("EOF")]
    Eof,
    /// A file handle (or a delegate) does not provide the requested operation.
    #[error("not implemented")]
    NotImplemented,
    #[error(transparent)]
    Io(#[from] IoError),
}

impl Error {
    /// The cause of a [`PathError`], if this is one.
    #[inline]
    #[must_use]
    pub const fn cause(&self) -> Option<&Cause> {
        if let Self::Path(path_err) = self {
            Some(&path_err.cause)
        } else {
            None
        }
    }

    /// Whether the error occurred because nothing could be found at a given path.
    #[must_use]
    pub fn is_not_exist(&self) -> bool {
        match self {
            Self::Path(PathError { cause: Cause::NotExist, .. }) => true,
            Self::Path(PathError { cause: Cause::Io(err), .. }) | Self::Io(err) => {
                err.kind() == ErrorKind::NotFound
            }
            _ => false,
        }
    }

    /// Whether the error occurred because of a malformed path, or because an entry had the
    /// wrong type for the operation.
    #[inline]
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self.cause(), Some(Cause::Invalid))
    }

    #[inline]
    #[must_use]
    pub fn is_not_a_directory(&self) -> bool {
        matches!(self.cause(), Some(Cause::NotADirectory))
    }

    #[inline]
    #[must_use]
    pub fn is_a_directory(&self) -> bool {
        matches!(self.cause(), Some(Cause::IsADirectory))
    }

    #[inline]
    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented) || matches!(self.cause(), Some(Cause::NotImplemented))
    }

    #[inline]
    #[must_use]
    pub const fn is_bad_pattern(&self) -> bool {
        matches!(self, Self::BadPattern(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

impl Error {
    /// The closest [`ErrorKind`] to this error.
    #[must_use]
    pub fn io_kind(&self) -> ErrorKind {
        match self {
            Self::Path(path_err) => match &path_err.cause {
                Cause::Invalid        => ErrorKind::InvalidInput,
                Cause::NotExist       => ErrorKind::NotFound,
                Cause::NotADirectory  => ErrorKind::NotADirectory,
                Cause::IsADirectory   => ErrorKind::IsADirectory,
                Cause::NotImplemented => ErrorKind::Unsupported,
                Cause::Io(io_err)     => io_err.kind(),
            },
            Self::BadPattern(_)  => ErrorKind::InvalidInput,
            Self::Eof            => ErrorKind::UnexpectedEof,
            Self::NotImplemented => ErrorKind::Unsupported,
            Self::Io(io_err)     => io_err.kind(),
        }
    }
}

impl From<Error> for IoError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(io_err) => io_err,
            other             => Self::new(other.io_kind(), other),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn path_error_display() {
        let err = PathError::not_exist(Op::Open, "not-found");
        assert_eq!(err.to_string(), "Open not-found: file does not exist");

        let err = PathError::invalid(Op::MkdirAll, "../invalid");
        assert_eq!(err.to_string(), "MkdirAll ../invalid: invalid argument");

        let err = PathError::new(Op::ReadDir, "dir0/file01.txt", Cause::NotADirectory);
        assert_eq!(err.to_string(), "ReadDir dir0/file01.txt: not a directory");
    }

    #[test]
    fn queries() {
        let err = Error::from(PathError::not_exist(Op::Stat, "a"));
        assert!(err.is_not_exist());
        assert!(!err.is_invalid());

        let err = Error::from(PathError::from_io(
            Op::Open,
            "a",
            IoError::from(ErrorKind::NotFound),
        ));
        assert!(err.is_not_exist());
        assert!(matches!(err.cause(), Some(Cause::NotExist)));

        let err = Error::from(PathError::not_implemented(Op::RemoveAll, "a"));
        assert!(err.is_not_implemented());
        assert!(Error::NotImplemented.is_not_implemented());
        assert!(Error::Eof.is_eof());
    }

    #[test]
    fn into_io_error() {
        let io_err = IoError::from(Error::from(PathError::not_exist(Op::Open, "a")));
        assert_eq!(io_err.kind(), ErrorKind::NotFound);
        assert_eq!(io_err.to_string(), "Open a: file does not exist");

        let io_err = IoError::from(Error::Io(IoError::other("boom")));
        assert_eq!(io_err.kind(), ErrorKind::Other);
        assert_eq!(io_err.to_string(), "boom");
    }
}
