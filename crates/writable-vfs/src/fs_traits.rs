use std::fmt::Debug;
use std::io::{Read, Write};
use std::time::SystemTime;

use crate::{capability, path};
use crate::error::{Cause, Error, Op, PathError, Result};
use crate::mode::FileMode;


// ================================================================
//  Entry metadata
// ================================================================

/// Metadata describing a file or directory, as returned by [`Fs::stat`] and [`File::stat`].
pub trait FileInfo: Debug + Send + Sync {
    /// The final element of the entry's path.
    fn name(&self) -> &str;
    /// Length in bytes for files; directories report `0`.
    fn size(&self) -> u64;
    fn mode(&self) -> FileMode;
    fn mod_time(&self) -> SystemTime;
    fn is_dir(&self) -> bool;
}

/// An entry read from a directory, as returned by [`Fs::read_dir`] and [`File::read_dir`].
pub trait DirEntry: Debug + Send + Sync {
    /// The final element of the entry's path.
    fn name(&self) -> &str;
    fn is_dir(&self) -> bool;
    /// The type bits of the entry's mode (a subset of [`FileMode::TYPE`]).
    fn file_type(&self) -> FileMode;
    /// The full metadata of the entry.
    ///
    /// Depending on the implementation, this may be a snapshot taken when the directory was read,
    /// or may be fetched when called.
    fn info(&self) -> Result<Box<dyn FileInfo>>;
}

// ================================================================
//  File handles
// ================================================================

/// An open file or directory.
pub trait File: Read + Debug + Send {
    fn stat(&self) -> Result<Box<dyn FileInfo>>;

    /// Finish using the handle. Implementations with buffered writes commit them here, and report
    /// any error from doing so.
    fn close(&mut self) -> Result<()>;

    /// Read the entries of an open directory, in order, continuing from the previous call.
    ///
    /// If `n > 0`, at most `n` entries are returned, and [`Error::Eof`] is returned once the
    /// listing is exhausted. If `n == 0`, every remaining entry is returned at once, and an
    /// exhausted listing produces an empty `Vec` rather than an error.
    fn read_dir(&mut self, _n: usize) -> Result<Vec<Box<dyn DirEntry>>> {
        Err(Error::NotImplemented)
    }
}

/// A file handle which can also be written to.
pub trait WriterFile: File + Write {}

impl<T: File + Write + ?Sized> WriterFile for T {}

// ================================================================
//  Main filesystem traits
// ================================================================

/// A read-only filesystem.
///
/// All paths are names in the sense of [`path::valid_path`]: relative, `/`-separated, with
/// `"."` referring to the root of the filesystem.
///
/// Every method except [`open`](Fs::open) and [`sub`](Fs::sub) has a default implementation in
/// terms of `open`; implementations may override them with something more efficient.
pub trait Fs: Debug + Send + Sync {
    /// Open the file or directory at `name`.
    ///
    /// Fails with [`Cause::NotExist`] if nothing exists there.
    fn open(&self, name: &str) -> Result<Box<dyn File>>;

    /// Read the entries of the directory at `name`, sorted by name.
    fn read_dir(&self, name: &str) -> Result<Vec<Box<dyn DirEntry>>> {
        let mut file = self.open(name)?;
        let result = file.read_dir(0);
        let close_result = file.close();

        let mut entries = result.map_err(|err| match err {
            Error::NotImplemented => {
                PathError::new(Op::ReadDir, name, Cause::NotADirectory).into()
            }
            other => other,
        })?;
        close_result?;

        entries.sort_by(|lhs, rhs| lhs.name().cmp(rhs.name()));
        Ok(entries)
    }

    /// Read the full contents of the file at `name`.
    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.open(name)?;
        let mut contents = Vec::new();
        let result = file.read_to_end(&mut contents);
        let close_result = file.close();

        result.map_err(|err| PathError::from_io(Op::ReadFile, name, err))?;
        close_result?;
        Ok(contents)
    }

    /// Return the names of every entry matching the shell-style `pattern`, in lexical order.
    ///
    /// A `*` never matches a `/`. Malformed patterns are reported with [`Error::BadPattern`] even
    /// when nothing could match.
    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        capability::glob_with_read_dir(self, pattern)
    }

    /// Return the metadata of the file or directory at `name`.
    fn stat(&self, name: &str) -> Result<Box<dyn FileInfo>> {
        let mut file = self.open(name)?;
        let result = file.stat();
        let close_result = file.close();

        let info = result?;
        close_result?;
        Ok(info)
    }

    /// Return a filesystem rooted at the directory `dir`.
    fn sub(&self, dir: &str) -> Result<Box<dyn Fs>>;

    /// The write capability of this filesystem, if it has one.
    fn as_write_fs(&self) -> Option<&dyn WriteFileFs> {
        None
    }

    /// The remove capability of this filesystem, if it has one.
    fn as_remove_fs(&self) -> Option<&dyn RemoveFileFs> {
        None
    }
}

/// A filesystem which can create directories and files.
pub trait WriteFileFs: Fs {
    /// Create the directory `dir` along with any missing parents. Succeeds without changes if the
    /// directory already exists.
    fn mkdir_all(&self, dir: &str, mode: FileMode) -> Result<()>;

    /// Create (or truncate) the file `name`, creating missing parent directories with `mode`.
    ///
    /// Data written to the returned handle is only guaranteed to be visible once the handle has
    /// been [closed](File::close).
    fn create_file(&self, name: &str, mode: FileMode) -> Result<Box<dyn WriterFile>>;

    /// Replace the contents of `name` with `data`, creating it if necessary. Returns the number
    /// of bytes written.
    fn write_file(&self, name: &str, data: &[u8], mode: FileMode) -> Result<usize>;
}

/// A filesystem which can remove files and directories.
pub trait RemoveFileFs: Fs {
    /// Remove the entry at `name`.
    fn remove_file(&self, name: &str) -> Result<()>;

    /// Remove the entry at `path` and everything beneath it.
    fn remove_all(&self, path: &str) -> Result<()>;
}

/// Check `name` with [`path::valid_path`], failing with an invalid-argument error for `op`.
pub(crate) fn check_path(op: Op, name: &str) -> Result<(), PathError> {
    if path::valid_path(name) {
        Ok(())
    } else {
        Err(PathError::invalid(op, name))
    }
}
