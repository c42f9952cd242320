use std::fmt::Debug;
use std::fs::{self, File as StdFile};
use std::io::{ErrorKind, Result as IoResult};
use std::path::Path;

use cfg_if::cfg_if;

use crate::mode::FileMode;


/// The mutating system calls made by an [`OsFs`].
///
/// Replacing the [`StdOps`] of a filesystem with [`OsFs::with_ops`] allows the failure of any of
/// these calls to be simulated.
///
/// [`OsFs`]: super::OsFs
/// [`OsFs::with_ops`]: super::OsFs::with_ops
pub trait OsOps: Debug + Send + Sync {
    /// Create or truncate the file at `path`, opened for both reading and writing.
    fn create(&self, path: &Path) -> IoResult<StdFile>;

    /// Create the directory at `path` and any missing parents. Where supported, new directories
    /// are given the permission bits of `mode`.
    fn create_dir_all(&self, path: &Path, mode: FileMode) -> IoResult<()>;

    /// Remove the file at `path`.
    fn remove_file(&self, path: &Path) -> IoResult<()>;

    /// Remove `path` and anything beneath it. Succeeds if nothing exists at `path`.
    fn remove_dir_all(&self, path: &Path) -> IoResult<()>;
}

/// [`OsOps`] implemented with [`std::fs`].
#[derive(Default, Debug, Clone, Copy)]
pub struct StdOps;

impl OsOps for StdOps {
    #[inline]
    fn create(&self, path: &Path) -> IoResult<StdFile> {
        StdFile::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }

    fn create_dir_all(&self, path: &Path, mode: FileMode) -> IoResult<()> {
        cfg_if! {
            if #[cfg(unix)] {
                use std::os::unix::fs::DirBuilderExt as _;

                // A mode carrying only type bits would produce unusable directories.
                let perm = match mode.perm().bits() {
                    0    => FileMode::PERM.bits(),
                    perm => perm,
                };

                fs::DirBuilder::new()
                    .recursive(true)
                    .mode(perm)
                    .create(path)
            } else {
                let _unused = mode;
                fs::create_dir_all(path)
            }
        }
    }

    #[inline]
    fn remove_file(&self, path: &Path) -> IoResult<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> IoResult<()> {
        match fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
            Ok(_)                             => fs::remove_file(path),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err)                          => Err(err),
        }
    }
}
