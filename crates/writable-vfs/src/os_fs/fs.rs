use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Level as LogLevel;

use crate::path;
use crate::error::{Op, PathError, Result};
use crate::fs_traits::{
    DirEntry, File, FileInfo, Fs, RemoveFileFs, WriteFileFs, WriterFile, check_path,
};
use crate::mode::FileMode;
use super::file::{OsFile, OsFileInfo, OsWriterFile, read_dir_sorted};
use super::ops::{OsOps, StdOps};


/// A filesystem backed by the tree of files rooted at a directory on disk.
///
/// Names are resolved relative to that directory, and must be valid paths in the sense of
/// [`valid_path`](crate::path::valid_path). Reads go straight to [`std::fs`]; the calls which
/// create or remove files and directories go through an [`OsOps`] provider, which is
/// [`StdOps`] unless another is given to [`OsFs::with_ops`].
#[derive(Debug, Clone)]
pub struct OsFs {
    dir: PathBuf,
    ops: Arc<dyn OsOps>,
}

impl OsFs {
    #[inline]
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_ops(dir, Arc::new(StdOps))
    }

    #[inline]
    #[must_use]
    pub fn with_ops(dir: impl Into<PathBuf>, ops: Arc<dyn OsOps>) -> Self {
        Self {
            dir: dir.into(),
            ops,
        }
    }

    /// The directory on disk which this filesystem is rooted at.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, name: &str) -> PathBuf {
        if name == "." {
            self.dir.clone()
        } else {
            self.dir.join(name)
        }
    }

    /// Like [`check_path`], but on Windows also rejects names which the OS would interpret as
    /// containing a separator or a drive.
    fn check_write_path(op: Op, name: &str) -> Result<(), PathError> {
        check_path(op, name)?;
        if cfg!(windows) && name.contains(['\\', ':']) {
            return Err(PathError::invalid(op, name));
        }
        Ok(())
    }
}

/// Add execute bits wherever `mode` has read bits.
const fn searchable(mode: FileMode) -> FileMode {
    let perm = mode.perm().bits();
    FileMode(perm | ((perm & 0o444) >> 2))
}

impl OsFs {
    /// Open the file or directory at `name` for reading.
    ///
    /// # Errors
    /// `Open {name}: invalid argument` for an invalid name, `Open {name}: file does not exist`
    /// if nothing is there, and any other I/O error from opening it.
    pub fn open(&self, name: &str) -> Result<OsFile> {
        check_path(Op::Open, name)?;
        OsFile::open(name, self.resolve(name))
    }

    /// Return the metadata of the file or directory at `name`.
    ///
    /// # Errors
    /// As [`OsFs::open`], but reported with [`Op::Stat`].
    pub fn stat(&self, name: &str) -> Result<OsFileInfo> {
        check_path(Op::Stat, name)?;
        Ok(OsFileInfo::stat(Op::Stat, name, &self.resolve(name))?)
    }

    /// Create the directory `dir` and any missing parents.
    ///
    /// # Errors
    /// `MkdirAll {dir}: invalid argument` for an invalid name; otherwise any I/O error from the
    /// [`OsOps`] provider, reported with [`Op::MkdirAll`].
    pub fn mkdir_all(&self, dir: &str, mode: FileMode) -> Result<()> {
        Self::check_write_path(Op::MkdirAll, dir)?;
        self.ops
            .create_dir_all(&self.resolve(dir), mode)
            .map_err(|err| PathError::from_io(Op::MkdirAll, dir, err))?;
        Ok(())
    }

    /// Create or truncate the file `name`, creating its parent directories first. The parents
    /// receive the permissions of `mode`, plus search permission wherever `mode` grants read
    /// permission.
    ///
    /// # Errors
    /// `Create {name}: invalid argument` for an invalid name. A failure to create the parent
    /// directories is reported with [`Op::MkdirAll`] and the parent's name, and a failure to
    /// create the file with [`Op::Create`].
    pub fn create_file(&self, name: &str, mode: FileMode) -> Result<OsWriterFile> {
        Self::check_write_path(Op::Create, name)?;

        let parent = path::dir(name);
        self.ops
            .create_dir_all(&self.resolve(parent), searchable(mode))
            .map_err(|err| PathError::from_io(Op::MkdirAll, parent, err))?;

        let path = self.resolve(name);
        let file = self.ops
            .create(&path)
            .map_err(|err| PathError::from_io(Op::Create, name, err))?;

        tracing::event!(LogLevel::TRACE, "OsFs created `{}`", path.display());
        Ok(OsWriterFile::new(name, path, file))
    }

    /// Replace the contents of the file `name` with `data`, creating it and its parent
    /// directories if needed. Returns the number of bytes written.
    ///
    /// # Errors
    /// Fails as [`OsFs::create_file`] does, or with any I/O error from writing the data.
    pub fn write_file(&self, name: &str, data: &[u8], mode: FileMode) -> Result<usize> {
        let mut file = self.create_file(name, mode)?;
        file.write_all(data)
            .map_err(|err| PathError::from_io(Op::WriteFile, name, err))?;
        file.close()?;
        Ok(data.len())
    }

    /// Remove the file or empty directory `name`.
    ///
    /// # Errors
    /// `Remove {name}: invalid argument` for an invalid name; otherwise any I/O error from the
    /// [`OsOps`] provider.
    pub fn remove_file(&self, name: &str) -> Result<()> {
        Self::check_write_path(Op::Remove, name)?;
        self.ops
            .remove_file(&self.resolve(name))
            .map_err(|err| PathError::from_io(Op::Remove, name, err))?;
        Ok(())
    }

    /// Remove `path` and everything beneath it. Nothing existing at `path` is not an error.
    ///
    /// # Errors
    /// `RemoveAll {path}: invalid argument` for an invalid name; otherwise any I/O error from
    /// the [`OsOps`] provider.
    pub fn remove_all(&self, path: &str) -> Result<()> {
        Self::check_write_path(Op::RemoveAll, path)?;
        self.ops
            .remove_dir_all(&self.resolve(path))
            .map_err(|err| PathError::from_io(Op::RemoveAll, path, err))?;
        tracing::event!(LogLevel::TRACE, "OsFs removed `{path}` recursively");
        Ok(())
    }
}

impl Fs for OsFs {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        Ok(Box::new(Self::open(self, name)?))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<Box<dyn DirEntry>>> {
        check_path(Op::ReadDir, name)?;
        Ok(read_dir_sorted(name, &self.resolve(name))?
            .into_iter()
            .map(|entry| -> Box<dyn DirEntry> { Box::new(entry) })
            .collect())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        check_path(Op::ReadFile, name)?;
        let data = fs::read(self.resolve(name))
            .map_err(|err| PathError::from_io(Op::ReadFile, name, err))?;
        Ok(data)
    }

    fn stat(&self, name: &str) -> Result<Box<dyn FileInfo>> {
        Ok(Box::new(Self::stat(self, name)?))
    }

    /// Returns a filesystem rooted at `dir`, sharing this filesystem's [`OsOps`]. Whether `dir`
    /// exists is not checked.
    fn sub(&self, dir: &str) -> Result<Box<dyn Fs>> {
        check_path(Op::Sub, dir)?;
        Ok(Box::new(Self::with_ops(self.resolve(dir), Arc::clone(&self.ops))))
    }

    #[inline]
    fn as_write_fs(&self) -> Option<&dyn WriteFileFs> {
        Some(self)
    }

    #[inline]
    fn as_remove_fs(&self) -> Option<&dyn RemoveFileFs> {
        Some(self)
    }
}

impl WriteFileFs for OsFs {
    fn mkdir_all(&self, dir: &str, mode: FileMode) -> Result<()> {
        Self::mkdir_all(self, dir, mode)
    }

    fn create_file(&self, name: &str, mode: FileMode) -> Result<Box<dyn WriterFile>> {
        Ok(Box::new(Self::create_file(self, name, mode)?))
    }

    fn write_file(&self, name: &str, data: &[u8], mode: FileMode) -> Result<usize> {
        Self::write_file(self, name, data, mode)
    }
}

impl RemoveFileFs for OsFs {
    fn remove_file(&self, name: &str) -> Result<()> {
        Self::remove_file(self, name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        Self::remove_all(self, path)
    }
}


#[cfg(test)]
mod tests {
    use std::fs::File as StdFile;
    use std::io::{Error as IoError, ErrorKind, Result as IoResult};

    use parking_lot::Mutex;

    use super::*;


    /// Fails every call with `ErrorKind::PermissionDenied`, recording the paths it was given.
    #[derive(Debug, Default)]
    struct DenyOps {
        calls: Mutex<Vec<String>>,
    }

    impl DenyOps {
        fn deny(&self, call: &str, path: &Path) -> IoError {
            self.calls.lock().push(format!("{call} {}", path.display()));
            IoError::from(ErrorKind::PermissionDenied)
        }
    }

    impl OsOps for DenyOps {
        fn create(&self, path: &Path) -> IoResult<StdFile> {
            Err(self.deny("create", path))
        }

        fn create_dir_all(&self, path: &Path, _mode: FileMode) -> IoResult<()> {
            Err(self.deny("create_dir_all", path))
        }

        fn remove_file(&self, path: &Path) -> IoResult<()> {
            Err(self.deny("remove_file", path))
        }

        fn remove_dir_all(&self, path: &Path) -> IoResult<()> {
            Err(self.deny("remove_dir_all", path))
        }
    }

    fn deny_fs() -> (OsFs, Arc<DenyOps>) {
        let ops = Arc::new(DenyOps::default());
        let fsys = OsFs::with_ops("/nonexistent-root", Arc::clone(&ops) as Arc<dyn OsOps>);
        (fsys, ops)
    }

    #[test]
    fn invalid_names_never_reach_the_ops() {
        let (fsys, ops) = deny_fs();

        let errs = [
            fsys.mkdir_all("../invalid", FileMode(0o755)).unwrap_err(),
            fsys.create_file("/abs", FileMode(0o644)).map(drop).unwrap_err(),
            fsys.write_file("a//b", b"", FileMode(0o644)).unwrap_err(),
            fsys.remove_file("").unwrap_err(),
            fsys.remove_all("a/..").unwrap_err(),
        ];
        let messages = errs.iter().map(ToString::to_string).collect::<Vec<_>>();

        assert_eq!(messages, [
            "MkdirAll ../invalid: invalid argument",
            "Create /abs: invalid argument",
            "Create a//b: invalid argument",
            "Remove : invalid argument",
            "RemoveAll a/..: invalid argument",
        ]);
        assert!(ops.calls.lock().is_empty());
    }

    #[test]
    fn mkdir_failure_stops_create() {
        let (fsys, ops) = deny_fs();

        let err = fsys.create_file("dir/name.txt", FileMode(0o644)).map(drop).unwrap_err();
        assert!(err.to_string().starts_with("MkdirAll dir: "), "{err}");
        assert_eq!(err.io_kind(), ErrorKind::PermissionDenied);

        let calls = ops.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls.iter().all(|call| call.starts_with("create_dir_all")));
    }

    #[test]
    fn remove_failures_keep_op_and_path() {
        let (fsys, _ops) = deny_fs();

        let err = fsys.remove_file("f.txt").unwrap_err();
        assert!(err.to_string().starts_with("Remove f.txt: "), "{err}");
        let err = fsys.remove_all("dir").unwrap_err();
        assert!(err.to_string().starts_with("RemoveAll dir: "), "{err}");
        assert_eq!(err.io_kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn parents_are_searchable() {
        assert_eq!(searchable(FileMode(0o644)), FileMode(0o755));
        assert_eq!(searchable(FileMode(0o600)), FileMode(0o700));
        assert_eq!(searchable(FileMode::DIR | FileMode(0o777)), FileMode(0o777));
    }

    #[test]
    fn sub_shares_ops() {
        let (fsys, ops) = deny_fs();

        let sub = fsys.sub("dir").unwrap();
        let err = crate::capability::mkdir_all(sub.as_ref(), "x", FileMode(0o755)).unwrap_err();
        assert!(err.to_string().starts_with("MkdirAll x: "), "{err}");
        assert_eq!(ops.calls.lock().as_slice(), [
            format!("create_dir_all {}", Path::new("/nonexistent-root/dir/x").display()),
        ]);
    }

    #[test]
    fn reads_report_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let fsys = OsFs::new(tmp.path());

        assert_eq!(
            fsys.stat("missing").unwrap_err().to_string(),
            "Stat missing: file does not exist",
        );
        assert_eq!(
            Fs::read_file(&fsys, "missing").unwrap_err().to_string(),
            "ReadFile missing: file does not exist",
        );
        assert!(fsys.open("../escape").unwrap_err().is_invalid());
    }

    #[test]
    fn write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let fsys = OsFs::new(tmp.path());

        assert_eq!(fsys.write_file("a/b/c.txt", b"hello", FileMode(0o644)).unwrap(), 5);
        assert_eq!(fs::read(tmp.path().join("a/b/c.txt")).unwrap(), b"hello");
        assert_eq!(Fs::read_file(&fsys, "a/b/c.txt").unwrap(), b"hello");

        let info = fsys.stat("a/b").unwrap();
        assert_eq!(info.name(), "b");
        assert!(info.is_dir());

        let names = Fs::read_dir(&fsys, "a/b")
            .unwrap()
            .iter()
            .map(|entry| entry.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, ["c.txt"]);

        let err = Fs::read_dir(&fsys, "a/b/c.txt").unwrap_err();
        assert_eq!(err.to_string(), "ReadDir a/b/c.txt: not a directory");
    }
}
