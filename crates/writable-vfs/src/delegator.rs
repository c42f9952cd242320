//! Implementations of the filesystem traits which forward each operation to a user-provided
//! function.
//!
//! Delegators are mostly useful in tests: wrap a real filesystem with [`FsDelegator::delegate`],
//! then replace individual functions to inject faults or record calls.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::{Read, Result as IoResult, Write};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::capability;
use crate::error::{Error, Op, PathError, Result};
use crate::fs_traits::{
    DirEntry, File, FileInfo, Fs, RemoveFileFs, WriteFileFs, WriterFile, check_path,
};
use crate::mode::FileMode;


pub type OpenFn       = Box<dyn Fn(&str) -> Result<Box<dyn File>> + Send + Sync>;
pub type ReadDirFn    = Box<dyn Fn(&str) -> Result<Vec<Box<dyn DirEntry>>> + Send + Sync>;
pub type ReadFileFn   = Box<dyn Fn(&str) -> Result<Vec<u8>> + Send + Sync>;
pub type GlobFn       = Box<dyn Fn(&str) -> Result<Vec<String>> + Send + Sync>;
pub type StatFn       = Box<dyn Fn(&str) -> Result<Box<dyn FileInfo>> + Send + Sync>;
pub type SubFn        = Box<dyn Fn(&str) -> Result<Box<dyn Fs>> + Send + Sync>;
pub type MkdirAllFn   = Box<dyn Fn(&str, FileMode) -> Result<()> + Send + Sync>;
pub type CreateFileFn = Box<dyn Fn(&str, FileMode) -> Result<Box<dyn WriterFile>> + Send + Sync>;
pub type WriteFileFn  = Box<dyn Fn(&str, &[u8], FileMode) -> Result<usize> + Send + Sync>;
pub type RemoveFn     = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

pub type FileStatFn    = Box<dyn Fn() -> Result<Box<dyn FileInfo>> + Send>;
pub type FileReadFn    = Box<dyn FnMut(&mut [u8]) -> IoResult<usize> + Send>;
pub type FileCloseFn   = Box<dyn FnMut() -> Result<()> + Send>;
pub type FileReadDirFn = Box<dyn FnMut(usize) -> Result<Vec<Box<dyn DirEntry>>> + Send>;
pub type FileWriteFn   = Box<dyn FnMut(&[u8]) -> IoResult<usize> + Send>;
pub type InfoFn        = Box<dyn Fn() -> Result<Box<dyn FileInfo>> + Send + Sync>;


// ================================================================
//  Filesystems
// ================================================================

/// A read-only filesystem which forwards [`Fs::open`] to a function, and implements every other
/// operation in terms of it.
#[derive(Default, Clone)]
pub struct OpenFsDelegator {
    pub open: Option<Arc<dyn Fn(&str) -> Result<Box<dyn File>> + Send + Sync>>,
}

impl OpenFsDelegator {
    #[must_use]
    pub fn new<F>(open: F) -> Self
    where
        F: Fn(&str) -> Result<Box<dyn File>> + Send + Sync + 'static,
    {
        Self { open: Some(Arc::new(open)) }
    }

    /// Forward `open` to `fsys`, hiding every other capability of `fsys`.
    #[must_use]
    pub fn delegate<F: Fs + 'static>(fsys: F) -> Self {
        Self::new(move |name: &str| fsys.open(name))
    }
}

impl Debug for OpenFsDelegator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenFsDelegator")
            .field("open", &self.open.is_some())
            .finish()
    }
}

impl Fs for OpenFsDelegator {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        match &self.open {
            Some(open) => open(name),
            None       => Err(PathError::not_implemented(Op::Open, name).into()),
        }
    }

    /// Returns a delegator which opens names beneath `dir`. Whether `dir` exists is not checked.
    fn sub(&self, dir: &str) -> Result<Box<dyn Fs>> {
        check_path(Op::Sub, dir)?;
        if dir == "." {
            return Ok(Box::new(self.clone()));
        }

        let Some(open) = self.open.clone() else {
            return Err(PathError::not_implemented(Op::Sub, dir).into());
        };
        let dir = dir.to_owned();
        Ok(Box::new(Self::new(move |name: &str| {
            check_path(Op::Open, name)?;
            open(&crate::path::join_rel(&dir, name))
        })))
    }
}

/// A filesystem which forwards every operation to an optional function.
///
/// Missing functions fail with a `not implemented` [`PathError`] for the operation, except for
/// `mkdir_all`, which succeeds without doing anything. The write and remove capabilities are
/// always reported as present.
#[derive(Default)]
pub struct FsDelegator {
    pub open:        Option<OpenFn>,
    pub read_dir:    Option<ReadDirFn>,
    pub read_file:   Option<ReadFileFn>,
    pub glob:        Option<GlobFn>,
    pub stat:        Option<StatFn>,
    pub sub:         Option<SubFn>,
    pub mkdir_all:   Option<MkdirAllFn>,
    pub create_file: Option<CreateFileFn>,
    pub write_file:  Option<WriteFileFn>,
    pub remove_file: Option<RemoveFn>,
    pub remove_all:  Option<RemoveFn>,
}

impl FsDelegator {
    /// Forward every operation to `fsys`. The write and remove functions are only filled in if
    /// `fsys` has the corresponding capability.
    #[must_use]
    pub fn delegate(fsys: Arc<dyn Fs>) -> Self {
        let caps = capability::capabilities(fsys.as_ref());

        let mut delegator = Self {
            open:      Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str| fsys.open(name)
            })),
            read_dir:  Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str| fsys.read_dir(name)
            })),
            read_file: Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str| fsys.read_file(name)
            })),
            glob:      Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |pattern: &str| fsys.glob(pattern)
            })),
            stat:      Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str| fsys.stat(name)
            })),
            sub:       Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |dir: &str| fsys.sub(dir)
            })),
            ..Self::default()
        };

        if caps.writable {
            delegator.mkdir_all = Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |dir: &str, mode: FileMode| capability::mkdir_all(fsys.as_ref(), dir, mode)
            }));
            delegator.create_file = Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str, mode: FileMode| {
                    capability::create_file(fsys.as_ref(), name, mode)
                }
            }));
            delegator.write_file = Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str, data: &[u8], mode: FileMode| {
                    capability::write_file(fsys.as_ref(), name, data, mode)
                }
            }));
        }

        if caps.removable {
            delegator.remove_file = Some(Box::new({
                let fsys = Arc::clone(&fsys);
                move |name: &str| capability::remove_file(fsys.as_ref(), name)
            }));
            delegator.remove_all = Some(Box::new(
                move |path: &str| capability::remove_all(fsys.as_ref(), path),
            ));
        }

        delegator
    }
}

impl Debug for FsDelegator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FsDelegator")
            .field("open",        &self.open.is_some())
            .field("read_dir",    &self.read_dir.is_some())
            .field("read_file",   &self.read_file.is_some())
            .field("glob",        &self.glob.is_some())
            .field("stat",        &self.stat.is_some())
            .field("sub",         &self.sub.is_some())
            .field("mkdir_all",   &self.mkdir_all.is_some())
            .field("create_file", &self.create_file.is_some())
            .field("write_file",  &self.write_file.is_some())
            .field("remove_file", &self.remove_file.is_some())
            .field("remove_all",  &self.remove_all.is_some())
            .finish()
    }
}

impl Fs for FsDelegator {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        match &self.open {
            Some(open) => open(name),
            None       => Err(PathError::not_implemented(Op::Open, name).into()),
        }
    }

    fn read_dir(&self, name: &str) -> Result<Vec<Box<dyn DirEntry>>> {
        match &self.read_dir {
            Some(read_dir) => read_dir(name),
            None           => Err(PathError::not_implemented(Op::ReadDir, name).into()),
        }
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        match &self.read_file {
            Some(read_file) => read_file(name),
            None            => Err(PathError::not_implemented(Op::ReadFile, name).into()),
        }
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        match &self.glob {
            Some(glob) => glob(pattern),
            None       => Err(PathError::not_implemented(Op::Glob, pattern).into()),
        }
    }

    fn stat(&self, name: &str) -> Result<Box<dyn FileInfo>> {
        match &self.stat {
            Some(stat) => stat(name),
            None       => Err(PathError::not_implemented(Op::Stat, name).into()),
        }
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Fs>> {
        match &self.sub {
            Some(sub) => sub(dir),
            None      => Err(PathError::not_implemented(Op::Sub, dir).into()),
        }
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

impl WriteFileFs for FsDelegator {
    fn mkdir_all(&self, dir: &str, mode: FileMode) -> Result<()> {
        match &self.mkdir_all {
            Some(mkdir_all) => mkdir_all(dir, mode),
            None            => Ok(()),
        }
    }

    fn create_file(&self, name: &str, mode: FileMode) -> Result<Box<dyn WriterFile>> {
        match &self.create_file {
            Some(create_file) => create_file(name, mode),
            None              => Err(PathError::not_implemented(Op::CreateFile, name).into()),
        }
    }

    fn write_file(&self, name: &str, data: &[u8], mode: FileMode) -> Result<usize> {
        match &self.write_file {
            Some(write_file) => write_file(name, data, mode),
            None             => Err(PathError::not_implemented(Op::WriteFile, name).into()),
        }
    }
}

impl RemoveFileFs for FsDelegator {
    fn remove_file(&self, name: &str) -> Result<()> {
        match &self.remove_file {
            Some(remove_file) => remove_file(name),
            None              => Err(PathError::not_implemented(Op::RemoveFile, name).into()),
        }
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        match &self.remove_all {
            Some(remove_all) => remove_all(path),
            None             => Err(PathError::not_implemented(Op::RemoveAll, path).into()),
        }
    }
}

// ================================================================
//  Files
// ================================================================

/// A file handle which forwards every operation to an optional function.
///
/// Missing functions fail with [`Error::NotImplemented`], except for `close`, which succeeds.
#[derive(Default)]
pub struct FileDelegator {
    pub stat:     Option<FileStatFn>,
    pub read:     Option<FileReadFn>,
    pub close:    Option<FileCloseFn>,
    pub read_dir: Option<FileReadDirFn>,
    pub write:    Option<FileWriteFn>,
}

impl FileDelegator {
    /// Forward `stat`, `read`, `close`, and `read_dir` to `file`.
    #[must_use]
    pub fn delegate(file: Box<dyn File>) -> Self {
        Self::delegate_shared(&Arc::new(Mutex::new(file)))
    }

    /// Forward every operation, including `write`, to `file`.
    #[must_use]
    pub fn delegate_writer(file: Box<dyn WriterFile>) -> Self {
        let file = Arc::new(Mutex::new(file));
        let mut delegator = Self::delegate_shared(&file);
        delegator.write = Some(Box::new(move |buf: &[u8]| file.lock().write(buf)));
        delegator
    }

    fn delegate_shared<T>(file: &Arc<Mutex<Box<T>>>) -> Self
    where
        T: File + ?Sized + 'static,
    {
        Self {
            stat:     Some(Box::new({
                let file = Arc::clone(file);
                move || file.lock().stat()
            })),
            read:     Some(Box::new({
                let file = Arc::clone(file);
                move |buf: &mut [u8]| file.lock().read(buf)
            })),
            close:    Some(Box::new({
                let file = Arc::clone(file);
                move || file.lock().close()
            })),
            read_dir: Some(Box::new({
                let file = Arc::clone(file);
                move |n: usize| file.lock().read_dir(n)
            })),
            write:    None,
        }
    }
}

impl Debug for FileDelegator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FileDelegator")
            .field("stat",     &self.stat.is_some())
            .field("read",     &self.read.is_some())
            .field("close",    &self.close.is_some())
            .field("read_dir", &self.read_dir.is_some())
            .field("write",    &self.write.is_some())
            .finish()
    }
}

impl Read for FileDelegator {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.read {
            Some(read) => read(buf),
            None       => Err(Error::NotImplemented.into()),
        }
    }
}

impl Write for FileDelegator {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        match &mut self.write {
            Some(write) => write(buf),
            None        => Err(Error::NotImplemented.into()),
        }
    }

    #[inline]
    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl File for FileDelegator {
    fn stat(&self) -> Result<Box<dyn FileInfo>> {
        match &self.stat {
            Some(stat) => stat(),
            None       => Err(Error::NotImplemented),
        }
    }

    fn close(&mut self) -> Result<()> {
        match &mut self.close {
            Some(close) => close(),
            None        => Ok(()),
        }
    }

    fn read_dir(&mut self, n: usize) -> Result<Vec<Box<dyn DirEntry>>> {
        match &mut self.read_dir {
            Some(read_dir) => read_dir(n),
            None           => Err(Error::NotImplemented),
        }
    }
}

// ================================================================
//  Entry metadata
// ================================================================

/// A [`DirEntry`] made of plain values, with an optional function providing its
/// [`info`](DirEntry::info).
///
/// `info` calls `info_fn` if present, otherwise returns a copy of `info`, and otherwise fails
/// with [`Error::NotImplemented`].
#[derive(Default)]
pub struct DirEntryDelegator {
    pub name:      String,
    pub is_dir:    bool,
    pub file_type: FileMode,
    pub info:      Option<FileInfoDelegator>,
    pub info_fn:   Option<InfoFn>,
}

impl DirEntryDelegator {
    /// Describe the file or directory with the given metadata.
    #[must_use]
    pub fn from_info(info: &dyn FileInfo) -> Self {
        Self {
            name:      info.name().to_owned(),
            is_dir:    info.is_dir(),
            file_type: info.mode().file_type(),
            info:      Some(FileInfoDelegator::from_info(info)),
            info_fn:   None,
        }
    }

    /// Copy the name and type of `entry`, and forward `info` to it.
    #[must_use]
    pub fn delegate(entry: Box<dyn DirEntry>) -> Self {
        Self {
            name:      entry.name().to_owned(),
            is_dir:    entry.is_dir(),
            file_type: entry.file_type(),
            info:      None,
            info_fn:   Some(Box::new(move || entry.info())),
        }
    }
}

impl Debug for DirEntryDelegator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DirEntryDelegator")
            .field("name",      &self.name)
            .field("is_dir",    &self.is_dir)
            .field("file_type", &self.file_type)
            .field("info",      &self.info)
            .field("info_fn",   &self.info_fn.is_some())
            .finish()
    }
}

impl DirEntry for DirEntryDelegator {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn is_dir(&self) -> bool {
        self.is_dir
    }

    #[inline]
    fn file_type(&self) -> FileMode {
        self.file_type
    }

    fn info(&self) -> Result<Box<dyn FileInfo>> {
        if let Some(info_fn) = &self.info_fn {
            info_fn()
        } else if let Some(info) = &self.info {
            Ok(Box::new(info.clone()))
        } else {
            Err(Error::NotImplemented)
        }
    }
}

/// A [`FileInfo`] made of plain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfoDelegator {
    pub name:     String,
    pub size:     u64,
    pub mode:     FileMode,
    pub mod_time: SystemTime,
    pub is_dir:   bool,
}

impl FileInfoDelegator {
    /// Copy every value of `info`.
    #[must_use]
    pub fn from_info(info: &dyn FileInfo) -> Self {
        Self {
            name:     info.name().to_owned(),
            size:     info.size(),
            mode:     info.mode(),
            mod_time: info.mod_time(),
            is_dir:   info.is_dir(),
        }
    }
}

impl Default for FileInfoDelegator {
    fn default() -> Self {
        Self {
            name:     String::new(),
            size:     0,
            mode:     FileMode::default(),
            mod_time: SystemTime::UNIX_EPOCH,
            is_dir:   false,
        }
    }
}

impl FileInfo for FileInfoDelegator {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    fn mode(&self) -> FileMode {
        self.mode
    }

    #[inline]
    fn mod_time(&self) -> SystemTime {
        self.mod_time
    }

    #[inline]
    fn is_dir(&self) -> bool {
        self.is_dir
    }
}
