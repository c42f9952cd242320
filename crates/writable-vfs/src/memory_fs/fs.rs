use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level as LogLevel;

use crate::path;
use crate::error::{Cause, Op, PathError, Result};
use crate::fs_traits::{
    DirEntry, File, FileInfo, Fs, RemoveFileFs, WriteFileFs, WriterFile, check_path,
};
use crate::mode::FileMode;
use super::{entry::Entry, file::MemFile};
use super::store::{ROOT, Store};


/// The mode of the root directory of a new [`MemoryFs`].
const ROOT_MODE: FileMode = FileMode(0o755);

/// A filesystem held entirely in memory.
///
/// A `MemoryFs` is a view onto a store of entries, rooted at some directory of that store. The
/// filesystem returned by [`MemoryFs::new`] is rooted at the top of a fresh store; views returned
/// by [`MemoryFs::sub`] share the store of the filesystem they came from, so writes through one
/// are visible through the other. Cloning a `MemoryFs` returns another handle to the same view.
///
/// Every operation locks the store for its duration. The lock is shared by every view onto the
/// store, so operations through a parent filesystem and through its sub-filesystems are also
/// mutually exclusive.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    /// The key of this view's root directory.
    dir:   String,
    store: Arc<Mutex<Store>>,
}

impl Default for MemoryFs {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create an empty filesystem, containing only its root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Store::new();
        store.put(ROOT.to_owned(), Entry::directory(".", ROOT_MODE));

        Self {
            dir:   ROOT.to_owned(),
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// The absolute location of this view's root within the underlying store; `/` unless this
    /// filesystem was returned by [`MemoryFs::sub`].
    #[inline]
    #[must_use]
    pub fn root(&self) -> &str {
        &self.dir
    }

    /// Whether `self` and `other` are views onto the same store.
    #[inline]
    #[must_use]
    pub fn shares_store_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    /// The store key of a name relative to this view.
    fn key(&self, name: &str) -> String {
        path::join(&self.dir, name)
    }

    /// The name, relative to this view, of a key beneath this view's root.
    fn rel(&self, key: &str) -> String {
        let rel = if self.dir == ROOT {
            key.strip_prefix('/')
        } else {
            key.strip_prefix(self.dir.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
        };

        match rel {
            Some("") | None => ".".to_owned(),
            Some(rel)       => rel.to_owned(),
        }
    }

    /// Validate `name` and look up its entry. Both failures are reported as [`Op::Open`] errors.
    fn lookup<'s>(&self, store: &'s Store, name: &str) -> Result<&'s Entry, PathError> {
        check_path(Op::Open, name)?;
        store.get(&self.key(name)).ok_or_else(|| PathError::not_exist(Op::Open, name))
    }

    /// Create `dir` and any missing parents, walking down from the root of the store.
    fn mkdir_all_locked(
        &self,
        store: &mut Store,
        dir:   &str,
        mode:  FileMode,
    ) -> Result<(), PathError> {
        check_path(Op::MkdirAll, dir)?;

        let key = self.key(dir);
        let mut ancestor = String::with_capacity(key.len());

        Self::ensure_dir(store, ROOT, ".", mode, dir)?;
        for elem in key.split('/').filter(|elem| !elem.is_empty()) {
            ancestor.push('/');
            ancestor.push_str(elem);
            Self::ensure_dir(store, &ancestor, elem, mode, dir)?;
        }

        Ok(())
    }

    fn ensure_dir(
        store:     &mut Store,
        key:       &str,
        name:      &str,
        mode:      FileMode,
        requested: &str,
    ) -> Result<(), PathError> {
        match store.get(key) {
            Some(entry) if entry.is_dir() => Ok(()),
            // Cannot create a directory through a file.
            Some(_) => Err(PathError::invalid(Op::MkdirAll, requested)),
            None => {
                store.put(key.to_owned(), Entry::directory(name, mode));
                Ok(())
            }
        }
    }

    /// Ensure the file `name` exists, creating it (empty) and its parent directories if needed.
    /// Returns its key.
    fn create_locked(
        &self,
        store: &mut Store,
        name:  &str,
        mode:  FileMode,
    ) -> Result<String, PathError> {
        check_path(Op::Create, name)?;
        self.mkdir_all_locked(store, path::dir(name), mode)?;

        let key = self.key(name);
        match store.get(&key) {
            Some(entry) if entry.is_dir() => return Err(PathError::invalid(Op::Create, name)),
            Some(_) => {},
            None => {
                let entry = Entry::file(path::base(&key), Arc::from(Vec::new()), mode);
                store.put(key.clone(), entry);
            }
        }

        Ok(key)
    }
}

impl MemoryFs {
    /// Open the file or directory at `name`.
    ///
    /// A file handle reads from a snapshot of the file's contents taken now; later writes to the
    /// file are not observed through the handle.
    ///
    /// # Errors
    /// `Open {name}: invalid argument` if `name` is not a valid path, and
    /// `Open {name}: file does not exist` if nothing exists there.
    pub fn open(&self, name: &str) -> Result<MemFile> {
        let store = self.store.lock();
        let entry = self.lookup(&store, name)?;

        let file = if entry.is_dir() {
            MemFile::directory(self.clone(), name, entry.mode())
        } else {
            MemFile::snapshot(self.clone(), name, entry.mode(), Arc::clone(entry.data()))
        };
        Ok(file)
    }

    /// Return the names, relative to this filesystem, of every entry matching `pattern`, in
    /// lexical order. `*`, `?`, and `[...]` never match `/`.
    ///
    /// # Errors
    /// Returns [`Error::BadPattern`] if `pattern` is malformed.
    ///
    /// [`Error::BadPattern`]: crate::Error::BadPattern
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let store = self.store.lock();
        let keys = store.prefix_glob_keys(&self.dir, pattern)?;
        Ok(keys.into_iter().map(|key| self.rel(key)).collect())
    }

    /// Return the entries of the directory at `name`, sorted by name.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::open`] does, and with `ReadDir {name}: not a directory` if `name`
    /// is a file.
    pub fn read_dir(&self, name: &str) -> Result<Vec<Entry>> {
        let store = self.store.lock();
        let entry = self.lookup(&store, name)?;
        if !entry.is_dir() {
            return Err(PathError::new(Op::ReadDir, name, Cause::NotADirectory).into());
        }

        let children = store.prefix_keys(&self.key(name))
            .into_iter()
            .filter_map(|key| store.get(key))
            .cloned()
            .collect();
        Ok(children)
    }

    /// Return a copy of the contents of the file at `name`.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::open`] does, and with `ReadFile {name}: invalid argument` if `name`
    /// is a directory.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        self.read_file_shared(name).map(|data| data.to_vec())
    }

    /// Return the contents of the file at `name` without copying them.
    ///
    /// Writes to the file replace its contents rather than modifying them, so the returned
    /// buffer never changes.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::read_file`] does.
    pub fn read_file_shared(&self, name: &str) -> Result<Arc<[u8]>> {
        let store = self.store.lock();
        let entry = self.lookup(&store, name)?;
        if entry.is_dir() {
            return Err(PathError::invalid(Op::ReadFile, name).into());
        }
        Ok(Arc::clone(entry.data()))
    }

    /// Return the entry at `name`, which doubles as its [`FileInfo`].
    ///
    /// # Errors
    /// Fails as [`MemoryFs::open`] does.
    pub fn stat(&self, name: &str) -> Result<Entry> {
        let store = self.store.lock();
        Ok(self.lookup(&store, name)?.clone())
    }

    /// Return a view of this filesystem rooted at the directory `dir`, sharing the same store.
    ///
    /// # Errors
    /// `Sub {dir}: invalid argument` if `dir` is not a valid path or is a file, and
    /// `Open {dir}: file does not exist` if nothing exists there.
    pub fn sub(&self, dir: &str) -> Result<Self> {
        check_path(Op::Sub, dir)?;

        let store = self.store.lock();
        if !self.lookup(&store, dir)?.is_dir() {
            return Err(PathError::invalid(Op::Sub, dir).into());
        }

        let sub_dir = self.key(dir);
        tracing::event!(
            LogLevel::DEBUG,
            "MemoryFs at `{}` opened sub-filesystem `{sub_dir}`",
            self.dir,
        );

        Ok(Self {
            dir:   sub_dir,
            store: Arc::clone(&self.store),
        })
    }

    /// Create the directory `dir` and any missing parents, each with `mode` and the directory
    /// bit. Existing directories are left untouched.
    ///
    /// # Errors
    /// `MkdirAll {dir}: invalid argument` if `dir` is not a valid path, or if it or one of its
    /// parents is a file.
    pub fn mkdir_all(&self, dir: &str, mode: FileMode) -> Result<()> {
        let mut store = self.store.lock();
        self.mkdir_all_locked(&mut store, dir, mode)?;
        Ok(())
    }

    /// Create the file `name` (empty, unless it already exists) along with its parent
    /// directories, and return a handle which writes to it.
    ///
    /// Data written to the handle is committed when the handle is [closed](MemFile::close),
    /// replacing the file's contents.
    ///
    /// # Errors
    /// `Create {name}: invalid argument` if `name` is not a valid path or is a directory, and any
    /// error from creating the parent directories.
    pub fn create_file(&self, name: &str, mode: FileMode) -> Result<MemFile> {
        let mut store = self.store.lock();
        self.create_locked(&mut store, name, mode)?;
        Ok(MemFile::writer(self.clone(), name, mode))
    }

    /// Replace the contents of `name` with a copy of `data`, creating it and its parent
    /// directories if necessary. Returns `data.len()`.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::create_file`] does.
    pub fn write_file(&self, name: &str, data: &[u8], mode: FileMode) -> Result<usize> {
        self.write_file_shared(name, Arc::from(data), mode)
    }

    /// Replace the contents of `name` with `data`, as [`MemoryFs::write_file`] does, without
    /// copying.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::create_file`] does.
    pub fn write_file_shared(&self, name: &str, data: Arc<[u8]>, mode: FileMode) -> Result<usize> {
        let mut store = self.store.lock();
        let key = self.create_locked(&mut store, name, mode)?;

        let len = data.len();
        if let Some(entry) = store.get_mut(&key) {
            entry.set_data(data);
        }
        Ok(len)
    }

    /// Remove the entry at `name`. Removing a nonexistent entry succeeds.
    ///
    /// Only `name` itself is removed; see [`MemoryFs::remove_all`] to remove a directory and its
    /// contents.
    ///
    /// # Errors
    /// `RemoveFile {name}: invalid argument` if `name` is not a valid path.
    pub fn remove_file(&self, name: &str) -> Result<()> {
        check_path(Op::RemoveFile, name)?;

        let key = self.key(name);
        if self.store.lock().remove(&key).is_some() {
            tracing::event!(LogLevel::TRACE, "MemoryFs removed `{key}`");
        }
        Ok(())
    }

    /// Remove the entry at `path` and everything beneath it. Removing a nonexistent entry
    /// succeeds.
    ///
    /// The root directory of the store is emptied but never removed.
    ///
    /// # Errors
    /// `RemoveAll {path}: invalid argument` if `path` is not a valid path.
    pub fn remove_all(&self, path: &str) -> Result<()> {
        check_path(Op::RemoveAll, path)?;

        let key = self.key(path);
        let removed = self.store.lock().remove_all(&key);
        tracing::event!(
            LogLevel::TRACE,
            "MemoryFs removed {removed} entries at and below `{key}`",
        );
        Ok(())
    }
}

impl Fs for MemoryFs {
    fn open(&self, name: &str) -> Result<Box<dyn File>> {
        Ok(Box::new(Self::open(self, name)?))
    }

    fn read_dir(&self, name: &str) -> Result<Vec<Box<dyn DirEntry>>> {
        Ok(Self::read_dir(self, name)?
            .into_iter()
            .map(|entry| -> Box<dyn DirEntry> { Box::new(entry) })
            .collect())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        Self::read_file(self, name)
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        Self::glob(self, pattern)
    }

    fn stat(&self, name: &str) -> Result<Box<dyn FileInfo>> {
        Ok(Box::new(Self::stat(self, name)?))
    }

    fn sub(&self, dir: &str) -> Result<Box<dyn Fs>> {
        Ok(Box::new(Self::sub(self, dir)?))
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

impl WriteFileFs for MemoryFs {
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

impl RemoveFileFs for MemoryFs {
    fn remove_file(&self, name: &str) -> Result<()> {
        Self::remove_file(self, name)
    }

    fn remove_all(&self, path: &str) -> Result<()> {
        Self::remove_all(self, path)
    }
}
