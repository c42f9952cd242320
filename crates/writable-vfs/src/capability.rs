use std::io;

use glob::{Pattern, PatternError};
use tracing::Level as LogLevel;

use crate::path;
use crate::delegator::DirEntryDelegator;
use crate::error::{Error, Op, PathError, Result};
use crate::fs_traits::{DirEntry, Fs, WriterFile};
use crate::mode::FileMode;


/// Which optional capabilities a filesystem provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub writable:  bool,
    pub removable: bool,
}

impl Capabilities {
    /// Whether the filesystem provides neither the write nor the remove capability.
    #[inline]
    #[must_use]
    pub const fn read_only(self) -> bool {
        !self.writable && !self.removable
    }
}

/// Query which optional capabilities `fsys` provides.
#[must_use]
pub fn capabilities(fsys: &dyn Fs) -> Capabilities {
    Capabilities {
        writable:  fsys.as_write_fs().is_some(),
        removable: fsys.as_remove_fs().is_some(),
    }
}

// ================================================================
//  Capability-checked operations
// ================================================================

/// Create `dir` and any missing parents on `fsys`.
///
/// # Errors
/// `MkdirAll {dir}: not implemented` if `fsys` lacks the write capability; otherwise, any error
/// from [`WriteFileFs::mkdir_all`].
///
/// [`WriteFileFs::mkdir_all`]: crate::traits::WriteFileFs::mkdir_all
pub fn mkdir_all(fsys: &dyn Fs, dir: &str, mode: FileMode) -> Result<()> {
    match fsys.as_write_fs() {
        Some(write_fs) => write_fs.mkdir_all(dir, mode),
        None           => Err(PathError::not_implemented(Op::MkdirAll, dir).into()),
    }
}

/// Create the file `name` on `fsys`, returning a handle to write to it.
///
/// # Errors
/// `CreateFile {name}: not implemented` if `fsys` lacks the write capability; otherwise, any
/// error from [`WriteFileFs::create_file`].
///
/// [`WriteFileFs::create_file`]: crate::traits::WriteFileFs::create_file
pub fn create_file(fsys: &dyn Fs, name: &str, mode: FileMode) -> Result<Box<dyn WriterFile>> {
    match fsys.as_write_fs() {
        Some(write_fs) => write_fs.create_file(name, mode),
        None           => Err(PathError::not_implemented(Op::CreateFile, name).into()),
    }
}

/// Replace the contents of `name` on `fsys` with `data`.
///
/// # Errors
/// `WriteFile {name}: not implemented` if `fsys` lacks the write capability; otherwise, any
/// error from [`WriteFileFs::write_file`].
///
/// [`WriteFileFs::write_file`]: crate::traits::WriteFileFs::write_file
pub fn write_file(fsys: &dyn Fs, name: &str, data: &[u8], mode: FileMode) -> Result<usize> {
    match fsys.as_write_fs() {
        Some(write_fs) => write_fs.write_file(name, data, mode),
        None           => Err(PathError::not_implemented(Op::WriteFile, name).into()),
    }
}

/// Remove the entry at `name` on `fsys`.
///
/// # Errors
/// `RemoveFile {name}: not implemented` if `fsys` lacks the remove capability; otherwise, any
/// error from [`RemoveFileFs::remove_file`].
///
/// [`RemoveFileFs::remove_file`]: crate::traits::RemoveFileFs::remove_file
pub fn remove_file(fsys: &dyn Fs, name: &str) -> Result<()> {
    match fsys.as_remove_fs() {
        Some(remove_fs) => remove_fs.remove_file(name),
        None            => Err(PathError::not_implemented(Op::RemoveFile, name).into()),
    }
}

/// Remove the entry at `path` on `fsys`, and everything beneath it.
///
/// # Errors
/// `RemoveAll {path}: not implemented` if `fsys` lacks the remove capability; otherwise, any
/// error from [`RemoveFileFs::remove_all`].
///
/// [`RemoveFileFs::remove_all`]: crate::traits::RemoveFileFs::remove_all
pub fn remove_all(fsys: &dyn Fs, path: &str) -> Result<()> {
    match fsys.as_remove_fs() {
        Some(remove_fs) => remove_fs.remove_all(path),
        None            => Err(PathError::not_implemented(Op::RemoveAll, path).into()),
    }
}

// ================================================================
//  Walking, globbing, and copying
// ================================================================

/// Visit `root` and everything beneath it, in lexical pre-order: each directory is visited
/// before its entries, which are visited in order of name.
///
/// `visit` receives the name of each entry (joined onto `root`) and the entry itself. The root
/// is described by an entry built from [`Fs::stat`].
///
/// # Errors
/// The walk stops at the first error, from either `fsys` or `visit`, and returns it.
pub fn walk_dir<F>(fsys: &dyn Fs, root: &str, mut visit: F) -> Result<()>
where
    F: FnMut(&str, &dyn DirEntry) -> Result<()>,
{
    let root_info = fsys.stat(root)?;
    let root_entry = DirEntryDelegator::from_info(root_info.as_ref());
    walk(fsys, root, &root_entry, &mut visit)
}

fn walk<F>(fsys: &dyn Fs, name: &str, entry: &dyn DirEntry, visit: &mut F) -> Result<()>
where
    F: FnMut(&str, &dyn DirEntry) -> Result<()>,
{
    visit(name, entry)?;
    if !entry.is_dir() {
        return Ok(());
    }

    for child in fsys.read_dir(name)? {
        let child_name = path::join_rel(name, child.name());
        walk(fsys, &child_name, child.as_ref(), visit)?;
    }
    Ok(())
}

/// Return the names of every entry of `fsys` matching the shell-style `pattern`, using
/// [`Fs::glob`].
///
/// # Errors
/// Returns [`Error::BadPattern`] if `pattern` is malformed, even if `fsys` would have matched
/// nothing.
pub fn glob(fsys: &dyn Fs, pattern: &str) -> Result<Vec<String>> {
    check_pattern(pattern)?;
    fsys.glob(pattern)
}

/// The default implementation of [`Fs::glob`], in terms of [`Fs::read_dir`] and [`Fs::stat`].
///
/// Directory elements of the pattern which contain wildcards are expanded recursively. Errors
/// from reading directories are ignored, so that unreadable directories simply match nothing.
pub(crate) fn glob_with_read_dir<F>(fsys: &F, pattern: &str) -> Result<Vec<String>>
where
    F: Fs + ?Sized,
{
    check_pattern(pattern)?;

    if !path::has_meta(pattern) {
        return Ok(if fsys.stat(pattern).is_ok() {
            vec![pattern.to_owned()]
        } else {
            Vec::new()
        });
    }

    let (dir, file) = path::split(pattern);
    let dir = if dir.is_empty() { "." } else { dir };
    let file = path::compile_pattern(file)?;

    let mut matches = Vec::new();
    if path::has_meta(dir) {
        for matched_dir in glob_with_read_dir(fsys, dir)? {
            glob_in_dir(fsys, &matched_dir, &file, &mut matches);
        }
    } else {
        glob_in_dir(fsys, dir, &file, &mut matches);
    }
    Ok(matches)
}

fn glob_in_dir<F>(fsys: &F, dir: &str, pattern: &Pattern, matches: &mut Vec<String>)
where
    F: Fs + ?Sized,
{
    let Ok(entries) = fsys.read_dir(dir) else {
        return;
    };

    matches.extend(
        entries
            .iter()
            .filter(|entry| pattern.matches_with(entry.name(), path::MATCH_OPTIONS))
            .map(|entry| path::join_rel(dir, entry.name())),
    );
}

fn check_pattern(pattern: &str) -> Result<(), PatternError> {
    path::compile_pattern(pattern).map(|_| ())
}

/// Copy `root` and everything beneath it from `src` to `dest`, at the same names.
///
/// Directories are created with [`mkdir_all`], and files with [`create_file`]; both receive the
/// type bits of the source entry as their mode. Each destination file is closed after copying,
/// and an error from closing it is returned.
///
/// # Errors
/// The copy stops at the first error and returns it. In particular, `dest` must provide the
/// write capability.
pub fn copy_fs(dest: &dyn Fs, src: &dyn Fs, root: &str) -> Result<()> {
    walk_dir(src, root, |name, entry| {
        tracing::event!(LogLevel::TRACE, "copy_fs copying `{name}`");

        if entry.is_dir() {
            return mkdir_all(dest, name, entry.file_type());
        }

        let mut src_file = src.open(name)?;
        let mut dest_file = create_file(dest, name, entry.file_type())?;

        let copied = io::copy(&mut src_file, &mut dest_file);
        let dest_closed = dest_file.close();
        let src_closed = src_file.close();

        copied.map_err(Error::from)?;
        dest_closed?;
        src_closed
    })
}
