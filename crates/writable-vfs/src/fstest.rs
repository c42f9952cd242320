//! Checks that a filesystem implementation behaves consistently, for use in the tests of
//! implementations and of their users.
//!
//! ```
//! use writable_vfs::{FileMode, MemoryFs, fstest};
//!
//! let fsys = MemoryFs::new();
//! fsys.write_file("dir0/file01.txt", b"content01", FileMode(0o644)).unwrap();
//!
//! fstest::check_fs(&fsys, &["dir0", "dir0/file01.txt"]).unwrap();
//! fstest::check_write_file_fs(&fsys, "tmp").unwrap();
//! ```

use std::collections::BTreeSet;
use std::io::Write as _;

use thiserror::Error;

use crate::path;
use crate::capability;
use crate::error::Error;
use crate::fs_traits::{File, Fs, WriterFile};
use crate::mode::FileMode;


/// A failed check, naming the path it failed at.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct CheckError {
    pub path:    String,
    pub message: String,
}

impl CheckError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path:    path.to_owned(),
            message: message.into(),
        }
    }
}

/// The chunks written to every file created by [`check_write_file_fs`].
const WRITES: [&[u8]; 2] = [b"hello", b",world"];

/// Check the write and remove capabilities of `fsys` within the directory `tmp_dir`, which
/// should not exist or be empty.
///
/// The check creates `file.txt` and `dir/file.txt`, and checks that `dir`,
/// `dir/file.txt/invalid`, and `file.txt/.` cannot be created. It rewrites `dir/file.txt`, reads
/// back every file it wrote through [`Fs::open`], then removes `file.txt` with
/// [`remove_file`](capability::remove_file) and `dir` with [`remove_all`](capability::remove_all).
///
/// # Errors
/// Returns the first failed expectation.
pub fn check_write_file_fs(fsys: &dyn Fs, tmp_dir: &str) -> Result<(), CheckError> {
    let cases = [
        ("file.txt",             true),
        ("dir/file.txt",         true),
        // Already exists, as a directory.
        ("dir",                  false),
        // `dir/file.txt` is a file.
        ("dir/file.txt/invalid", false),
        ("file.txt/.",           false),
        ("dir/file.txt",         true),
    ];

    for (name, should_succeed) in cases {
        let name = path::join_rel(tmp_dir, name);
        let created = capability::create_file(fsys, &name, FileMode::PERM);

        match (created, should_succeed) {
            (Ok(file), true) => check_file_write(fsys, file, &name)?,
            (Err(err), true) => {
                return Err(CheckError::new(&name, format!("create_file: {err}")));
            }
            (Ok(mut file), false) => {
                let _ignored = file.close();
                return Err(CheckError::new(&name, "create_file returned no error"));
            }
            (Err(_), false) => {}
        }
    }

    let file_txt = path::join_rel(tmp_dir, "file.txt");
    capability::remove_file(fsys, &file_txt)
        .map_err(|err| CheckError::new(&file_txt, format!("remove_file: {err}")))?;

    let dir = path::join_rel(tmp_dir, "dir");
    capability::remove_all(fsys, &dir)
        .map_err(|err| CheckError::new(&dir, format!("remove_all: {err}")))?;

    for removed in [&file_txt, &dir] {
        match fsys.stat(removed) {
            Err(err) if err.is_not_exist() => {}
            Err(err) => return Err(CheckError::new(removed, format!("stat after removal: {err}"))),
            Ok(_)    => return Err(CheckError::new(removed, "still exists after removal")),
        }
    }

    Ok(())
}

fn check_file_write(
    fsys:     &dyn Fs,
    mut file: Box<dyn WriterFile>,
    name:     &str,
) -> Result<(), CheckError> {
    let mut written = 0;
    for chunk in WRITES {
        match file.write(chunk) {
            Ok(len) => written += len,
            Err(err) => {
                let _ignored = file.close();
                return Err(CheckError::new(name, format!("write: {err}")));
            }
        }
    }
    file.close().map_err(|err| CheckError::new(name, format!("close: {err}")))?;

    let expected = WRITES.concat();
    if written != expected.len() {
        return Err(CheckError::new(
            name,
            format!("wrote {written} bytes, expected {}", expected.len()),
        ));
    }

    let mut reader = fsys.open(name).map_err(|err| CheckError::new(name, format!("open: {err}")))?;
    let read_back = read_in_chunks(reader.as_mut(), name);
    let _ignored = reader.close();

    if read_back? != expected {
        return Err(CheckError::new(name, "read back different contents than were written"));
    }
    Ok(())
}

/// Read `file` to its end a few bytes at a time.
fn read_in_chunks(file: &mut dyn File, name: &str) -> Result<Vec<u8>, CheckError> {
    let mut contents = Vec::new();
    let mut chunk = [0; 3];
    loop {
        match file.read(&mut chunk) {
            Ok(0) => return Ok(contents),
            Ok(len) => contents.extend_from_slice(chunk.get(..len).unwrap_or_default()),
            Err(err) => return Err(CheckError::new(name, format!("read: {err}"))),
        }
    }
}

/// Check that the contents of `fsys` are self-consistent, and that every path in `expected`
/// exists.
///
/// Every directory's [`Fs::read_dir`] listing must be sorted, and must list the same names as
/// paging through [`File::read_dir`] on a handle to it. Every file's [`Fs::read_file`] contents
/// must match what its handle reads, and the size reported by [`Fs::stat`].
///
/// # Errors
/// Returns the first failed expectation.
pub fn check_fs(fsys: &dyn Fs, expected: &[&str]) -> Result<(), CheckError> {
    let mut found = BTreeSet::new();
    check_dir(fsys, ".", &mut found)?;

    for &name in expected {
        fsys.stat(name).map_err(|err| CheckError::new(name, format!("stat: {err}")))?;
        if !found.contains(name) {
            return Err(CheckError::new(name, "expected path was not found by walking"));
        }
    }
    Ok(())
}

fn check_dir(fsys: &dyn Fs, dir: &str, found: &mut BTreeSet<String>) -> Result<(), CheckError> {
    let entries = fsys.read_dir(dir)
        .map_err(|err| CheckError::new(dir, format!("read_dir: {err}")))?;
    let names = entries.iter().map(|entry| entry.name().to_owned()).collect::<Vec<_>>();

    if !names.is_sorted() {
        return Err(CheckError::new(dir, format!("read_dir is not sorted: {names:?}")));
    }

    let paged = read_dir_paged(fsys, dir)?;
    if paged != names {
        return Err(CheckError::new(
            dir,
            format!("paged read_dir listed {paged:?}, but read_dir listed {names:?}"),
        ));
    }

    for entry in entries {
        let name = path::join_rel(dir, entry.name());
        if entry.is_dir() {
            check_dir(fsys, &name, found)?;
        } else {
            check_file(fsys, &name)?;
        }
        found.insert(name);
    }
    Ok(())
}

/// List a directory two entries at a time through a handle.
fn read_dir_paged(fsys: &dyn Fs, dir: &str) -> Result<Vec<String>, CheckError> {
    let mut handle = fsys.open(dir).map_err(|err| CheckError::new(dir, format!("open: {err}")))?;
    let mut names = Vec::new();

    let result = loop {
        match handle.read_dir(2) {
            Ok(page) if page.is_empty() => {
                break Err(CheckError::new(dir, "read_dir(2) returned an empty page before EOF"));
            }
            Ok(page) => names.extend(page.iter().map(|entry| entry.name().to_owned())),
            Err(Error::Eof) => break Ok(names),
            Err(err) => break Err(CheckError::new(dir, format!("read_dir(2): {err}"))),
        }
    };

    let _ignored = handle.close();
    result
}

fn check_file(fsys: &dyn Fs, name: &str) -> Result<(), CheckError> {
    let data = fsys.read_file(name)
        .map_err(|err| CheckError::new(name, format!("read_file: {err}")))?;

    let mut handle = fsys.open(name).map_err(|err| CheckError::new(name, format!("open: {err}")))?;
    let read = read_in_chunks(handle.as_mut(), name);
    let _ignored = handle.close();
    if read? != data {
        return Err(CheckError::new(name, "read_file and reading a handle disagree"));
    }

    let info = fsys.stat(name).map_err(|err| CheckError::new(name, format!("stat: {err}")))?;
    if usize::try_from(info.size()).ok() != Some(data.len()) {
        return Err(CheckError::new(
            name,
            format!(
                "stat reports size {}, but read_file returned {} bytes",
                info.size(),
                data.len(),
            ),
        ));
    }
    if info.is_dir() {
        return Err(CheckError::new(name, "stat reports a directory, but read_dir did not"));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use crate::MemoryFs;
    use crate::delegator::OpenFsDelegator;
    use super::*;


    #[test]
    fn memory_fs_passes() {
        let fsys = MemoryFs::new();
        for name in ["a.txt", "b/c.txt", "b/d.txt", "b/e/f.txt", "g/h.txt"] {
            fsys.write_file(name, name.as_bytes(), FileMode(0o644)).unwrap();
        }

        check_fs(&fsys, &["a.txt", "b", "b/e/f.txt"]).unwrap();
        check_write_file_fs(&fsys, "tmp").unwrap();
        check_write_file_fs(&fsys, ".").unwrap();
        check_fs(&fsys, &["b/e"]).unwrap();
    }

    #[test]
    fn missing_expected_path() {
        let fsys = MemoryFs::new();
        let err = check_fs(&fsys, &["nope"]).unwrap_err();
        assert_eq!(err.path, "nope");
        assert!(err.message.starts_with("stat: "), "{err}");
    }

    #[test]
    fn read_only_fs_fails_write_check() {
        let fsys = OpenFsDelegator::delegate(MemoryFs::new());
        let err = check_write_file_fs(&fsys, "tmp").unwrap_err();
        assert_eq!(err.path, "tmp/file.txt");
        assert_eq!(err.message, "create_file: CreateFile tmp/file.txt: not implemented");
    }
}
