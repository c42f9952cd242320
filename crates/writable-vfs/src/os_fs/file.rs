use std::fs::{self, DirEntry as StdDirEntry, File as StdFile, Metadata};
use std::io::{BufWriter, Error as IoError, ErrorKind, Read, Result as IoResult, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use cfg_if::cfg_if;
use tracing::Level as LogLevel;

use crate::path;
use crate::error::{Cause, Error, Op, PathError, Result};
use crate::fs_traits::{DirEntry, File, FileInfo};
use crate::mode::FileMode;


// ================================================================
//  Metadata
// ================================================================

/// A snapshot of the metadata of a file or directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsFileInfo {
    name:     String,
    size:     u64,
    mode:     FileMode,
    mod_time: SystemTime,
}

impl OsFileInfo {
    pub(super) fn from_metadata(name: &str, metadata: &Metadata) -> Self {
        let mode = permissions(metadata);
        Self {
            name:     name.to_owned(),
            size:     metadata.len(),
            mode:     if metadata.is_dir() { mode.with_dir() } else { mode },
            mod_time: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// Stat `path`, reporting the result under the final element of `name`.
    pub(super) fn stat(op: Op, name: &str, path: &Path) -> Result<Self, PathError> {
        let metadata = fs::metadata(path).map_err(|err| PathError::from_io(op, name, err))?;
        Ok(Self::from_metadata(path::base(name), &metadata))
    }
}

fn permissions(metadata: &Metadata) -> FileMode {
    cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::fs::PermissionsExt as _;

            FileMode(metadata.permissions().mode()).perm()
        } else {
            if metadata.permissions().readonly() {
                FileMode(0o444)
            } else {
                FileMode(0o666)
            }
        }
    }
}

impl FileInfo for OsFileInfo {
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
        self.mode.is_dir()
    }
}

/// An entry of a directory on disk.
#[derive(Debug)]
pub struct OsDirEntry {
    name:   String,
    is_dir: bool,
    entry:  StdDirEntry,
}

impl OsDirEntry {
    pub(super) fn new(entry: StdDirEntry) -> IoResult<Self> {
        Ok(Self {
            name:   entry.file_name().to_string_lossy().into_owned(),
            is_dir: entry.file_type()?.is_dir(),
            entry,
        })
    }
}

impl DirEntry for OsDirEntry {
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
        if self.is_dir { FileMode::DIR } else { FileMode(0) }
    }

    fn info(&self) -> Result<Box<dyn FileInfo>> {
        let metadata = self.entry
            .metadata()
            .map_err(|err| PathError::from_io(Op::Stat, self.name.as_str(), err))?;
        Ok(Box::new(OsFileInfo::from_metadata(&self.name, &metadata)))
    }
}

/// Read the entries of the directory at `path`, sorted by name.
pub(super) fn read_dir_sorted(name: &str, path: &Path) -> Result<Vec<OsDirEntry>> {
    let to_err = |err: IoError| PathError::from_io(Op::ReadDir, name, err);

    let mut entries = fs::read_dir(path)
        .map_err(to_err)?
        .map(|entry| entry.and_then(OsDirEntry::new))
        .collect::<IoResult<Vec<_>>>()
        .map_err(to_err)?;

    entries.sort_unstable_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
    Ok(entries)
}

// ================================================================
//  Files
// ================================================================

#[derive(Debug)]
enum Handle {
    Directory,
    File(StdFile),
}

/// A handle to a file or directory on disk, opened for reading.
#[derive(Debug)]
pub struct OsFile {
    name:        String,
    path:        PathBuf,
    handle:      Handle,
    dir_read:    bool,
    dir_entries: Vec<OsDirEntry>,
}

impl OsFile {
    pub(super) fn open(name: &str, path: PathBuf) -> Result<Self> {
        let to_err = |err: IoError| PathError::from_io(Op::Open, name, err);

        let metadata = fs::metadata(&path).map_err(to_err)?;
        let handle = if metadata.is_dir() {
            Handle::Directory
        } else {
            Handle::File(StdFile::open(&path).map_err(to_err)?)
        };

        Ok(Self {
            name: name.to_owned(),
            path,
            handle,
            dir_read:    false,
            dir_entries: Vec::new(),
        })
    }
}

impl Read for OsFile {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.handle {
            Handle::File(file) => file.read(buf),
            Handle::Directory => {
                let err = PathError::new(Op::Read, self.name.as_str(), Cause::IsADirectory);
                Err(IoError::new(ErrorKind::IsADirectory, err))
            }
        }
    }
}

impl File for OsFile {
    fn stat(&self) -> Result<Box<dyn FileInfo>> {
        Ok(Box::new(OsFileInfo::stat(Op::Stat, &self.name, &self.path)?))
    }

    fn close(&mut self) -> Result<()> {
        self.dir_entries = Vec::new();
        Ok(())
    }

    /// Pages through the directory listing, which is read from disk on the first call.
    fn read_dir(&mut self, n: usize) -> Result<Vec<Box<dyn DirEntry>>> {
        if matches!(self.handle, Handle::File(_)) {
            let err = PathError::new(Op::ReadDir, self.name.as_str(), Cause::NotADirectory);
            return Err(err.into());
        }
        if !self.dir_read {
            self.dir_read = true;
            // Reversed, so that pages can be popped off the end.
            self.dir_entries = read_dir_sorted(&self.name, &self.path)?;
            self.dir_entries.reverse();
        }

        if self.dir_entries.is_empty() {
            return if n == 0 { Ok(Vec::new()) } else { Err(Error::Eof) };
        }

        let page_len = if n == 0 { self.dir_entries.len() } else { n.min(self.dir_entries.len()) };
        let split_at = self.dir_entries.len() - page_len;

        Ok(self.dir_entries
            .drain(split_at..)
            .rev()
            .map(|entry| -> Box<dyn DirEntry> { Box::new(entry) })
            .collect())
    }
}

/// A buffered handle to a file on disk, opened for writing by [`OsFs::create_file`].
///
/// Dropping the handle flushes it; an error from that flush can only be logged. Call
/// [`File::close`] to observe it.
///
/// [`OsFs::create_file`]: super::OsFs::create_file
#[derive(Debug)]
pub struct OsWriterFile {
    name:   String,
    path:   PathBuf,
    writer: Option<BufWriter<StdFile>>,
}

impl OsWriterFile {
    pub(super) fn new(name: &str, path: PathBuf, file: StdFile) -> Self {
        Self {
            name:   name.to_owned(),
            path,
            writer: Some(BufWriter::new(file)),
        }
    }

    fn closed_error(&self, op: Op) -> IoError {
        Error::from(PathError::invalid(op, self.name.as_str())).into()
    }
}

impl Read for OsWriterFile {
    /// Reads from the current position, after flushing any buffered writes.
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let Some(writer) = &mut self.writer else {
            return Err(self.closed_error(Op::Read));
        };
        writer.flush()?;
        writer.get_mut().read(buf)
    }
}

impl Write for OsWriterFile {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        match &mut self.writer {
            Some(writer) => writer.write(buf),
            None         => Err(self.closed_error(Op::Write)),
        }
    }

    fn flush(&mut self) -> IoResult<()> {
        match &mut self.writer {
            Some(writer) => writer.flush(),
            None         => Ok(()),
        }
    }
}

impl File for OsWriterFile {
    fn stat(&self) -> Result<Box<dyn FileInfo>> {
        Ok(Box::new(OsFileInfo::stat(Op::Stat, &self.name, &self.path)?))
    }

    /// Flush buffered writes and release the file. Closing a closed handle does nothing.
    fn close(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.flush().map_err(|err| PathError::from_io(Op::Write, self.name.as_str(), err))?;
        Ok(())
    }
}

impl Drop for OsWriterFile {
    fn drop(&mut self) {
        if let Some(writer) = &mut self.writer {
            if let Err(err) = writer.flush() {
                tracing::event!(
                    LogLevel::DEBUG,
                    "OsWriterFile `{}` dropped without closing, and flushing failed: {err}",
                    self.name,
                );
            }
        }
    }
}
