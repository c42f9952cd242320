use std::sync::Arc;
use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use tracing::Level as LogLevel;

use crate::error::{Cause, Error, Op, PathError, Result};
use crate::fs_traits::{DirEntry, File, FileInfo};
use crate::mode::FileMode;
use super::{entry::Entry, fs::MemoryFs};


#[derive(Debug)]
enum Buffer {
    /// Opened on a directory; there is nothing to read or write.
    Directory,
    /// The contents of a file when it was opened.
    Snapshot(Arc<[u8]>),
    /// Contents which are committed to the filesystem on close.
    Pending(Vec<u8>),
}

/// A handle to a file or directory of a [`MemoryFs`].
///
/// Handles do not lock the filesystem while open. A handle returned by [`MemoryFs::open`] reads
/// the contents the file had when it was opened; a handle returned by [`MemoryFs::create_file`]
/// buffers writes until [`MemFile::close`] commits them with [`MemoryFs::write_file`].
///
/// Dropping a handle without closing it discards any buffered writes.
#[derive(Debug)]
pub struct MemFile {
    fsys:        MemoryFs,
    name:        String,
    mode:        FileMode,
    buffer:      Buffer,
    offset:      usize,
    wrote:       bool,
    dir_read:    bool,
    dir_entries: Vec<Entry>,
    dir_index:   usize,
}

impl MemFile {
    fn new(fsys: MemoryFs, name: &str, mode: FileMode, buffer: Buffer) -> Self {
        Self {
            fsys,
            name:        name.to_owned(),
            mode,
            buffer,
            offset:      0,
            wrote:       false,
            dir_read:    false,
            dir_entries: Vec::new(),
            dir_index:   0,
        }
    }

    #[inline]
    pub(super) fn directory(fsys: MemoryFs, name: &str, mode: FileMode) -> Self {
        Self::new(fsys, name, mode, Buffer::Directory)
    }

    #[inline]
    pub(super) fn snapshot(fsys: MemoryFs, name: &str, mode: FileMode, data: Arc<[u8]>) -> Self {
        Self::new(fsys, name, mode, Buffer::Snapshot(data))
    }

    #[inline]
    pub(super) fn writer(fsys: MemoryFs, name: &str, mode: FileMode) -> Self {
        Self::new(fsys, name, mode, Buffer::Pending(Vec::new()))
    }

    /// The name this handle was opened with.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the current entry of the file or directory this handle was opened on.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::stat`] does, e.g. if the entry was removed after being opened.
    pub fn stat(&self) -> Result<Entry> {
        self.fsys.stat(&self.name)
    }

    /// Commit any data written to this handle, replacing the contents of the file.
    ///
    /// Once anything has been written, every call to `close` commits the buffered data again.
    ///
    /// # Errors
    /// Propagates any error from [`MemoryFs::write_file`], such as the file having been replaced
    /// by a directory since it was created.
    pub fn close(&mut self) -> Result<()> {
        if !self.wrote {
            self.dir_entries = Vec::new();
            return Ok(());
        }

        let data: &[u8] = match &self.buffer {
            Buffer::Directory       => &[],
            Buffer::Snapshot(data)  => data,
            Buffer::Pending(data)   => data,
        };
        tracing::event!(
            LogLevel::TRACE,
            "MemFile `{}` committing {} bytes on close",
            self.name,
            data.len(),
        );
        self.fsys.write_file(&self.name, data, self.mode)?;
        Ok(())
    }

    /// Read the entries of the directory this handle was opened on, continuing from the previous
    /// call. The listing is fetched once, on the first call.
    ///
    /// If `n > 0`, at most `n` entries are returned, and [`Error::Eof`] is returned once the
    /// listing is exhausted. If `n == 0`, every remaining entry is returned, and an exhausted
    /// listing produces an empty `Vec`.
    ///
    /// # Errors
    /// Fails as [`MemoryFs::read_dir`] does on the first call, for instance with
    /// `ReadDir {name}: not a directory` on a file handle.
    pub fn read_dir(&mut self, n: usize) -> Result<Vec<Entry>> {
        if !self.dir_read {
            self.dir_read = true;
            self.dir_entries = self.fsys.read_dir(&self.name)?;
        }

        let remaining = self.dir_entries.get(self.dir_index..).unwrap_or_default();
        if remaining.is_empty() {
            return if n == 0 { Ok(Vec::new()) } else { Err(Error::Eof) };
        }

        let page_len = if n == 0 { remaining.len() } else { n.min(remaining.len()) };
        #[expect(
            clippy::indexing_slicing,
            reason = "`page_len <= remaining.len()`",
        )]
        let page = remaining[..page_len].to_vec();
        self.dir_index += page_len;

        Ok(page)
    }

    /// Read into `buf` from `data`, starting at `offset`. Returns the number of bytes read.
    fn read_at_offset(offset: usize, data: &[u8], buf: &mut [u8]) -> usize {
        let Some(source) = data.get(offset..) else {
            // The offset is past the end; we read zero bytes.
            return 0;
        };

        let read_len = source.len().min(buf.len());
        #[expect(
            clippy::indexing_slicing,
            reason = "`read_len` is at most either slice's length",
        )]
        buf[..read_len].copy_from_slice(&source[..read_len]);

        read_len
    }
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let data: &[u8] = match &self.buffer {
            Buffer::Directory => {
                let err = PathError::new(Op::Read, self.name.as_str(), Cause::IsADirectory);
                return Err(IoError::new(ErrorKind::IsADirectory, err));
            }
            Buffer::Snapshot(data) => data,
            Buffer::Pending(data)  => data,
        };

        let read_len = Self::read_at_offset(self.offset, data, buf);
        self.offset += read_len;
        Ok(read_len)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        if let Buffer::Snapshot(data) = &self.buffer {
            self.buffer = Buffer::Pending(data.to_vec());
        }

        let Buffer::Pending(pending) = &mut self.buffer else {
            let err = PathError::new(Op::Write, self.name.as_str(), Cause::IsADirectory);
            return Err(IoError::new(ErrorKind::IsADirectory, err));
        };

        pending.extend_from_slice(buf);
        self.wrote = true;
        Ok(buf.len())
    }

    /// Does nothing; written data is committed by [`MemFile::close`].
    #[inline]
    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl File for MemFile {
    fn stat(&self) -> Result<Box<dyn FileInfo>> {
        Ok(Box::new(Self::stat(self)?))
    }

    fn close(&mut self) -> Result<()> {
        Self::close(self)
    }

    fn read_dir(&mut self, n: usize) -> Result<Vec<Box<dyn DirEntry>>> {
        Ok(Self::read_dir(self, n)?
            .into_iter()
            .map(|entry| -> Box<dyn DirEntry> { Box::new(entry) })
            .collect())
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    fn fixture() -> MemoryFs {
        let fsys = MemoryFs::new();
        fsys.write_file("dir/a.txt", b"aaa", FileMode(0o644)).unwrap();
        fsys.write_file("dir/b.txt", b"bbb", FileMode(0o644)).unwrap();
        fsys.write_file("dir/c.txt", b"ccc", FileMode(0o644)).unwrap();
        fsys
    }

    #[test]
    fn read_in_small_chunks() {
        let fsys = MemoryFs::new();
        fsys.write_file("f.txt", b"hello world", FileMode(0o644)).unwrap();
        let mut file = fsys.open("f.txt").unwrap();

        let mut buf = [0; 4];
        assert_eq!(file.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"hell");
        assert_eq!(file.read(&mut buf).unwrap(), 4);
        assert_eq!(file.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"rld");
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_sees_snapshot() {
        let fsys = MemoryFs::new();
        fsys.write_file("f.txt", b"old", FileMode(0o644)).unwrap();
        let mut file = fsys.open("f.txt").unwrap();
        fsys.write_file("f.txt", b"new", FileMode(0o644)).unwrap();

        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "old");
    }

    #[test]
    fn read_directory_fails() {
        let fsys = fixture();
        let mut dir = fsys.open("dir").unwrap();

        let err = dir.read(&mut [0; 8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IsADirectory);
        assert_eq!(err.to_string(), "Read dir: is a directory");
        assert_eq!(dir.write(b"x").unwrap_err().kind(), ErrorKind::IsADirectory);
    }

    #[test]
    fn paged_read_dir() {
        let fsys = fixture();
        let mut dir = fsys.open("dir").unwrap();

        let names = |entries: Vec<Entry>| {
            entries.iter().map(|entry| entry.name().to_owned()).collect::<Vec<_>>()
        };

        assert_eq!(names(dir.read_dir(2).unwrap()), ["a.txt", "b.txt"]);
        assert_eq!(names(dir.read_dir(2).unwrap()), ["c.txt"]);
        assert!(dir.read_dir(2).unwrap_err().is_eof());
        assert!(dir.read_dir(0).unwrap().is_empty());
    }

    #[test]
    fn read_dir_all_at_once() {
        let fsys = fixture();
        let mut dir = fsys.open("dir").unwrap();

        assert_eq!(dir.read_dir(1).unwrap()[0].name(), "a.txt");
        assert_eq!(dir.read_dir(0).unwrap().len(), 2);
        assert!(dir.read_dir(0).unwrap().is_empty());
    }

    #[test]
    fn read_dir_listing_is_cached() {
        let fsys = fixture();
        let mut dir = fsys.open("dir").unwrap();

        assert_eq!(dir.read_dir(1).unwrap().len(), 1);
        fsys.write_file("dir/d.txt", b"ddd", FileMode(0o644)).unwrap();
        assert_eq!(dir.read_dir(0).unwrap().len(), 2);
    }

    #[test]
    fn read_dir_on_file() {
        let fsys = fixture();
        let mut file = fsys.open("dir/a.txt").unwrap();

        let err = file.read_dir(0).unwrap_err();
        assert!(err.is_not_a_directory());
        assert_eq!(err.to_string(), "ReadDir dir/a.txt: not a directory");
    }

    #[test]
    fn writes_are_committed_on_close() {
        let fsys = MemoryFs::new();
        let mut file = fsys.create_file("out/f.txt", FileMode(0o644)).unwrap();
        file.write_all(b"hello").unwrap();
        file.write_all(b",world").unwrap();

        assert_eq!(fsys.read_file("out/f.txt").unwrap(), b"");
        file.close().unwrap();
        assert_eq!(fsys.read_file("out/f.txt").unwrap(), b"hello,world");
    }

    #[test]
    fn writes_after_open_append_to_snapshot() {
        let fsys = MemoryFs::new();
        fsys.write_file("f.txt", b"abc", FileMode(0o644)).unwrap();

        let mut file = fsys.open("f.txt").unwrap();
        file.write_all(b"def").unwrap();
        file.close().unwrap();

        assert_eq!(fsys.read_file("f.txt").unwrap(), b"abcdef");
    }

    #[test]
    fn second_close_commits_again() {
        let fsys = MemoryFs::new();
        let mut file = fsys.create_file("f.txt", FileMode(0o644)).unwrap();
        file.write_all(b"from handle").unwrap();
        file.close().unwrap();

        fsys.write_file("f.txt", b"from fs", FileMode(0o644)).unwrap();
        file.close().unwrap();
        assert_eq!(fsys.read_file("f.txt").unwrap(), b"from handle");
    }

    #[test]
    fn drop_discards_writes() {
        let fsys = MemoryFs::new();
        {
            let mut file = fsys.create_file("f.txt", FileMode(0o644)).unwrap();
            file.write_all(b"lost").unwrap();
        }
        assert_eq!(fsys.read_file("f.txt").unwrap(), b"");
    }

    #[test]
    fn close_fails_if_replaced_by_directory() {
        let fsys = MemoryFs::new();
        let mut file = fsys.create_file("f", FileMode(0o644)).unwrap();
        file.write_all(b"data").unwrap();

        fsys.remove_file("f").unwrap();
        fsys.mkdir_all("f", FileMode(0o755)).unwrap();

        let err = file.close().unwrap_err();
        assert!(err.is_invalid());
        assert_eq!(err.to_string(), "Create f: invalid argument");
    }

    #[test]
    fn stat_through_handle() {
        let fsys = fixture();
        let file = fsys.open("dir/b.txt").unwrap();

        let info = File::stat(&file).unwrap();
        assert_eq!(info.name(), "b.txt");
        assert_eq!(info.size(), 3);
        assert!(!info.is_dir());
    }
}
