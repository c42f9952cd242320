use std::sync::Arc;
use std::time::SystemTime;

use crate::{error::Result, mode::FileMode};
use crate::fs_traits::{DirEntry, FileInfo};


/// A file or directory stored in a [`MemoryFs`].
///
/// The same record serves as both the [`FileInfo`] and the [`DirEntry`] of the file or directory.
/// Cloning an `Entry` is cheap; the data is shared, and is only ever replaced, never mutated.
///
/// [`MemoryFs`]: super::MemoryFs
#[derive(Debug, Clone)]
pub struct Entry {
    name:     String,
    data:     Arc<[u8]>,
    mode:     FileMode,
    mod_time: SystemTime,
    is_dir:   bool,
}

impl Entry {
    /// A file named `name`. The directory bit of `mode` is ignored.
    #[must_use]
    pub fn file(name: impl Into<String>, data: Arc<[u8]>, mode: FileMode) -> Self {
        Self {
            name:     name.into(),
            data,
            mode:     mode.without_dir(),
            mod_time: SystemTime::now(),
            is_dir:   false,
        }
    }

    /// An empty directory named `name`. The directory bit is added to `mode`.
    #[must_use]
    pub fn directory(name: impl Into<String>, mode: FileMode) -> Self {
        Self {
            name:     name.into(),
            data:     Arc::from(Vec::new()),
            mode:     mode.with_dir(),
            mod_time: SystemTime::now(),
            is_dir:   true,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.is_dir
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> FileMode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub const fn mod_time(&self) -> SystemTime {
        self.mod_time
    }

    /// The contents of the file. Empty for directories.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// Replace the contents of the file, and bump its modification time.
    pub(super) fn set_data(&mut self, data: Arc<[u8]>) {
        self.data = data;
        self.mod_time = SystemTime::now();
    }
}

impl FileInfo for Entry {
    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn size(&self) -> u64 {
        if self.is_dir {
            0
        } else {
            u64::try_from(self.data.len()).unwrap_or(u64::MAX)
        }
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

impl DirEntry for Entry {
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
        self.mode.file_type()
    }

    fn info(&self) -> Result<Box<dyn FileInfo>> {
        Ok(Box::new(self.clone()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn dir_bit_agrees_with_is_dir() {
        let file = Entry::file("a.txt", Arc::from(&b"abc"[..]), FileMode(0o644) | FileMode::DIR);
        assert!(!file.is_dir());
        assert!(!file.mode().is_dir());
        assert_eq!(FileInfo::size(&file), 3);

        let dir = Entry::directory("a", FileMode(0o755));
        assert!(dir.is_dir());
        assert!(dir.mode().is_dir());
        assert_eq!(FileInfo::size(&dir), 0);
        assert_eq!(DirEntry::file_type(&dir), FileMode::DIR);
    }

    #[test]
    fn info_is_a_snapshot() {
        let mut file = Entry::file("a.txt", Arc::from(&b"abc"[..]), FileMode(0o644));
        let info = DirEntry::info(&file).unwrap();
        file.set_data(Arc::from(&b"abcdef"[..]));

        assert_eq!(info.name(), "a.txt");
        assert_eq!(info.size(), 3);
        assert_eq!(FileInfo::size(&file), 6);
    }
}
