use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{BitAnd, BitOr, BitOrAssign};


/// The type and permission bits of a filesystem entry.
///
/// Only the directory type is distinguished; permission bits are recorded but never enforced.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Set on directories.
    pub const DIR: Self = Self(1 << 31);
    /// The Unix permission bits.
    pub const PERM: Self = Self(0o777);
    /// Mask of all type bits.
    pub const TYPE: Self = Self::DIR;

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(self) -> bool {
        self.0 & Self::DIR.0 != 0
    }

    #[inline]
    #[must_use]
    pub const fn perm(self) -> Self {
        Self(self.0 & Self::PERM.0)
    }

    #[inline]
    #[must_use]
    pub const fn file_type(self) -> Self {
        Self(self.0 & Self::TYPE.0)
    }

    #[inline]
    #[must_use]
    pub const fn with_dir(self) -> Self {
        Self(self.0 | Self::DIR.0)
    }

    #[inline]
    #[must_use]
    pub const fn without_dir(self) -> Self {
        Self(self.0 & !Self::DIR.0)
    }
}

impl From<u32> for FileMode {
    #[inline]
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl BitOr for FileMode {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileMode {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FileMode {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl Display for FileMode {
    /// Formats the mode like `ls -l`, e.g. `drwxr-xr-x` or `-rw-r--r--`.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        const RWX: &[u8; 9] = b"rwxrwxrwx";

        let mut out = [b'-'; 10];
        if self.is_dir() {
            out[0] = b'd';
        }
        for (idx, &letter) in RWX.iter().enumerate() {
            if self.0 & (1 << (8 - idx)) != 0 {
                out[idx + 1] = letter;
            }
        }

        // Every byte written above is ASCII.
        f.write_str(std::str::from_utf8(&out).map_err(|_| std::fmt::Error)?)
    }
}
