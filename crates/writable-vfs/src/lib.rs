// Main filesystem traits
mod fs_traits;
// Generic helpers built on top of the capability traits: capability queries, walking, globbing,
// and copying between filesystems.
mod capability;
// The error types shared by every filesystem implementation.
mod error;
// Permission and type bits of filesystem entries.
mod mode;

pub mod path;


// ================================
//  Filesystem implementations
// ================================

pub mod memory_fs;

#[cfg(feature = "os-fs")]
pub mod os_fs;

// Implementations of the traits which forward to user-provided functions.
pub mod delegator;

#[cfg(feature = "fstest")]
pub mod fstest;


// ================================
//  Re-exports
// ================================

/// Module containing all the traits defined in this crate. May be used as a prelude.
pub mod traits {
    pub use crate::fs_traits::{
        DirEntry, File, FileInfo, Fs, RemoveFileFs, WriteFileFs, WriterFile,
    };
}

pub use self::capability::{
    Capabilities, capabilities, copy_fs, create_file, glob, mkdir_all,
    remove_all, remove_file, walk_dir, write_file,
};
pub use self::error::{Cause, Error, Op, PathError, Result};
pub use self::mode::FileMode;

pub use self::memory_fs::{MemFile, MemoryFs};

#[cfg(feature = "os-fs")]
pub use self::os_fs::{OsFs, OsOps, StdOps};
