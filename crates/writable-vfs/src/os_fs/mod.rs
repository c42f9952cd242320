//! A filesystem backed by a directory on disk.

mod file;
mod fs;
mod ops;


pub use self::{
    file::{OsDirEntry, OsFile, OsFileInfo, OsWriterFile},
    fs::OsFs,
    ops::{OsOps, StdOps},
};
