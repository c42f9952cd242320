//! A filesystem held entirely in memory, whose entries are indexed by sorted absolute paths.

mod entry;
mod file;
mod fs;
mod store;


pub use self::{entry::Entry, file::MemFile, fs::MemoryFs};
