mod blob_fs;
mod dir;
mod entry;
mod file;
mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use blob_fs::{BlobFS, Handle, is_not_exist};
pub use dir::{DirBatch, OpenDir};
pub use entry::{DIR_MODE, Entry, EntryType, FILE_MODE};
pub use file::{Chunk, OpenFile, SEEK_CURRENT, SEEK_END, SEEK_START};
pub use resolver::lookup;
