//! A read-only file system view over flat, key-based blob stores.
//! Presents object keys such as `dir1/hoge.txt` as files and directories, so blob data can be
//! walked and read through familiar open/read/seek/read_dir operations.
//!
//! ### Overview
//!
//! `blobfs` wraps any storage that implements the [`Bucket`] trait (a flat namespace of keys with
//! delimiter listings, attribute lookups and ranged reads) into a [`BlobFS`]. Directories are never
//! stored: a directory exists whenever some key starts with its path followed by `/`.
//! Two buckets ship with the crate: [`MapBucket`], which keeps objects in memory, and
//! [`DirBucket`], which serves the files below a host directory.
//!
//! **Key ideas**:
//! - **Read-only**: No operation writes to the bucket; handles only hold cursors.
//! - **Lazy**: Files are read with ranged requests on demand, nothing is cached.
//! - **Explicit end of data**: Reads return a [`Chunk`] and directory pages a [`DirBatch`], both
//!   carrying an `eof` flag next to the data.
//! - **Extensibility**: Plug in another object store by implementing [`Bucket`].
//! - **Clarity**: Errors name the operation and the path, e.g. `open dir1/nope.txt: file does not exist`.

mod core;
mod vfs;

pub mod blob;

pub use blob::{Attributes, BlobError, BlobResult, Bucket, DirBucket, ListObject, ListOptions, MapBucket};
pub use self::core::{Error, ErrorKind, Op, Result};
pub use vfs::{
    BlobFS, Chunk, DIR_MODE, DirBatch, Entry, EntryType, FILE_MODE, Handle, OpenDir, OpenFile,
    SEEK_CURRENT, SEEK_END, SEEK_START, is_not_exist, lookup,
};
