//! This module provides the read-only file system view over a [`Bucket`].
//!
//! ### Key Features:
//! - **Synthetic directories**: `dir1` is a directory as soon as some key starts with `dir1/`;
//!   nothing has to be stored for the directory itself.
//! - **Strict paths**: Paths are relative and slash-separated; `.` is the root. Paths with a
//!   leading or trailing `/`, empty, `.` or `..` segments are rejected.
//! - **Ranged reads**: File handles read through ranged backend requests and never buffer.
//! - **Snapshots**: Directory handles list their children once, at open time.

use std::fmt;

use crate::blob::Bucket;
use crate::core::{Error, ErrorKind, Op, Result};
use crate::vfs::resolver::lookup;
use crate::vfs::{Chunk, Entry, OpenDir, OpenFile};

/// A handle returned by [`BlobFS::open`]: either an open file or an open directory.
pub enum Handle<'a, B: ?Sized> {
    File(OpenFile<'a, B>),
    Dir(OpenDir),
}

impl<'a, B: Bucket + ?Sized> Handle<'a, B> {
    pub fn stat(&self) -> &Entry {
        match self {
            Handle::File(file) => file.stat(),
            Handle::Dir(dir) => dir.stat(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Dir(_))
    }

    /// Reads at the cursor of a file; directories fail with [`Error::IsDir`].
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Chunk> {
        match self {
            Handle::File(file) => file.read(buf),
            Handle::Dir(dir) => dir.read(buf),
        }
    }

    pub fn close(self) -> Result<()> {
        match self {
            Handle::File(file) => file.close(),
            Handle::Dir(dir) => dir.close(),
        }
    }

    pub fn as_file(&mut self) -> Result<&mut OpenFile<'a, B>> {
        match self {
            Handle::File(file) => Ok(file),
            Handle::Dir(dir) => Err(Error::IsDir.with_path(Op::Read, dir.stat().path())),
        }
    }

    pub fn as_dir(&mut self) -> Result<&mut OpenDir> {
        match self {
            Handle::Dir(dir) => Ok(dir),
            Handle::File(file) => Err(Error::NotDir.with_path(Op::Read, file.stat().path())),
        }
    }

    pub fn into_file(self) -> Result<OpenFile<'a, B>> {
        match self {
            Handle::File(file) => Ok(file),
            Handle::Dir(dir) => Err(Error::IsDir.with_path(Op::Read, dir.stat().path())),
        }
    }

    pub fn into_dir(self) -> Result<OpenDir> {
        match self {
            Handle::Dir(dir) => Ok(dir),
            Handle::File(file) => Err(Error::NotDir.with_path(Op::Read, file.stat().path())),
        }
    }
}

impl<B: ?Sized> fmt::Debug for Handle<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::File(file) => f.debug_tuple("File").field(file).finish(),
            Handle::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
        }
    }
}

/// A read-only file system over the objects of a [`Bucket`].
///
/// `BlobFS` owns the bucket for its whole lifetime; the handles it opens borrow it and are
/// owned by the caller. All operations are synchronous and block on backend round trips.
///
/// ### Thread Safety
///
/// `BlobFS` adds no locking. It can be shared between threads whenever the bucket can, but each
/// handle carries its own cursor and is meant for a single owner.
///
/// ### Example
///
/// ```
/// use blobfs::{BlobFS, MapBucket};
///
/// let mut bucket = MapBucket::new();
/// bucket.put("foo.txt", b"foo").unwrap();
/// bucket.put("dir1/hoge.txt", b"hoge").unwrap();
///
/// let fs = BlobFS::new(bucket);
///
/// let names: Vec<_> = fs
///     .read_dir(".")
///     .unwrap()
///     .iter()
///     .map(|e| e.name().to_string())
///     .collect();
/// assert_eq!(names, ["dir1", "foo.txt"]);
///
/// assert_eq!(fs.read_file("dir1/hoge.txt").unwrap(), b"hoge");
/// assert!(fs.read_file("dir1").is_err());
/// ```
pub struct BlobFS<B> {
    bucket: B,
}

impl<B: Bucket> BlobFS<B> {
    pub fn new(bucket: B) -> Self {
        Self { bucket }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    pub fn into_inner(self) -> B {
        self.bucket
    }

    /// Opens `name` for reading.
    ///
    /// Directories are listed right away; files cost no backend call beyond resolution.
    /// Failures are reported as `open <name>: <cause>`.
    pub fn open(&self, name: &str) -> Result<Handle<'_, B>> {
        let entry = lookup(&self.bucket, name).map_err(|e| e.with_path(Op::Open, name))?;
        if entry.is_dir() {
            let dir = OpenDir::new(entry, &self.bucket).map_err(|e| e.with_path(Op::Open, name))?;
            return Ok(Handle::Dir(dir));
        }
        Ok(Handle::File(OpenFile::new(entry, &self.bucket)))
    }

    /// Resolves `name` without listing directory contents.
    pub fn stat(&self, name: &str) -> Result<Entry> {
        lookup(&self.bucket, name).map_err(|e| e.with_path(Op::Open, name))
    }

    /// Reads the whole content of the file `name` with a single ranged read.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let file = match self.open(name)? {
            Handle::File(file) => file,
            Handle::Dir(_) => return Err(Error::IsDir.with_path(Op::Read, name)),
        };

        let size = file.stat().size();
        let truncated = |read| Error::Truncated { read, expected: size }.with_path(Op::Read, name);
        let len = usize::try_from(size).map_err(|_| truncated(0))?;
        let mut content = vec![0; len];
        if content.is_empty() {
            return Ok(content);
        }

        let chunk = file.read_at(&mut content, 0)?;
        if !chunk.eof || chunk.len != content.len() {
            return Err(truncated(chunk.len));
        }
        Ok(content)
    }

    /// Returns every entry of the directory `name`, in backend order.
    pub fn read_dir(&self, name: &str) -> Result<Vec<Entry>> {
        let mut dir = match self.open(name)? {
            Handle::Dir(dir) => dir,
            Handle::File(_) => return Err(Error::NotDir.with_path(Op::Read, name)),
        };
        Ok(dir.read_dir(-1).entries)
    }

    /// Checks if `name` resolves to a file or a directory.
    /// Backend failures count as absence.
    pub fn exists(&self, name: &str) -> bool {
        self.stat(name).is_ok()
    }

    /// Checks if `name` is a directory. Fails if `name` does not exist.
    pub fn is_dir(&self, name: &str) -> Result<bool> {
        Ok(self.stat(name)?.is_dir())
    }

    /// Checks if `name` is a file. Fails if `name` does not exist.
    pub fn is_file(&self, name: &str) -> Result<bool> {
        Ok(self.stat(name)?.is_file())
    }

    /// Returns every entry below `name`, recursively, in pre-order.
    ///
    /// The starting directory itself is not included. A file yields just itself.
    ///
    /// # Example:
    /// ```
    /// use blobfs::{BlobFS, MapBucket};
    ///
    /// let mut bucket = MapBucket::new();
    /// bucket.put("project/main.rs", b"fn main() {}").unwrap();
    /// bucket.put("project/src/lib.rs", b"mod utils;").unwrap();
    ///
    /// let fs = BlobFS::new(bucket);
    /// let paths: Vec<_> = fs
    ///     .tree(".")
    ///     .unwrap()
    ///     .into_iter()
    ///     .map(|e| e.path().to_string())
    ///     .collect();
    /// assert_eq!(paths, ["project", "project/main.rs", "project/src", "project/src/lib.rs"]);
    /// ```
    pub fn tree(&self, name: &str) -> Result<Vec<Entry>> {
        let entry = self.stat(name)?;
        if entry.is_file() {
            return Ok(vec![entry]);
        }
        let mut entries = Vec::new();
        self.walk(entry, &mut entries)?;
        Ok(entries)
    }

    fn walk(&self, dir: Entry, out: &mut Vec<Entry>) -> Result<()> {
        let path = dir.path().to_string();
        let mut handle = OpenDir::new(dir, &self.bucket).map_err(|e| e.with_path(Op::Open, path))?;
        for child in handle.read_dir(-1).entries {
            out.push(child.clone());
            if child.is_dir() {
                self.walk(child, out)?;
            }
        }
        Ok(())
    }
}

impl<B> fmt::Debug for BlobFS<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobFS").finish_non_exhaustive()
    }
}

/// Reports whether `err` is the "does not exist" condition.
pub fn is_not_exist(err: &Error) -> bool {
    err.kind() == ErrorKind::NotExist
}
