//! Open file handles: a resolved object plus a read cursor.
//!
//! Handles do no buffering; every read is a ranged read against the bucket. The cursor is a
//! plain field, so a handle is meant for a single owner. Share it behind a `Mutex` if several
//! threads must read through the same cursor.

use std::fmt;
use std::io::{self, Read, SeekFrom};

use log::{debug, trace};

use crate::blob::Bucket;
use crate::core::{Error, Op, Result};
use crate::vfs::Entry;

/// Reference point of [`OpenFile::seek_whence`]: the start of the file.
pub const SEEK_START: i32 = 0;
/// Reference point of [`OpenFile::seek_whence`]: the current cursor.
pub const SEEK_CURRENT: i32 = 1;
/// Reference point of [`OpenFile::seek_whence`]: the end of the file.
pub const SEEK_END: i32 = 2;

/// Outcome of a successful read: `len` bytes were written to the buffer, and `eof` reports
/// that no more data follows them.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub len: usize,
    pub eof: bool,
}

impl Chunk {
    fn data(len: usize) -> Chunk {
        Chunk { len, eof: false }
    }

    fn end(len: usize) -> Chunk {
        Chunk { len, eof: true }
    }
}

/// A file opened for reading.
pub struct OpenFile<'a, B: ?Sized> {
    entry: Entry,
    bucket: &'a B,
    offset: u64,
}

impl<'a, B: Bucket + ?Sized> OpenFile<'a, B> {
    pub(crate) fn new(entry: Entry, bucket: &'a B) -> Self {
        debug_assert!(entry.is_file());
        Self {
            entry,
            bucket,
            offset: 0,
        }
    }

    pub fn stat(&self) -> &Entry {
        &self.entry
    }

    /// Releases the handle. There is nothing to flush.
    pub fn close(self) -> Result<()> {
        Ok(())
    }

    /// Current cursor position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads up to `buf.len()` bytes at the cursor and advances it by the bytes read.
    ///
    /// - An empty `buf` is a no-op: `Chunk { len: 0, eof: false }`.
    /// - At or past the end: `Chunk { len: 0, eof: true }`.
    /// - If the object turns out shorter than its resolved size, the bytes that arrived come with
    ///   `eof`; a read that finds no byte at all fails with [`Error::Truncated`].
    /// - A backend failure after some bytes arrived is an [`Error::ShortRead`] carrying the
    ///   count; the cursor has moved past those bytes.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<Chunk> {
        if buf.is_empty() {
            return Ok(Chunk::default());
        }
        if self.offset >= self.entry.size() {
            return Ok(Chunk::end(0));
        }

        let transfer = self.range_read(buf, self.offset)?;
        self.offset += transfer.len() as u64;
        match transfer {
            Transfer::Complete(n) => Ok(Chunk::data(n)),
            Transfer::Ended(0) => Err(self.truncated(self.offset)),
            Transfer::Ended(n) => Ok(Chunk::end(n)),
            Transfer::Failed(n, e) => Err(self.short_read(n, e)),
        }
    }

    /// Reads up to `buf.len()` bytes at `offset` without touching the cursor.
    ///
    /// Reaching exactly the end of the file reports `eof` together with the bytes read, so a
    /// buffer sized to the file is filled in one call that also signals the end. An object
    /// shorter than its resolved size behaves as in [`read`](Self::read).
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<Chunk> {
        if buf.is_empty() {
            return Ok(Chunk::default());
        }
        if offset >= self.entry.size() {
            return Ok(Chunk::end(0));
        }

        let transfer = self.range_read(buf, offset)?;
        if offset + transfer.len() as u64 == self.entry.size() {
            return Ok(Chunk::end(transfer.len()));
        }
        match transfer {
            Transfer::Complete(n) => Ok(Chunk::data(n)),
            Transfer::Ended(0) => Err(self.truncated(offset)),
            Transfer::Ended(n) => Ok(Chunk::end(n)),
            Transfer::Failed(n, e) => Err(self.short_read(n, e)),
        }
    }

    /// Moves the cursor. The target must lie in `[0, size]`; otherwise the cursor is left
    /// unchanged and [`Error::SeekRange`] is returned.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => (0, i128::from(offset)),
            SeekFrom::Current(delta) => (self.offset, i128::from(delta)),
            SeekFrom::End(delta) => (self.entry.size(), i128::from(delta)),
        };
        self.seek_to(base, delta)
    }

    /// Like [`seek`](Self::seek), with a raw reference point ([`SEEK_START`], [`SEEK_CURRENT`]
    /// or [`SEEK_END`]). Any other `whence` is rejected with [`Error::SeekRange`].
    pub fn seek_whence(&mut self, offset: i64, whence: i32) -> Result<u64> {
        let base = match whence {
            SEEK_START => 0,
            SEEK_CURRENT => self.offset,
            SEEK_END => self.entry.size(),
            _ => return Err(Error::SeekRange.with_path(Op::Seek, self.entry.path())),
        };
        self.seek_to(base, i128::from(offset))
    }

    fn seek_to(&mut self, base: u64, delta: i128) -> Result<u64> {
        let target = i128::from(base) + delta;
        if target < 0 || target > i128::from(self.entry.size()) {
            return Err(Error::SeekRange.with_path(Op::Seek, self.entry.path()));
        }
        self.offset = target as u64;
        Ok(self.offset)
    }

    /// Issues one ranged read at `offset`, never past the end of the entry, and drains it into
    /// `buf`.
    fn range_read(&self, buf: &mut [u8], offset: u64) -> Result<Transfer> {
        let remaining = self.entry.size() - offset;
        let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let buf = &mut buf[..want];

        trace!("range read {} [{}; +{})", self.entry.path(), offset, want);
        let mut reader = self
            .bucket
            .range_reader(self.entry.path(), offset, want as u64)
            .map_err(|e| Error::from(e).with_path(Op::Read, self.entry.path()))?;

        let mut read = 0;
        while read < buf.len() {
            match reader.read(&mut buf[read..]) {
                Ok(0) => {
                    let at = offset + read as u64;
                    debug!("{} ended at {} of {} bytes", self.entry.path(), at, self.entry.size());
                    return Ok(Transfer::Ended(read));
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Ok(Transfer::Failed(read, Error::Backend(e.into()))),
            }
        }
        Ok(Transfer::Complete(read))
    }

    /// The object ended at `at`, before its resolved size.
    fn truncated(&self, at: u64) -> Error {
        Error::Truncated {
            read: usize::try_from(at).unwrap_or(usize::MAX),
            expected: self.entry.size(),
        }
        .with_path(Op::Read, self.entry.path())
    }

    fn short_read(&self, read: usize, cause: Error) -> Error {
        let err = if read == 0 {
            cause
        } else {
            Error::ShortRead {
                read,
                source: Box::new(cause),
            }
        };
        err.with_path(Op::Read, self.entry.path())
    }
}

/// How a single ranged read finished.
enum Transfer {
    /// Every requested byte arrived.
    Complete(usize),
    /// The backend stream ended early.
    Ended(usize),
    /// The backend failed after the given number of bytes.
    Failed(usize, Error),
}

impl Transfer {
    fn len(&self) -> usize {
        match self {
            Transfer::Complete(n) | Transfer::Ended(n) | Transfer::Failed(n, _) => *n,
        }
    }
}

impl<B: ?Sized> fmt::Debug for OpenFile<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFile")
            .field("entry", &self.entry)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<B: Bucket + ?Sized> io::Read for OpenFile<'_, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match OpenFile::read(self, buf) {
            Ok(chunk) => Ok(chunk.len),
            // hand out what arrived; the failure surfaces again on the next call
            Err(e) => match e.bytes_read() {
                Some(read) => Ok(read),
                None => Err(e.into()),
            },
        }
    }
}

impl<B: Bucket + ?Sized> io::Seek for OpenFile<'_, B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        OpenFile::seek(self, pos).map_err(io::Error::from)
    }
}
