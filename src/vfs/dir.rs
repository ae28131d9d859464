//! Open directory handles.
//!
//! The children of a directory are listed once, when the handle is opened, and then paged out
//! of that snapshot. Later changes in the bucket are not reflected.

use log::debug;

use crate::blob::{BlobResult, Bucket, ListOptions};
use crate::core::{Error, Op, Result};
use crate::vfs::{Chunk, Entry};

/// A page of directory entries. `eof` reports that the directory is exhausted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirBatch {
    pub entries: Vec<Entry>,
    pub eof: bool,
}

/// A directory opened for enumeration.
#[derive(Debug)]
pub struct OpenDir {
    entry: Entry,
    children: Vec<Entry>,
    offset: usize,
}

impl OpenDir {
    /// Lists the immediate children of `entry`, in backend order. A listing failure aborts
    /// the whole construction.
    pub(crate) fn new<B: Bucket + ?Sized>(entry: Entry, bucket: &B) -> Result<OpenDir> {
        debug_assert!(entry.is_dir());
        let children = bucket
            .list(&ListOptions::new(entry.child_prefix()))
            .map(|item| item.map(Entry::from))
            .collect::<BlobResult<Vec<_>>>()?;
        debug!("listed {} children of {:?}", children.len(), entry.name());

        Ok(OpenDir {
            entry,
            children,
            offset: 0,
        })
    }

    pub fn stat(&self) -> &Entry {
        &self.entry
    }

    /// Releases the handle. There is nothing to flush.
    pub fn close(self) -> Result<()> {
        Ok(())
    }

    /// Directories are not byte-readable: always fails with [`Error::IsDir`].
    pub fn read(&self, _buf: &mut [u8]) -> Result<Chunk> {
        Err(Error::IsDir.with_path(Op::Read, self.entry.path()))
    }

    /// Returns the next children.
    ///
    /// - `n > 0`: at most `n` entries; `eof` is set when fewer than `n` were left (an empty
    ///   batch with `eof` once the directory is exhausted).
    /// - `n <= 0`: every remaining entry, never with `eof` (an empty batch when none remain).
    pub fn read_dir(&mut self, n: isize) -> DirBatch {
        let remaining = self.remaining();
        let count = match usize::try_from(n) {
            Ok(n) if n > 0 => n.min(remaining),
            _ => remaining,
        };
        let entries = self.children[self.offset..self.offset + count].to_vec();
        self.offset += count;

        DirBatch {
            eof: n > 0 && count < n.unsigned_abs(),
            entries,
        }
    }

    /// Number of children not returned yet.
    pub fn remaining(&self) -> usize {
        self.children.len() - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::vfs::resolver::lookup;
    use crate::vfs::testing::{FaultyBucket, init_logger, sample_bucket};

    fn open<B: Bucket>(bucket: &B, name: &str) -> Result<OpenDir> {
        init_logger();
        OpenDir::new(lookup(bucket, name)?, bucket)
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.path()).collect()
    }

    mod listing {
        use super::*;

        #[test]
        fn test_root_children() -> Result<()> {
            let bucket = sample_bucket();
            let mut dir = open(&bucket, ".")?;

            let batch = dir.read_dir(-1);
            assert!(!batch.eof);
            assert_eq!(names(&batch.entries), vec!["bar.txt", "dir1", "dir2", "foo.txt"]);
            let dirs: Vec<_> = batch
                .entries
                .iter()
                .filter(|e| e.is_dir())
                .map(|e| e.path())
                .collect();
            assert_eq!(dirs, vec!["dir1", "dir2"]);
            Ok(())
        }

        #[test]
        fn test_only_immediate_children() -> Result<()> {
            let bucket = sample_bucket();
            let mut dir = open(&bucket, "dir1")?;

            let batch = dir.read_dir(0);
            assert_eq!(names(&batch.entries), vec!["dir1/dir1-1", "dir1/hoge.txt"]);
            assert!(batch.entries[0].is_dir());
            assert_eq!(batch.entries[0].name(), "dir1-1");
            assert!(batch.entries[1].is_file());
            assert_eq!(batch.entries[1].size(), 4);
            Ok(())
        }

        #[test]
        fn test_listing_failure_aborts_open() {
            let bucket = FaultyBucket::new(sample_bucket()).fail_listing_after(2);
            let err = open(&bucket, ".").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Backend);
            assert!(err.to_string().contains("listing interrupted"));
        }

        #[test]
        fn test_snapshot_ignores_later_changes() -> Result<()> {
            let mut bucket = sample_bucket();
            let mut dir = open(&bucket, "dir1")?;

            bucket.put("dir1/late.txt", b"late").unwrap();

            assert_eq!(dir.read_dir(-1).entries.len(), 2);
            assert_eq!(open(&bucket, "dir1")?.read_dir(-1).entries.len(), 3);
            Ok(())
        }
    }

    mod paging {
        use super::*;

        #[test]
        fn test_read_dir_pages_then_eof() -> Result<()> {
            let bucket = sample_bucket();
            let mut dir = open(&bucket, ".")?;

            let first = dir.read_dir(3);
            assert_eq!(names(&first.entries), vec!["bar.txt", "dir1", "dir2"]);
            assert!(!first.eof);

            let second = dir.read_dir(3);
            assert_eq!(names(&second.entries), vec!["foo.txt"]);
            assert!(second.eof, "fewer than requested signals the end");

            let third = dir.read_dir(3);
            assert!(third.entries.is_empty());
            assert!(third.eof);
            Ok(())
        }

        #[test]
        fn test_read_dir_exact_page_then_eof() -> Result<()> {
            let bucket = sample_bucket();
            let mut dir = open(&bucket, "dir1")?;

            let page = dir.read_dir(2);
            assert_eq!(page.entries.len(), 2);
            assert!(!page.eof);

            let last = dir.read_dir(2);
            assert!(last.entries.is_empty());
            assert!(last.eof);
            Ok(())
        }

        #[test]
        fn test_read_dir_all_twice() -> Result<()> {
            let bucket = sample_bucket();
            let mut dir = open(&bucket, ".")?;

            assert_eq!(dir.read_dir(-1).entries.len(), 4);
            assert_eq!(dir.remaining(), 0);

            let again = dir.read_dir(-1);
            assert_eq!(again, DirBatch::default());
            Ok(())
        }

        #[test]
        fn test_read_dir_all_after_partial_page() -> Result<()> {
            let bucket = sample_bucket();
            let mut dir = open(&bucket, ".")?;

            dir.read_dir(1);
            let rest = dir.read_dir(-1);
            assert_eq!(names(&rest.entries), vec!["dir1", "dir2", "foo.txt"]);
            assert!(!rest.eof);
            Ok(())
        }
    }

    #[test]
    fn test_read_is_a_directory() -> Result<()> {
        let bucket = sample_bucket();
        let dir = open(&bucket, "dir2")?;

        let err = dir.read(&mut [0u8; 8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongKind);
        assert_eq!(err.to_string(), "read dir2: is a directory");
        assert_eq!(dir.stat().name(), "dir2");
        assert_eq!(dir.stat(), dir.stat());
        dir.close()
    }
}
