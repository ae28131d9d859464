//! Fixtures shared by the unit tests of the file system view.

use std::io::{self, Read};

use crate::blob::{Attributes, BlobError, BlobResult, Bucket, ListIter, ListOptions, MapBucket};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The sample tree: two root files, a nested directory and a sibling directory.
pub(crate) fn sample_bucket() -> MapBucket {
    let mut bucket = MapBucket::new();
    bucket.put("foo.txt", b"foo").unwrap();
    bucket.put("bar.txt", b"bar").unwrap();
    bucket.put("dir1/hoge.txt", b"hoge").unwrap();
    bucket.put("dir1/dir1-1/fuga.txt", b"fuga").unwrap();
    bucket.put("dir2/hello.txt", b"Hello, World!").unwrap();
    bucket
}

/// Wraps a bucket and injects failures into listings and ranged reads.
pub(crate) struct FaultyBucket {
    inner: MapBucket,
    list_after: Option<usize>,
    read_after: Option<u64>,
    end_early: bool,
}

impl FaultyBucket {
    pub(crate) fn new(inner: MapBucket) -> Self {
        Self {
            inner,
            list_after: None,
            read_after: None,
            end_early: false,
        }
    }

    /// Listings yield `n` items, then fail.
    pub(crate) fn fail_listing_after(mut self, n: usize) -> Self {
        self.list_after = Some(n);
        self
    }

    /// Reading any byte at or beyond absolute offset `n` fails.
    pub(crate) fn fail_reads_after(mut self, n: u64) -> Self {
        self.read_after = Some(n);
        self
    }

    /// Reads end quietly at absolute offset `n`, as if the object were `n` bytes long.
    pub(crate) fn end_reads_at(mut self, n: u64) -> Self {
        self.read_after = Some(n);
        self.end_early = true;
        self
    }
}

impl Bucket for FaultyBucket {
    fn list(&self, opts: &ListOptions) -> ListIter<'_> {
        let listing = self.inner.list(opts);
        match self.list_after {
            Some(n) => Box::new(listing.take(n).chain(std::iter::once(Err(BlobError::Backend(
                anyhow::anyhow!("listing interrupted"),
            ))))),
            None => listing,
        }
    }

    fn attributes(&self, key: &str) -> BlobResult<Attributes> {
        self.inner.attributes(key)
    }

    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>> {
        let reader = self.inner.range_reader(key, offset, length)?;
        match self.read_after {
            Some(n) => Ok(Box::new(FailingReader {
                inner: reader,
                allowance: n.saturating_sub(offset),
                end_early: self.end_early,
            })),
            None => Ok(reader),
        }
    }
}

struct FailingReader<R> {
    inner: R,
    allowance: u64,
    end_early: bool,
}

impl<R: Read> Read for FailingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.allowance == 0 {
            if self.end_early {
                return Ok(0);
            }
            return Err(io::Error::other("injected failure"));
        }
        let limit = usize::try_from(self.allowance).map_or(buf.len(), |a| a.min(buf.len()));
        let n = self.inner.read(&mut buf[..limit])?;
        self.allowance -= n as u64;
        Ok(n)
    }
}
