//! The blob-store capability consumed by the file system view.
//!
//! A [`Bucket`] is a flat key-value object store. Hierarchy exists only by convention: keys use
//! `/` as a separator, and a delimiter listing collapses every key sharing the next path
//! segment into a single "directory marker" (`dir1/`).
//!
//! Two buckets ship with the crate:
//! - [`MapBucket`] keeps objects in memory, ordered by key.
//! - [`DirBucket`] exposes the regular files below a host directory as objects.

mod dir_bucket;
mod map_bucket;

use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

pub use dir_bucket::DirBucket;
pub use map_bucket::MapBucket;

/// Default delimiter of hierarchical listings.
pub const DELIMITER: &str = "/";

pub type BlobResult<T> = std::result::Result<T, BlobError>;

/// Lazy listing produced by [`Bucket::list`]. `None` marks the end of the listing.
pub type ListIter<'a> = Box<dyn Iterator<Item = BlobResult<ListObject>> + 'a>;

/// Errors reported by a [`Bucket`].
#[derive(Error, Debug)]
pub enum BlobError {
    /// No object is stored under the key.
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound { .. })
    }
}

/// Options of a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with `prefix` are listed.
    pub prefix: String,
    /// Keys whose remainder after `prefix` contains `delimiter` are collapsed into a single
    /// directory marker. An empty delimiter lists every key flat.
    pub delimiter: String,
}

impl ListOptions {
    /// Hierarchical listing of `prefix` with the default `/` delimiter.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: DELIMITER.to_string(),
        }
    }

    /// Flat listing of every key below `prefix`.
    pub fn flat(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            delimiter: String::new(),
        }
    }
}

/// One item of a listing: a stored object or a directory marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObject {
    /// Object key. Directory markers end with the delimiter.
    pub key: String,
    pub size: u64,
    pub mod_time: SystemTime,
    pub md5: Option<[u8; 16]>,
    pub is_dir: bool,
}

impl ListObject {
    /// Builds a directory marker for `key` (which must already end with the delimiter).
    pub fn dir_marker(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            mod_time: SystemTime::UNIX_EPOCH,
            md5: None,
            is_dir: true,
        }
    }
}

/// Attributes of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    pub size: u64,
    pub mod_time: SystemTime,
    pub md5: Option<[u8; 16]>,
}

/// Flat key-value object store with prefix listings and ranged reads.
///
/// Implementations are only required to be as concurrency-safe as the callers need;
/// the file system view adds no locking of its own.
pub trait Bucket {
    /// Lists keys matching `opts`, in lexicographic key order.
    fn list(&self, opts: &ListOptions) -> ListIter<'_>;

    /// Returns the attributes of the object stored at `key`.
    /// A missing object is reported as [`BlobError::NotFound`].
    fn attributes(&self, key: &str) -> BlobResult<Attributes>;

    /// Opens a reader yielding at most `length` bytes of the object at `key`, starting at
    /// `offset`. Dropping the reader releases it.
    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>>;
}

impl<B: Bucket + ?Sized> Bucket for &B {
    fn list(&self, opts: &ListOptions) -> ListIter<'_> {
        (**self).list(opts)
    }

    fn attributes(&self, key: &str) -> BlobResult<Attributes> {
        (**self).attributes(key)
    }

    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>> {
        (**self).range_reader(key, offset, length)
    }
}

impl<B: Bucket + ?Sized> Bucket for Box<B> {
    fn list(&self, opts: &ListOptions) -> ListIter<'_> {
        (**self).list(opts)
    }

    fn attributes(&self, key: &str) -> BlobResult<Attributes> {
        (**self).attributes(key)
    }

    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>> {
        (**self).range_reader(key, offset, length)
    }
}

impl<B: Bucket + ?Sized> Bucket for Arc<B> {
    fn list(&self, opts: &ListOptions) -> ListIter<'_> {
        (**self).list(opts)
    }

    fn attributes(&self, key: &str) -> BlobResult<Attributes> {
        (**self).attributes(key)
    }

    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>> {
        (**self).range_reader(key, offset, length)
    }
}

/// Applies delimiter semantics to `objects`, which must be sorted by key.
///
/// Objects outside `opts.prefix` are skipped. When the key remainder after the prefix contains
/// the delimiter, the object is replaced by a directory marker ending right after the first
/// delimiter; consecutive members of the same directory yield that marker once.
pub(crate) fn delimited<'a, I>(
    objects: I,
    opts: &ListOptions,
) -> impl Iterator<Item = BlobResult<ListObject>> + use<'a, I>
where
    I: Iterator<Item = BlobResult<ListObject>> + 'a,
{
    let prefix = opts.prefix.clone();
    let delimiter = opts.delimiter.clone();
    let mut last_marker: Option<String> = None;

    objects.filter_map(move |item| {
        let object = match item {
            Ok(object) => object,
            Err(e) => return Some(Err(e)),
        };
        let rest = object.key.strip_prefix(prefix.as_str())?;
        if delimiter.is_empty() {
            return Some(Ok(object));
        }
        match rest.find(delimiter.as_str()) {
            None => Some(Ok(object)),
            Some(idx) => {
                let marker = format!("{}{}", prefix, &rest[..idx + delimiter.len()]);
                if last_marker.as_deref() == Some(marker.as_str()) {
                    return None;
                }
                last_marker = Some(marker.clone());
                Some(Ok(ListObject::dir_marker(marker)))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(key: &str) -> BlobResult<ListObject> {
        Ok(ListObject {
            key: key.to_string(),
            size: key.len() as u64,
            mod_time: SystemTime::UNIX_EPOCH,
            md5: None,
            is_dir: false,
        })
    }

    fn keys(opts: &ListOptions, input: &[&str]) -> Vec<String> {
        let objects: Vec<_> = input.iter().map(|k| object(k)).collect();
        delimited(objects.into_iter(), opts)
            .map(|o| o.unwrap().key)
            .collect()
    }

    const KEYS: [&str; 5] = [
        "bar.txt",
        "dir1/dir1-1/fuga.txt",
        "dir1/hoge.txt",
        "dir2/hello.txt",
        "foo.txt",
    ];

    #[test]
    fn test_root_listing_collapses_directories() {
        let listed = keys(&ListOptions::new(""), &KEYS);
        assert_eq!(listed, vec!["bar.txt", "dir1/", "dir2/", "foo.txt"]);
    }

    #[test]
    fn test_nested_listing() {
        let listed = keys(&ListOptions::new("dir1/"), &KEYS);
        assert_eq!(listed, vec!["dir1/dir1-1/", "dir1/hoge.txt"]);
    }

    #[test]
    fn test_prefix_without_separator_yields_marker() {
        let listed = keys(&ListOptions::new("dir1"), &KEYS);
        assert_eq!(listed, vec!["dir1/"]);
    }

    #[test]
    fn test_flat_listing() {
        let listed = keys(&ListOptions::flat("dir1/"), &KEYS);
        assert_eq!(listed, vec!["dir1/dir1-1/fuga.txt", "dir1/hoge.txt"]);
    }

    #[test]
    fn test_markers_are_flagged_as_directories() {
        let objects: Vec<_> = KEYS.iter().map(|k| object(k)).collect();
        let markers: Vec<_> = delimited(objects.into_iter(), &ListOptions::new(""))
            .map(|o| o.unwrap())
            .filter(|o| o.is_dir)
            .collect();
        assert_eq!(markers.len(), 2);
        assert!(markers.iter().all(|m| m.size == 0 && m.key.ends_with('/')));
    }

    #[test]
    fn test_errors_pass_through() {
        let input = vec![object("a.txt"), Err(BlobError::NotFound { key: "x".into() })];
        let out: Vec<_> = delimited(input.into_iter(), &ListOptions::new("")).collect();
        assert_eq!(out.len(), 2);
        assert!(out[1].as_ref().unwrap_err().is_not_found());
    }
}
