//! This module provides a bucket implementation that keeps its objects in memory.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::time::SystemTime;

use anyhow::{Result, anyhow};

use super::{Attributes, BlobError, BlobResult, Bucket, ListIter, ListObject, ListOptions, delimited};
use crate::core::utils;

struct Object {
    content: Vec<u8>,
    mod_time: SystemTime,
    md5: [u8; 16],
}

/// An in-memory [`Bucket`] whose objects are ordered by key.
///
/// `MapBucket` is the flat counterpart of a directory tree: there are no directory objects,
/// only keys such as `dir1/hoge.txt`. Listings walk the ordered map and apply delimiter
/// semantics, so `dir1/` shows up as a directory marker as soon as one key lives below it.
///
/// ### Invariants
///
/// 1. **Valid keys**: Every key is a valid relative path (no leading or trailing `/`, no empty,
///    `.` or `..` segments). The root marker `.` is never a key.
/// 2. **Uniqueness**: Each key maps to exactly one object; `put()` replaces existing content.
/// 3. **Digest**: The MD5 digest of each object is computed on insert and stays in sync with
///    its content.
///
/// ### Thread Safety
///
/// Reads take `&self` and are safe to share; mutation needs `&mut self`, so sharing a
/// populated bucket across threads is done with `Arc<MapBucket>`.
///
/// ### Example
///
/// ```
/// use blobfs::{BlobFS, MapBucket};
///
/// let mut bucket = MapBucket::new();
/// bucket.put("docs/note.txt", b"Hello").unwrap();
///
/// let fs = BlobFS::new(bucket);
/// assert_eq!(fs.read_file("docs/note.txt").unwrap(), b"Hello");
/// assert!(fs.is_dir("docs").unwrap());
/// ```
#[derive(Default)]
pub struct MapBucket {
    objects: BTreeMap<String, Object>,
}

impl MapBucket {
    /// Creates an empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` under `key`, stamped with the current time.
    pub fn put(&mut self, key: &str, content: &[u8]) -> Result<()> {
        self.put_with_mod_time(key, content, SystemTime::now())
    }

    /// Stores `content` under `key` with an explicit modification time.
    /// * `key` must be a valid relative path and not the root marker.
    pub fn put_with_mod_time(&mut self, key: &str, content: &[u8], mod_time: SystemTime) -> Result<()> {
        if key == utils::ROOT || !utils::valid_path(key) {
            return Err(anyhow!("invalid key: {:?}", key));
        }
        let object = Object {
            content: content.to_vec(),
            mod_time,
            md5: md5::compute(content).0,
        };
        self.objects.insert(key.to_string(), object);
        Ok(())
    }

    /// Removes the object stored under `key`.
    pub fn rm(&mut self, key: &str) -> Result<()> {
        self.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| anyhow!("{} does not exist", key))
    }

    /// Removes every object.
    pub fn clean(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn get(&self, key: &str) -> BlobResult<&Object> {
        self.objects.get(key).ok_or_else(|| BlobError::NotFound {
            key: key.to_string(),
        })
    }
}

impl Bucket for MapBucket {
    fn list(&self, opts: &ListOptions) -> ListIter<'_> {
        let objects = self
            .objects
            .range(opts.prefix.clone()..)
            .take_while({
                let prefix = opts.prefix.clone();
                move |(key, _)| key.starts_with(prefix.as_str())
            })
            .map(|(key, object)| {
                Ok::<_, BlobError>(ListObject {
                    key: key.clone(),
                    size: object.content.len() as u64,
                    mod_time: object.mod_time,
                    md5: Some(object.md5),
                    is_dir: false,
                })
            });
        Box::new(delimited(objects, opts))
    }

    fn attributes(&self, key: &str) -> BlobResult<Attributes> {
        let object = self.get(key)?;
        Ok(Attributes {
            size: object.content.len() as u64,
            mod_time: object.mod_time,
            md5: Some(object.md5),
        })
    }

    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>> {
        let content = self.get(key)?.content.as_slice();
        let start = usize::try_from(offset).map_or(content.len(), |o| o.min(content.len()));
        let end = usize::try_from(length)
            .map_or(content.len(), |l| start.saturating_add(l).min(content.len()));
        Ok(Box::new(Cursor::new(&content[start..end])))
    }
}
