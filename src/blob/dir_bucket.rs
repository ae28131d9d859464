//! This module provides a bucket implementation backed by a real directory on the host system.
//! Every regular file below the root is an object whose key is its root-relative path joined
//! with `/`. Host directories are never objects: they only show up as directory markers
//! in delimiter listings, exactly as they would in a remote blob store.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use log::{trace, warn};

use super::{
    Attributes, BlobError, BlobResult, Bucket, DELIMITER, ListIter, ListObject, ListOptions, delimited,
};
use crate::core::utils;

/// A read-only [`Bucket`] that maps keys onto the files of a host directory.
///
/// ### Usage notes:
/// - `DirBucket` never writes to the host; populate the directory by other means.
/// - Symbolic links are never followed: a link is not an object, and keys that pass through a
///   linked directory are missing. Other special files are skipped too.
/// - File names that are not valid UTF-8 cannot be expressed as keys and are skipped.
/// - Keys that are not valid relative paths (e.g. containing `..`) are reported as missing,
///   so no key can reach outside the root.
///
/// ### Example:
/// ```no_run
/// use blobfs::{BlobFS, DirBucket};
///
/// let bucket = DirBucket::new("/srv/assets").unwrap();
/// let fs = BlobFS::new(bucket);
/// for entry in fs.read_dir(".").unwrap() {
///     println!("{} ({} bytes)", entry.name(), entry.size());
/// }
/// ```
#[derive(Debug)]
pub struct DirBucket {
    root: PathBuf, // host-related absolute normalized path
}

impl DirBucket {
    /// Creates a bucket rooted at the host directory `root`.
    /// * `root` must be an absolute path of an existing directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(anyhow!("invalid root path: empty"));
        }
        if root.is_relative() {
            return Err(anyhow!("the root path must be absolute"));
        }
        if !root.exists() {
            return Err(anyhow!("{:?} does not exist", root));
        }
        if !root.is_dir() {
            return Err(anyhow!("{:?} is not a directory", root));
        }

        Ok(Self {
            root: utils::normalize(root),
        })
    }

    /// Returns root path related to the host file system.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Resolves `key` below the root without following symbolic links.
    ///
    /// Returns the host path and its metadata, or `None` if `key` is not a valid key, does not
    /// exist, or crosses a symbolic link on the way.
    fn lstat_key(&self, key: &str) -> BlobResult<Option<(PathBuf, fs::Metadata)>> {
        if key == utils::ROOT || !utils::valid_path(key) {
            return Ok(None);
        }
        let mut host = self.root.clone();
        let mut metadata = None;
        for segment in key.split(utils::SEPARATOR) {
            host.push(segment);
            match fs::symlink_metadata(&host) {
                Ok(m) if m.file_type().is_symlink() => return Ok(None),
                Ok(m) => metadata = Some(m),
                Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(metadata.map(|m| (host, m)))
    }

    fn not_found(key: &str) -> BlobError {
        BlobError::NotFound {
            key: key.to_string(),
        }
    }

    /// Opens the regular file stored under `key`.
    fn open_object(&self, key: &str) -> BlobResult<(File, fs::Metadata)> {
        let (host, metadata) = match self.lstat_key(key)? {
            Some((host, metadata)) if metadata.is_file() => (host, metadata),
            _ => return Err(Self::not_found(key)),
        };
        let file = match File::open(&host) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Self::not_found(key)),
            Err(e) => return Err(e.into()),
        };
        Ok((file, metadata))
    }

    /// Collects the objects of the directory that can hold keys starting with `opts.prefix`,
    /// sorted by key.
    ///
    /// A `/`-delimited listing reads that single directory and reports subdirectories as markers.
    /// Any other delimiter needs every key, so the whole subtree is walked.
    fn collect_objects(&self, opts: &ListOptions) -> Result<Vec<ListObject>> {
        let prefix = opts.prefix.as_str();
        let (dir_key, host_dir) = match prefix.rfind(utils::SEPARATOR) {
            Some(idx) => {
                let dir_key = &prefix[..idx];
                match self.lstat_key(dir_key)? {
                    Some((host, metadata)) if metadata.is_dir() => (format!("{}/", dir_key), host),
                    _ => return Ok(Vec::new()),
                }
            }
            None => (String::new(), self.root.clone()),
        };

        let mut objects = Vec::new();
        if opts.delimiter == DELIMITER {
            Self::collect_level(&dir_key, &host_dir, &mut objects)?;
        } else {
            Self::collect_recursive(&dir_key, &host_dir, &mut objects)?;
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    /// Adds the regular files of `host_dir` to `objects`, plus a marker for every subdirectory
    /// that holds at least one file.
    fn collect_level(key_prefix: &str, host_dir: &Path, objects: &mut Vec<ListObject>) -> Result<()> {
        for (name, entry, file_type) in Self::read_entries(host_dir)? {
            let key = format!("{}{}", key_prefix, name);
            if file_type.is_dir() {
                if Self::holds_objects(&entry.path())? {
                    objects.push(ListObject::dir_marker(format!("{}/", key)));
                }
            } else if file_type.is_file() {
                objects.push(Self::object(key, &entry)?);
            }
        }
        Ok(())
    }

    /// Recursively adds the regular files of `host_dir` to `objects`, keyed below `key_prefix`.
    fn collect_recursive(key_prefix: &str, host_dir: &Path, objects: &mut Vec<ListObject>) -> Result<()> {
        for (name, entry, file_type) in Self::read_entries(host_dir)? {
            let key = format!("{}{}", key_prefix, name);
            if file_type.is_dir() {
                Self::collect_recursive(&format!("{}/", key), &entry.path(), objects)?;
            } else if file_type.is_file() {
                objects.push(Self::object(key, &entry)?);
            }
        }
        Ok(())
    }

    /// Checks if some regular file lives below `host_dir`. Stops at the first one found.
    fn holds_objects(host_dir: &Path) -> Result<bool> {
        for (_, entry, file_type) in Self::read_entries(host_dir)? {
            if file_type.is_file() || (file_type.is_dir() && Self::holds_objects(&entry.path())?) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reads the entries of `host_dir`. Names that are not valid UTF-8 are skipped.
    /// File types come from the entries themselves, so symbolic links are never followed.
    fn read_entries(host_dir: &Path) -> Result<Vec<(String, fs::DirEntry, fs::FileType)>> {
        let read_dir =
            fs::read_dir(host_dir).with_context(|| format!("failed to read {:?}", host_dir))?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.with_context(|| format!("failed to read {:?}", host_dir))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("skipping non UTF-8 file name {:?}", entry.path());
                continue;
            };
            let file_type = entry.file_type()?;
            entries.push((name, entry, file_type));
        }
        Ok(entries)
    }

    fn object(key: String, entry: &fs::DirEntry) -> Result<ListObject> {
        let metadata = entry.metadata()?;
        Ok(ListObject {
            key,
            size: metadata.len(),
            mod_time: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            md5: None,
            is_dir: false,
        })
    }
}

impl Bucket for DirBucket {
    fn list(&self, opts: &ListOptions) -> ListIter<'_> {
        match self.collect_objects(opts) {
            Ok(objects) => Box::new(delimited(objects.into_iter().map(Ok::<_, BlobError>), opts)),
            Err(e) => Box::new(std::iter::once(Err::<ListObject, _>(BlobError::Backend(e)))),
        }
    }

    fn attributes(&self, key: &str) -> BlobResult<Attributes> {
        let (_, metadata) = self.open_object(key)?;
        Ok(Attributes {
            size: metadata.len(),
            mod_time: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            md5: None,
        })
    }

    fn range_reader(&self, key: &str, offset: u64, length: u64) -> BlobResult<Box<dyn Read + '_>> {
        trace!("range read {} [{}; +{}) from {:?}", key, offset, length, self.root);
        let (mut file, _) = self.open_object(key)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(Box::new(file.take(length)))
    }
}
