//! Resolution of file system paths against a flat bucket.
//!
//! A path names either the root (`.`), a stored object, or a synthetic directory that exists
//! only because other keys share `path/` as a prefix. Objects are looked up first, so opening a
//! known file costs a single backend call; directories cost a second one (a listing probe).

use log::debug;

use crate::blob::{Bucket, ListOptions};
use crate::core::{Error, Result, utils};
use crate::vfs::Entry;

/// Resolves `name` to an [`Entry`].
///
/// # Errors
/// - [`Error::InvalidPath`] if `name` is not a valid relative path.
/// - [`Error::NotExist`] if neither an object nor a directory marker exists at `name`.
/// - [`Error::Backend`] for any other bucket failure.
pub fn lookup<B: Bucket + ?Sized>(bucket: &B, name: &str) -> Result<Entry> {
    if !utils::valid_path(name) {
        return Err(Error::InvalidPath);
    }
    if name == utils::ROOT {
        return Ok(Entry::root());
    }
    match bucket.attributes(name) {
        Ok(attrs) => {
            debug!("{} resolved to an object of {} bytes", name, attrs.size);
            Ok(Entry::file(name, attrs))
        }
        Err(e) if e.is_not_found() => search_dir(bucket, name),
        Err(e) => Err(e.into()),
    }
}

/// Probes for a synthetic directory: only the first listed key is inspected, and it must be
/// the `name/` marker.
fn search_dir<B: Bucket + ?Sized>(bucket: &B, name: &str) -> Result<Entry> {
    let marker = format!("{}{}", name, utils::SEPARATOR);
    let first = bucket.list(&ListOptions::new(name)).next();
    match first {
        Some(Ok(obj)) if obj.key == marker => {
            debug!("{} resolved to a directory", name);
            Ok(Entry::from(obj))
        }
        Some(Ok(_)) | None => {
            debug!("{} does not exist", name);
            Err(Error::NotExist)
        }
        Some(Err(e)) => Err(e.into()),
    }
}
