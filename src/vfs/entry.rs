use std::time::SystemTime;

use crate::blob::{Attributes, ListObject};
use crate::core::utils;

/// Mode bits of directories: read and search for everyone.
pub const DIR_MODE: u32 = 0o555;

/// Mode bits of files: read-only for everyone.
pub const FILE_MODE: u32 = 0o444;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Directory,
}

/// A resolved path: a stored object or a synthetic directory.
///
/// The key never ends with a separator, even for directories that were discovered through a
/// `dir/` marker. The empty key is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: String,
    entry_type: EntryType,
    size: u64,
    mod_time: SystemTime,
    md5: Option<[u8; 16]>,
}

impl Entry {
    /// The synthetic root directory.
    pub fn root() -> Entry {
        Entry::dir("")
    }

    /// A synthetic directory at `key` (a trailing separator is dropped).
    pub(crate) fn dir(key: &str) -> Entry {
        Entry {
            key: trim_separator(key).to_string(),
            entry_type: EntryType::Directory,
            size: 0,
            mod_time: SystemTime::UNIX_EPOCH,
            md5: None,
        }
    }

    /// A stored object at `key` described by `attrs`.
    pub(crate) fn file(key: &str, attrs: Attributes) -> Entry {
        Entry {
            key: key.to_string(),
            entry_type: EntryType::File,
            size: attrs.size,
            mod_time: attrs.mod_time,
            md5: attrs.md5,
        }
    }

    /// The path of this entry, relative to the bucket root (`.` for the root).
    pub fn path(&self) -> &str {
        if self.key.is_empty() { utils::ROOT } else { &self.key }
    }

    /// Final path segment, or `.` for the root.
    pub fn name(&self) -> &str {
        utils::base_name(&self.key)
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_root(&self) -> bool {
        self.is_dir() && self.key.is_empty()
    }

    /// Size in bytes. Always 0 for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Modification time; the Unix epoch for synthetic directories.
    pub fn mod_time(&self) -> SystemTime {
        self.mod_time
    }

    /// MD5 digest of the content, when the backend reports one.
    pub fn content_md5(&self) -> Option<&[u8; 16]> {
        self.md5.as_ref()
    }

    /// Permission bits: [`DIR_MODE`] for directories, [`FILE_MODE`] for files.
    pub fn mode(&self) -> u32 {
        match self.entry_type {
            EntryType::Directory => DIR_MODE,
            EntryType::File => FILE_MODE,
        }
    }

    /// Listing prefix of the children of this directory.
    pub(crate) fn child_prefix(&self) -> String {
        if self.key.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.key, utils::SEPARATOR)
        }
    }
}

impl From<ListObject> for Entry {
    fn from(obj: ListObject) -> Entry {
        Entry {
            key: trim_separator(&obj.key).to_string(),
            entry_type: if obj.is_dir {
                EntryType::Directory
            } else {
                EntryType::File
            },
            size: obj.size,
            mod_time: obj.mod_time,
            md5: obj.md5,
        }
    }
}

fn trim_separator(key: &str) -> &str {
    key.strip_suffix(utils::SEPARATOR).unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(size: u64) -> Attributes {
        Attributes {
            size,
            mod_time: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000),
            md5: Some([7; 16]),
        }
    }

    #[test]
    fn test_root_entry() {
        let root = Entry::root();
        assert!(root.is_root());
        assert!(root.is_dir());
        assert_eq!(root.name(), ".");
        assert_eq!(root.path(), ".");
        assert_eq!(root.size(), 0);
        assert_eq!(root.mod_time(), SystemTime::UNIX_EPOCH);
        assert_eq!(root.mode(), 0o555);
        assert_eq!(root.child_prefix(), "");
    }

    #[test]
    fn test_file_entry() {
        let file = Entry::file("dir1/hoge.txt", attrs(4));
        assert!(file.is_file());
        assert!(!file.is_root());
        assert_eq!(file.entry_type(), EntryType::File);
        assert_eq!(file.name(), "hoge.txt");
        assert_eq!(file.size(), 4);
        assert_eq!(file.mode(), 0o444);
        assert_eq!(file.content_md5(), Some(&[7; 16]));
    }

    #[test]
    fn test_dir_entry_drops_trailing_separator() {
        let dir = Entry::dir("dir1/dir1-1/");
        assert_eq!(dir.path(), "dir1/dir1-1");
        assert_eq!(dir.name(), "dir1-1");
        assert_eq!(dir.child_prefix(), "dir1/dir1-1/");
    }

    #[test]
    fn test_from_list_object() {
        let marker: Entry = ListObject::dir_marker("dir2/").into();
        assert!(marker.is_dir());
        assert_eq!(marker.path(), "dir2");

        let object: Entry = ListObject {
            key: "foo.txt".to_string(),
            size: 3,
            mod_time: SystemTime::UNIX_EPOCH,
            md5: None,
            is_dir: false,
        }
        .into();
        assert!(object.is_file());
        assert_eq!(object.size(), 3);
        assert_eq!(object.content_md5(), None);
    }
}
