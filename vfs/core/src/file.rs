//! File byte store.

use std::sync::{RwLock, Weak};

use crate::entry::Folder;
use crate::fs::FsShared;
use crate::name::{names_equal, EntryNameBuf};
use crate::VfsResult;

/// A regular file: a name plus a mutable, contiguous byte buffer.
///
/// All mutators replace or extend the backing buffer; content is owned
/// solely by the file and released when the file is dropped.
#[derive(Debug)]
pub struct File {
    fs: Weak<FsShared>,
    parent: Weak<Folder>,
    name: EntryNameBuf,
    content: RwLock<Vec<u8>>,
}

impl File {
    pub(crate) fn new_child(
        fs: Weak<FsShared>,
        parent: Weak<Folder>,
        name: EntryNameBuf,
    ) -> std::sync::Arc<File> {
        std::sync::Arc::new(File {
            fs,
            parent,
            name,
            content: RwLock::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn parent(&self) -> Option<std::sync::Arc<Folder>> {
        self.parent.upgrade()
    }

    /// Case-insensitive name test against a raw byte query.
    pub fn is_named(&self, query: &[u8]) -> bool {
        names_equal(self.name.as_bytes(), query)
    }

    /// A copy of the file's content.
    pub fn read_all(&self) -> Vec<u8> {
        self.content.read().expect("lock").clone()
    }

    pub fn len(&self) -> usize {
        self.content.read().expect("lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set length to zero.
    pub fn truncate(&self) {
        let mut content = self.content.write().expect("lock");
        if let Some(fs) = self.fs.upgrade() {
            fs.release_bytes(content.len() as u64);
        }
        *content = Vec::new();
    }

    /// Replace content.
    pub fn write(&self, bytes: &[u8]) -> VfsResult<()> {
        let mut content = self.content.write().expect("lock");
        if let Some(fs) = self.fs.upgrade() {
            let old = content.len() as u64;
            let new = bytes.len() as u64;
            if new > old {
                fs.try_reserve_bytes(new - old)?;
            } else {
                fs.release_bytes(old - new);
            }
        }
        *content = bytes.to_vec();
        Ok(())
    }

    /// Extend content.
    pub fn append(&self, bytes: &[u8]) -> VfsResult<()> {
        let mut content = self.content.write().expect("lock");
        if let Some(fs) = self.fs.upgrade() {
            fs.try_reserve_bytes(bytes.len() as u64)?;
        }
        content.extend_from_slice(bytes);
        Ok(())
    }
}

impl Drop for File {
    fn drop(&mut self) {
        let Some(fs) = self.fs.upgrade() else {
            return;
        };
        let bytes = self.content.read().expect("lock").len() as u64;
        fs.note_entry_drop(bytes);
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::Filesystem;
    use crate::path::VfsPath;

    #[test]
    fn write_replaces_and_append_extends() {
        let fs = Filesystem::new();
        let file = fs
            .root()
            .create_file(&VfsPath::parse("data.bin"), false)
            .expect("create");

        file.write(b"one").expect("write");
        assert_eq!(file.read_all(), b"one");

        file.write(b"two!").expect("write");
        assert_eq!(file.read_all(), b"two!");

        file.append(b"...").expect("append");
        assert_eq!(file.read_all(), b"two!...");
        assert_eq!(file.len(), 7);
    }

    #[test]
    fn truncate_clears_content() {
        let fs = Filesystem::new();
        let file = fs
            .root()
            .create_file(&VfsPath::parse("f"), false)
            .expect("create");
        file.write(b"payload").expect("write");
        file.truncate();
        assert!(file.is_empty());
        assert_eq!(file.read_all(), b"");
    }

    #[test]
    fn binary_content_round_trips() {
        let fs = Filesystem::new();
        let file = fs
            .root()
            .create_file(&VfsPath::parse("blob"), false)
            .expect("create");
        let data = vec![0x00, 0xff, 0x7f, 0x80, 0x01];
        file.write(&data).expect("write");
        assert_eq!(file.read_all(), data);
    }
}
