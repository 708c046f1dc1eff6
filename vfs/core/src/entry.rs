//! The entry tree: files and folders with parent back-references.
//!
//! Folders own their children (`Arc`ed entries in insertion order) and
//! carry non-owning `Weak` links upward; dropping a folder releases all
//! descendants post-order. There is no remove operation, so back-references
//! cannot dangle while the filesystem is alive.

use std::sync::{Arc, RwLock, Weak};

use crate::file::File;
use crate::fs::FsShared;
use crate::name::{is_valid_name, names_equal, EntryNameBuf};
use crate::path::VfsPath;
use crate::{VfsError, VfsErrorKind, VfsResult};

/// A directory entry: either a file or a folder.
#[derive(Clone, Debug)]
pub enum Entry {
    File(Arc<File>),
    Folder(Arc<Folder>),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File(file) => file.name(),
            Entry::Folder(folder) => folder.name(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Entry::Folder(_))
    }

    pub fn as_file(&self) -> Option<&Arc<File>> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Arc<Folder>> {
        match self {
            Entry::Folder(folder) => Some(folder),
            Entry::File(_) => None,
        }
    }

    /// Demand a file, raising `Permission` when the entry is a folder.
    pub fn require_file(self, context: &'static str) -> VfsResult<Arc<File>> {
        match self {
            Entry::File(file) => Ok(file),
            Entry::Folder(_) => Err(VfsError::new(VfsErrorKind::Permission, context)),
        }
    }

    pub fn parent(&self) -> Option<Arc<Folder>> {
        match self {
            Entry::File(file) => file.parent(),
            Entry::Folder(folder) => folder.parent(),
        }
    }

    /// Case-insensitive name test against a raw byte query.
    pub fn is_named(&self, query: &[u8]) -> bool {
        match self {
            Entry::File(file) => file.is_named(query),
            Entry::Folder(folder) => folder.is_named(query),
        }
    }
}

/// A folder: a named, ordered collection of child entries.
#[derive(Debug)]
pub struct Folder {
    self_ref: Weak<Folder>,
    fs: Weak<FsShared>,
    parent: Option<Weak<Folder>>,
    name: EntryNameBuf,
    children: RwLock<Vec<Entry>>,
}

impl Folder {
    pub(crate) fn new_root(fs: &Arc<FsShared>) -> Arc<Folder> {
        Arc::new_cyclic(|weak| Folder {
            self_ref: weak.clone(),
            fs: Arc::downgrade(fs),
            parent: None,
            name: EntryNameBuf::new_unchecked("."),
            children: RwLock::new(Vec::new()),
        })
    }

    fn new_child(fs: Weak<FsShared>, parent: Weak<Folder>, name: EntryNameBuf) -> Arc<Folder> {
        Arc::new_cyclic(|weak| Folder {
            self_ref: weak.clone(),
            fs,
            parent: Some(parent),
            name,
            children: RwLock::new(Vec::new()),
        })
    }

    fn arc_self(&self) -> VfsResult<Arc<Folder>> {
        self.self_ref
            .upgrade()
            .ok_or(VfsError::new(VfsErrorKind::Internal, "folder.arc_self"))
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn parent(&self) -> Option<Arc<Folder>> {
        self.parent.as_ref().and_then(|weak| weak.upgrade())
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Case-insensitive name test against a raw byte query.
    pub fn is_named(&self, query: &[u8]) -> bool {
        names_equal(self.name.as_bytes(), query)
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.read().expect("lock").len()
    }

    /// Snapshot of the direct children, in insertion order.
    pub fn entries(&self) -> Vec<Entry> {
        self.children.read().expect("lock").clone()
    }

    /// Resolve one component against this folder.
    ///
    /// `""` and `"."` name the folder itself, `".."` its parent (which the
    /// root does not have); anything else is matched case-insensitively
    /// against the children.
    pub fn get_entry(&self, name: &str) -> VfsResult<Entry> {
        if name.is_empty() || name == "." {
            return Ok(Entry::Folder(self.arc_self()?));
        }
        if name == ".." {
            return match self.parent() {
                Some(parent) => Ok(Entry::Folder(parent)),
                None => Err(VfsError::new(
                    VfsErrorKind::NotFound,
                    "folder.get_entry.dotdot",
                )),
            };
        }
        let children = self.children.read().expect("lock");
        children
            .iter()
            .find(|entry| entry.is_named(name.as_bytes()))
            .cloned()
            .ok_or(VfsError::new(VfsErrorKind::NotFound, "folder.get_entry"))
    }

    /// True iff `name` could be given to a new child of this folder.
    ///
    /// The dot-navigation strings (`""`, `"."`, `".."`) are reserved and
    /// never free; otherwise the name must not collide with any child under
    /// the case-insensitive matcher.
    pub fn name_is_free(&self, name: &str) -> bool {
        let bytes = name.as_bytes();
        if bytes.len() <= 2 && bytes.iter().all(|&b| b == b'.') {
            return false;
        }
        let children = self.children.read().expect("lock");
        !children.iter().any(|entry| entry.is_named(bytes))
    }

    /// Walk `path` from this folder and return the terminal entry.
    pub fn lookup(&self, path: &VfsPath) -> VfsResult<Entry> {
        let mut current = Entry::Folder(self.arc_self()?);
        for part in path.components() {
            let folder = match current.as_folder() {
                Some(folder) => folder.clone(),
                None => return Err(VfsError::new(VfsErrorKind::NotDir, "folder.lookup")),
            };
            current = folder.get_entry(part)?;
        }
        Ok(current)
    }

    /// Create a file at `path` relative to this folder.
    ///
    /// With `create_parents`, missing intermediate folders are synthesized
    /// in place; creation is not transactional, so folders synthesized
    /// before a terminal-name failure remain.
    pub fn create_file(&self, path: &VfsPath, create_parents: bool) -> VfsResult<Arc<File>> {
        let parent = self.resolve_parent(path, create_parents)?;
        parent.insert_file(path.last())
    }

    /// Create a folder at `path` relative to this folder; see
    /// [`Folder::create_file`] for the parent-synthesis contract.
    pub fn create_folder(&self, path: &VfsPath, create_parents: bool) -> VfsResult<Arc<Folder>> {
        let parent = self.resolve_parent(path, create_parents)?;
        parent.insert_folder(path.last())
    }

    fn resolve_parent(&self, path: &VfsPath, create_parents: bool) -> VfsResult<Arc<Folder>> {
        let mut current = self.arc_self()?;
        for part in path.components().take(path.len() - 1) {
            let next = match current.get_entry(part) {
                Ok(Entry::Folder(folder)) => folder,
                Ok(Entry::File(_)) => {
                    return Err(VfsError::new(VfsErrorKind::NotDir, "folder.create"));
                }
                Err(err) if create_parents && err.kind() == VfsErrorKind::NotFound => {
                    current.insert_folder(part)?
                }
                Err(err) => return Err(err),
            };
            current = next;
        }
        Ok(current)
    }

    fn check_new_name(&self, name: &str) -> VfsResult<EntryNameBuf> {
        if !self.name_is_free(name) {
            return Err(VfsError::new(VfsErrorKind::AlreadyExists, "folder.create"));
        }
        if !is_valid_name(name.as_bytes()) {
            return Err(VfsError::new(VfsErrorKind::InvalidPath, "folder.create"));
        }
        Ok(EntryNameBuf::new_unchecked(name))
    }

    fn insert_folder(&self, name: &str) -> VfsResult<Arc<Folder>> {
        let name = self.check_new_name(name)?;
        if let Some(fs) = self.fs.upgrade() {
            fs.try_reserve_entry()?;
        }
        let child = Folder::new_child(self.fs.clone(), self.self_ref.clone(), name);
        tracing::trace!(parent = self.name.as_str(), child = child.name(), "mkdir");
        self.children
            .write()
            .expect("lock")
            .push(Entry::Folder(child.clone()));
        Ok(child)
    }

    fn insert_file(&self, name: &str) -> VfsResult<Arc<File>> {
        let name = self.check_new_name(name)?;
        if let Some(fs) = self.fs.upgrade() {
            fs.try_reserve_entry()?;
        }
        let child = File::new_child(self.fs.clone(), self.self_ref.clone(), name);
        tracing::trace!(parent = self.name.as_str(), child = child.name(), "create");
        self.children
            .write()
            .expect("lock")
            .push(Entry::File(child.clone()));
        Ok(child)
    }
}

impl Drop for Folder {
    fn drop(&mut self) {
        if let Some(fs) = self.fs.upgrade() {
            fs.note_entry_drop(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::Filesystem;

    fn path(raw: &str) -> VfsPath {
        VfsPath::parse(raw)
    }

    #[test]
    fn get_entry_resolves_dot_navigation() {
        let fs = Filesystem::new();
        let sub = fs.root().create_folder(&path("sub"), false).expect("mkdir");

        let this = sub.get_entry(".").expect("dot");
        assert!(this.as_folder().expect("folder").is_named(b"sub"));

        let this = sub.get_entry("").expect("empty");
        assert!(this.as_folder().expect("folder").is_named(b"sub"));

        let up = sub.get_entry("..").expect("dotdot");
        assert!(up.as_folder().expect("folder").is_root());
    }

    #[test]
    fn get_entry_is_case_insensitive() {
        let fs = Filesystem::new();
        fs.root()
            .create_file(&path("Readme.MD"), false)
            .expect("create");
        let found = fs.root().get_entry("readme.md").expect("lookup");
        assert_eq!(found.name(), "Readme.MD");
    }

    #[test]
    fn uniqueness_is_case_insensitive() {
        let fs = Filesystem::new();
        fs.root().create_file(&path("data"), false).expect("create");
        let err = fs.root().create_file(&path("DATA"), false).unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::AlreadyExists);
    }

    #[test]
    fn name_is_free_reserves_dot_strings() {
        let fs = Filesystem::new();
        let root = fs.root();
        assert!(!root.name_is_free(""));
        assert!(!root.name_is_free("."));
        assert!(!root.name_is_free(".."));
        assert!(root.name_is_free("..a"));
        assert!(root.name_is_free("fresh"));
    }

    #[test]
    fn lookup_through_file_is_not_dir() {
        let fs = Filesystem::new();
        fs.root().create_file(&path("f"), false).expect("create");
        let err = fs.root().lookup(&path("f/nested")).unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::NotDir);
    }

    #[test]
    fn parent_chain_reaches_root() {
        let fs = Filesystem::new();
        let leaf = fs
            .root()
            .create_folder(&path("a/b/c"), true)
            .expect("mkdir -p");
        let mut hops = 0;
        let mut current = leaf;
        while let Some(parent) = current.parent() {
            current = parent;
            hops += 1;
            assert!(hops < 16, "parent chain must terminate");
        }
        assert!(current.is_root());
        assert_eq!(hops, 3);
    }

    #[test]
    fn created_entries_are_in_insertion_order() {
        let fs = Filesystem::new();
        fs.root().create_file(&path("z"), false).expect("create");
        fs.root().create_file(&path("a"), false).expect("create");
        fs.root().create_folder(&path("m"), false).expect("mkdir");
        let names: Vec<String> = fs
            .root()
            .entries()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn require_file_raises_permission_on_folder() {
        let fs = Filesystem::new();
        fs.root().create_folder(&path("d"), false).expect("mkdir");
        let entry = fs.root().get_entry("d").expect("entry");
        let err = entry.require_file("test.require_file").unwrap_err();
        assert_eq!(err.kind(), VfsErrorKind::Permission);
    }
}
