//! Filesystem instance: the root folder plus lifecycle hooks and limits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::entry::Folder;
use crate::{VfsError, VfsErrorKind, VfsResult};

/// Construction-time limits for a filesystem instance.
#[derive(Clone, Debug, Default)]
pub struct FsConfig {
    /// Optional max bytes allowed for all file data in this instance.
    pub max_bytes: Option<u64>,
    /// Optional max entry count (files plus folders, root included).
    pub max_entries: Option<u64>,
}

/// State shared by every entry of one filesystem instance.
#[derive(Debug)]
pub(crate) struct FsShared {
    config: FsConfig,
    entry_count: AtomicU64,
    used_bytes: AtomicU64,
}

impl FsShared {
    pub(crate) fn try_reserve_entry(&self) -> VfsResult<()> {
        let Some(limit) = self.config.max_entries else {
            self.entry_count.fetch_add(1, Ordering::AcqRel);
            return Ok(());
        };
        let mut current = self.entry_count.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return Err(VfsError::new(VfsErrorKind::NoSpace, "fs.max_entries"));
            }
            match self.entry_count.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(next) => current = next,
            }
        }
    }

    pub(crate) fn note_entry_drop(&self, bytes: u64) {
        if bytes > 0 {
            self.used_bytes.fetch_sub(bytes, Ordering::AcqRel);
        }
        self.entry_count.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn try_reserve_bytes(&self, delta: u64) -> VfsResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let Some(limit) = self.config.max_bytes else {
            self.used_bytes.fetch_add(delta, Ordering::AcqRel);
            return Ok(());
        };
        let mut current = self.used_bytes.load(Ordering::Acquire);
        loop {
            let next = current
                .checked_add(delta)
                .ok_or(VfsError::new(VfsErrorKind::NoSpace, "fs.bytes_overflow"))?;
            if next > limit {
                return Err(VfsError::new(VfsErrorKind::NoSpace, "fs.max_bytes"));
            }
            match self.used_bytes.compare_exchange(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(found) => current = found,
            }
        }
    }

    pub(crate) fn release_bytes(&self, delta: u64) {
        if delta > 0 {
            self.used_bytes.fetch_sub(delta, Ordering::AcqRel);
        }
    }
}

type LifecycleHook = Box<dyn FnOnce(&Arc<Folder>)>;

/// An in-memory filesystem instance.
///
/// The root folder is named `.` and has no parent. Construction runs the
/// builder's `init` hook; dropping the instance runs `before_uninit` and
/// then releases the whole tree.
pub struct Filesystem {
    root: Arc<Folder>,
    shared: Arc<FsShared>,
    before_uninit: Option<LifecycleHook>,
}

impl Filesystem {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: FsConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> FilesystemBuilder {
        FilesystemBuilder::default()
    }

    pub fn root(&self) -> &Arc<Folder> {
        &self.root
    }

    pub fn config(&self) -> &FsConfig {
        &self.shared.config
    }

    /// Entries currently alive in this instance, root included.
    pub fn entry_count(&self) -> u64 {
        self.shared.entry_count.load(Ordering::Acquire)
    }

    /// Total bytes of file content currently stored.
    pub fn used_bytes(&self) -> u64 {
        self.shared.used_bytes.load(Ordering::Acquire)
    }
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Filesystem {
    fn drop(&mut self) {
        if let Some(hook) = self.before_uninit.take() {
            hook(&self.root);
        }
        tracing::debug!("filesystem teardown");
    }
}

#[derive(Default)]
pub struct FilesystemBuilder {
    config: FsConfig,
    init: Option<LifecycleHook>,
    before_uninit: Option<LifecycleHook>,
}

impl FilesystemBuilder {
    pub fn config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    /// Hook run once, right after the root folder exists.
    pub fn init(mut self, hook: impl FnOnce(&Arc<Folder>) + 'static) -> Self {
        self.init = Some(Box::new(hook));
        self
    }

    /// Hook run once, right before the tree is destroyed.
    pub fn before_uninit(mut self, hook: impl FnOnce(&Arc<Folder>) + 'static) -> Self {
        self.before_uninit = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Filesystem {
        let shared = Arc::new(FsShared {
            config: self.config,
            entry_count: AtomicU64::new(1), // the root itself
            used_bytes: AtomicU64::new(0),
        });
        let root = Folder::new_root(&shared);
        tracing::debug!("filesystem created");
        if let Some(hook) = self.init {
            hook(&root);
        }
        Filesystem {
            root,
            shared,
            before_uninit: self.before_uninit,
        }
    }
}
