//! In-memory virtual filesystem core.
//!
//! An in-process hierarchical file store with no disk backing: paths parse
//! into components, folders resolve them case-insensitively, and files hold
//! plain byte buffers. The companion `virtfs-buf` crate layers a buffered,
//! codec-aware character stream on top.
//!
//! The model is single-threaded: the `Arc`/`RwLock` representation is an
//! ownership vehicle, not a concurrency guarantee. Callers that share an
//! instance across threads supply their own synchronization.

pub mod entry;
pub mod error;
pub mod file;
pub mod flags;
pub mod fs;
pub mod name;
pub mod path;

pub use entry::{Entry, Folder};
pub use error::{VfsError, VfsErrorKind, VfsResult};
pub use file::File;
pub use flags::OpenMode;
pub use fs::{Filesystem, FilesystemBuilder, FsConfig};
pub use name::{is_valid_name, names_equal, EntryNameBuf, FORBIDDEN_CHARS};
pub use path::VfsPath;
