use std::fmt;

/// Failure modes surfaced by the virtual filesystem.
///
/// This is intentionally "errno-like": each kind maps to a single POSIX
/// error so interop layers (e.g. `virtfs-unix`) can translate in one place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VfsErrorKind {
    AlreadyExists,   // EEXIST
    NotFound,        // ENOENT
    NotDir,          // ENOTDIR
    InvalidPath,     // EINVAL
    Permission,      // EPERM
    NoSpace,         // ENOSPC
    Busy,            // EBUSY
    IllegalSequence, // EILSEQ
    Internal,        // EIO
}

impl VfsErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VfsErrorKind::AlreadyExists => "already exists",
            VfsErrorKind::NotFound => "not found",
            VfsErrorKind::NotDir => "not a directory",
            VfsErrorKind::InvalidPath => "invalid path",
            VfsErrorKind::Permission => "operation not permitted",
            VfsErrorKind::NoSpace => "no space left",
            VfsErrorKind::Busy => "resource busy",
            VfsErrorKind::IllegalSequence => "illegal byte sequence",
            VfsErrorKind::Internal => "internal error",
        }
    }
}

/// A typed filesystem error: a kind plus a static context tag naming the
/// operation that raised it (`"folder.lookup"` style).
#[derive(Clone, Debug)]
pub struct VfsError {
    kind: VfsErrorKind,
    context: &'static str,
}

impl VfsError {
    pub fn new(kind: VfsErrorKind, context: &'static str) -> Self {
        Self { kind, context }
    }

    pub fn kind(&self) -> VfsErrorKind {
        self.kind
    }

    pub fn context(&self) -> &'static str {
        self.context
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind.as_str(), self.context)
    }
}

impl std::error::Error for VfsError {}

pub type VfsResult<T> = Result<T, VfsError>;
