//! POSIX and `std::io` interop for `virtfs` error kinds.
//!
//! Keeps platform error translation out of `virtfs-core` and out of the
//! stream layer: every [`VfsErrorKind`] corresponds to exactly one errno,
//! and this crate is the single place that says which.

use std::io::ErrorKind;

use virtfs_core::VfsErrorKind;

/// Map a VFS error kind onto the closest `std::io::ErrorKind`.
pub fn error_kind_to_io_error_kind(kind: VfsErrorKind) -> ErrorKind {
    match kind {
        VfsErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
        VfsErrorKind::NotFound => ErrorKind::NotFound,
        VfsErrorKind::NotDir => ErrorKind::NotADirectory,
        VfsErrorKind::InvalidPath => ErrorKind::InvalidInput,
        VfsErrorKind::Permission => ErrorKind::PermissionDenied,
        VfsErrorKind::NoSpace => ErrorKind::StorageFull,
        VfsErrorKind::Busy => ErrorKind::ResourceBusy,
        VfsErrorKind::IllegalSequence => ErrorKind::InvalidData,
        VfsErrorKind::Internal => ErrorKind::Other,
    }
}

/// Best-effort conversion from a host `std::io::Error` to a VFS error kind.
pub fn io_error_to_error_kind(err: &std::io::Error) -> VfsErrorKind {
    match err.kind() {
        ErrorKind::AlreadyExists => VfsErrorKind::AlreadyExists,
        ErrorKind::NotFound => VfsErrorKind::NotFound,
        ErrorKind::NotADirectory => VfsErrorKind::NotDir,
        ErrorKind::InvalidInput => VfsErrorKind::InvalidPath,
        ErrorKind::PermissionDenied => VfsErrorKind::Permission,
        ErrorKind::StorageFull => VfsErrorKind::NoSpace,
        ErrorKind::ResourceBusy => VfsErrorKind::Busy,
        ErrorKind::InvalidData => VfsErrorKind::IllegalSequence,
        _ => VfsErrorKind::Internal,
    }
}

/// The errno a VFS error kind corresponds to.
#[cfg(feature = "host-errno")]
pub fn error_kind_to_errno(kind: VfsErrorKind) -> i32 {
    match kind {
        VfsErrorKind::AlreadyExists => libc::EEXIST,
        VfsErrorKind::NotFound => libc::ENOENT,
        VfsErrorKind::NotDir => libc::ENOTDIR,
        VfsErrorKind::InvalidPath => libc::EINVAL,
        VfsErrorKind::Permission => libc::EPERM,
        VfsErrorKind::NoSpace => libc::ENOSPC,
        VfsErrorKind::Busy => libc::EBUSY,
        VfsErrorKind::IllegalSequence => libc::EILSEQ,
        VfsErrorKind::Internal => libc::EIO,
    }
}

/// The VFS error kind for a raw errno, when one of ours matches.
#[cfg(feature = "host-errno")]
pub fn errno_to_error_kind(raw: i32) -> Option<VfsErrorKind> {
    let kind = match raw {
        libc::EEXIST => VfsErrorKind::AlreadyExists,
        libc::ENOENT => VfsErrorKind::NotFound,
        libc::ENOTDIR => VfsErrorKind::NotDir,
        libc::EINVAL => VfsErrorKind::InvalidPath,
        libc::EPERM => VfsErrorKind::Permission,
        libc::ENOSPC => VfsErrorKind::NoSpace,
        libc::EBUSY => VfsErrorKind::Busy,
        libc::EILSEQ => VfsErrorKind::IllegalSequence,
        libc::EIO => VfsErrorKind::Internal,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: &[VfsErrorKind] = &[
        VfsErrorKind::AlreadyExists,
        VfsErrorKind::NotFound,
        VfsErrorKind::NotDir,
        VfsErrorKind::InvalidPath,
        VfsErrorKind::Permission,
        VfsErrorKind::NoSpace,
        VfsErrorKind::Busy,
        VfsErrorKind::IllegalSequence,
        VfsErrorKind::Internal,
    ];

    #[test]
    fn io_error_kind_mapping_round_trips() {
        for &kind in ALL_KINDS {
            if kind == VfsErrorKind::Internal {
                continue; // Internal maps onto the catch-all
            }
            let io_kind = error_kind_to_io_error_kind(kind);
            let err = std::io::Error::new(io_kind, "probe");
            assert_eq!(io_error_to_error_kind(&err), kind);
        }
    }

    #[cfg(feature = "host-errno")]
    #[test]
    fn errno_mapping_round_trips() {
        for &kind in ALL_KINDS {
            let errno = error_kind_to_errno(kind);
            assert_eq!(errno_to_error_kind(errno), Some(kind));
        }
    }

    #[cfg(feature = "host-errno")]
    #[test]
    fn taxonomy_matches_posix_interop_table() {
        assert_eq!(error_kind_to_errno(VfsErrorKind::AlreadyExists), libc::EEXIST);
        assert_eq!(error_kind_to_errno(VfsErrorKind::NotFound), libc::ENOENT);
        assert_eq!(error_kind_to_errno(VfsErrorKind::NotDir), libc::ENOTDIR);
        assert_eq!(error_kind_to_errno(VfsErrorKind::InvalidPath), libc::EINVAL);
        assert_eq!(error_kind_to_errno(VfsErrorKind::Permission), libc::EPERM);
    }
}
