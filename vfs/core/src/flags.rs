use bitflags::bitflags;

use crate::{VfsError, VfsErrorKind, VfsResult};

bitflags! {
    /// Stream open semantics flags.
    ///
    /// The numeric values are caller-visible constants; the combinatorial
    /// rules live in [`OpenMode::normalize`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OpenMode: u32 {
        /// Input operations are allowed.
        const IN = 1;
        /// Output operations are allowed.
        const OUT = 2;
        /// Every write lands at the logical end of content.
        const APP = 4;
        /// Discard existing content on open.
        const TRUNC = 8;
        /// Start positioned at the end of content.
        const ATE = 16;
    }
}

impl OpenMode {
    /// Validate a caller-supplied mode and fill in implied flags.
    ///
    /// Rejected: nothing set beyond `ATE`; `TRUNC` without `OUT`; `APP`
    /// together with `TRUNC`. `APP` implies `OUT`.
    pub fn normalize(self) -> VfsResult<OpenMode> {
        if (self - OpenMode::ATE).is_empty() {
            return Err(VfsError::new(VfsErrorKind::InvalidPath, "open_mode.empty"));
        }
        if self.contains(OpenMode::TRUNC) && !self.contains(OpenMode::OUT) {
            return Err(VfsError::new(
                VfsErrorKind::InvalidPath,
                "open_mode.trunc_without_out",
            ));
        }
        if self.contains(OpenMode::APP) && self.contains(OpenMode::TRUNC) {
            return Err(VfsError::new(
                VfsErrorKind::InvalidPath,
                "open_mode.app_with_trunc",
            ));
        }

        let mut mode = self;
        if mode.contains(OpenMode::APP) {
            mode |= OpenMode::OUT;
        }
        Ok(mode)
    }

    pub fn readable(self) -> bool {
        self.contains(OpenMode::IN)
    }

    pub fn writable(self) -> bool {
        self.contains(OpenMode::OUT)
    }

    /// True when output is requested without input.
    pub fn write_only(self) -> bool {
        (self & (OpenMode::IN | OpenMode::OUT)) == OpenMode::OUT
    }
}
