//! The buffered stream core.
//!
//! A [`FileBuf`] overlays a growable character region onto a file from the
//! in-memory tree. Opening decodes the file's bytes into the region through
//! the installed codec (or a raw copy when none is installed); reads and
//! writes move a single position over it; flushing encodes the put area
//! back into the file. The buffer never touches the file between open and
//! flush.

use std::io::SeekFrom;
use std::sync::Arc;

use bitflags::bitflags;

use virtfs_core::{
    File, Filesystem, OpenMode, VfsError, VfsErrorKind, VfsPath, VfsResult,
};

use crate::bridge::{decode_all, encode_all};
use crate::codec::{Codec, CodecState};

/// The region grows in chunks of this many character units.
const CHUNK_UNITS: usize = 256;

bitflags! {
    /// Position-state bits; the empty set is the initial state.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    struct PosState: u8 {
        /// Reads and writes fail until a seek clears the state.
        const BROKEN = 1;
        /// The putback slot holds a character.
        const PUSHBACK = 2;
        /// The last write was an append; the next read breaks the position.
        const AT_END = 4;
    }
}

fn chunked(min_units: usize) -> usize {
    (min_units / CHUNK_UNITS + usize::from(min_units % CHUNK_UNITS != 0)) * CHUNK_UNITS
}

/// A character stream buffer over one file of the virtual tree.
pub struct FileBuf {
    file: Option<Arc<File>>,
    mode: OpenMode,
    codec: Option<Box<dyn Codec>>,
    conv_state: CodecState,
    pos_state: PosState,
    putback: char,
    /// The controlled region; `len()` is its capacity.
    buf: Vec<char>,
    /// Current position.
    pos: usize,
    /// Logical end of content, never past capacity.
    fend: usize,
    /// Low-water mark of what a flush must write back.
    put_area_start: usize,
}

impl FileBuf {
    /// A closed buffer with no codec installed (raw unit-for-unit copy).
    pub fn new() -> Self {
        Self {
            file: None,
            mode: OpenMode::empty(),
            codec: None,
            conv_state: CodecState::default(),
            pos_state: PosState::empty(),
            putback: '\0',
            buf: Vec::new(),
            pos: 0,
            fend: 0,
            put_area_start: 0,
        }
    }

    /// A closed buffer with `codec` installed; an always-identity codec is
    /// recorded as none.
    pub fn with_codec(codec: Box<dyn Codec>) -> Self {
        let mut buf = Self::new();
        buf.imbue(codec);
        buf
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The file this buffer is mounted on, while open.
    pub fn file(&self) -> Option<&Arc<File>> {
        self.file.as_ref()
    }

    /// Replace the codec. Takes effect for subsequent conversions; an
    /// always-identity codec enables the raw-copy fast path.
    pub fn imbue(&mut self, codec: Box<dyn Codec>) {
        self.codec = if codec.always_noconv() { None } else { Some(codec) };
    }

    /// Exchange the complete state of two buffers.
    pub fn swap(&mut self, other: &mut FileBuf) {
        std::mem::swap(self, other);
    }

    /// Open `path` under `mode`, resolving against the root of `fs`.
    ///
    /// A missing file is created when the mode asks for truncation,
    /// appending, or write-only output; otherwise the miss is an error.
    /// Preserved content is decoded into the buffer up front.
    pub fn open(&mut self, fs: &Filesystem, path: &str, mode: OpenMode) -> VfsResult<()> {
        if self.file.is_some() {
            return Err(VfsError::new(VfsErrorKind::Busy, "filebuf.open.busy"));
        }
        let mode = mode.normalize()?;
        let path = VfsPath::parse(path);

        let existing = match fs.root().lookup(&path) {
            Ok(entry) => Some(entry.require_file("filebuf.open")?),
            Err(err) if err.kind() == VfsErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };

        let file = match existing {
            Some(file) => {
                let preserve = !(mode.contains(OpenMode::TRUNC) || mode.write_only())
                    || mode.contains(OpenMode::APP);
                if preserve {
                    let chars = decode_all(
                        self.codec.as_deref(),
                        &mut self.conv_state,
                        &file.read_all(),
                    )
                    .ok_or(VfsError::new(
                        VfsErrorKind::IllegalSequence,
                        "filebuf.open.decode",
                    ))?;
                    self.buf = vec!['\0'; chunked(chars.len())];
                    self.buf[..chars.len()].copy_from_slice(&chars);
                    self.fend = chars.len();
                    self.pos = if mode.contains(OpenMode::ATE) { self.fend } else { 0 };
                    self.put_area_start =
                        if mode.contains(OpenMode::APP) { self.fend } else { 0 };
                    self.mode = mode;
                    self.file = Some(file);
                    tracing::trace!(path = path.raw(), ?mode, "open preserved");
                    return Ok(());
                }
                file.truncate();
                file
            }
            None => {
                if mode.intersects(OpenMode::TRUNC | OpenMode::APP) || mode.write_only() {
                    fs.root().create_file(&path, false)?
                } else {
                    return Err(VfsError::new(VfsErrorKind::NotFound, "filebuf.open"));
                }
            }
        };

        self.buf = vec!['\0'; CHUNK_UNITS];
        self.pos = 0;
        self.fend = 0;
        self.put_area_start = 0;
        self.mode = mode;
        self.file = Some(file);
        tracing::trace!(path = path.raw(), ?mode, "open fresh");
        Ok(())
    }

    /// Flush when writable, release the region, and clear all state.
    /// Succeeds iff the flush (when one was owed) succeeded.
    pub fn close(&mut self) -> VfsResult<()> {
        if self.file.is_none() {
            return Err(VfsError::new(VfsErrorKind::NotFound, "filebuf.close"));
        }
        let result = if self.mode.contains(OpenMode::OUT) {
            self.flush_buffer()
        } else {
            Ok(())
        };
        self.reset();
        result
    }

    /// Flush pending output to the file; a no-op for read-only buffers.
    pub fn sync(&mut self) -> VfsResult<()> {
        if self.file.is_none() {
            return Ok(());
        }
        if self.mode.contains(OpenMode::OUT) {
            return self.flush_buffer();
        }
        Ok(())
    }

    /// Characters immediately available for reading.
    pub fn available(&self) -> usize {
        if !(self.file.is_some() && self.mode.contains(OpenMode::IN)) {
            return 0;
        }
        self.fend - self.pos
    }

    /// The character at the current position, without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        if self.pos_state.contains(PosState::BROKEN) {
            return None;
        }
        if self.pos_state.contains(PosState::AT_END) {
            self.pos_state.insert(PosState::BROKEN);
            return None;
        }
        if self.pos_state.contains(PosState::PUSHBACK) {
            return Some(self.putback);
        }
        if !(self.file.is_some() && self.mode.contains(OpenMode::IN)) || self.pos >= self.fend {
            return None;
        }
        Some(self.buf[self.pos])
    }

    /// Consume and return the character at the current position.
    pub fn next(&mut self) -> Option<char> {
        if self.pos_state.contains(PosState::BROKEN) {
            return None;
        }
        if self.pos_state.contains(PosState::AT_END) {
            self.pos_state.insert(PosState::BROKEN);
            return None;
        }
        if self.pos_state.contains(PosState::PUSHBACK) {
            let out = self.putback;
            self.pos_state.remove(PosState::PUSHBACK);
            // The position was backed up by the putback, so it can advance.
            self.pos += 1;
            return Some(out);
        }
        if !(self.file.is_some() && self.mode.contains(OpenMode::IN)) || self.pos >= self.fend {
            return None;
        }
        let ch = self.buf[self.pos];
        self.pos += 1;
        Some(ch)
    }

    /// Step the position back one character, expecting `ch` there.
    ///
    /// When `ch` differs from the stored character it is staged in the
    /// putback slot and returned by the following read. Fails (and breaks
    /// the position) at the buffer start or when the position state is not
    /// initial.
    pub fn put_back(&mut self, ch: char) -> bool {
        self.back_up(Some(ch))
    }

    /// Step the position back one character without replacement.
    pub fn unget(&mut self) -> bool {
        self.back_up(None)
    }

    fn back_up(&mut self, ch: Option<char>) -> bool {
        if !(self.file.is_some() && self.mode.contains(OpenMode::IN)) {
            return false;
        }
        if self.pos == 0 || !self.pos_state.is_empty() {
            self.pos_state.insert(PosState::BROKEN);
            return false;
        }
        self.pos -= 1;
        let Some(ch) = ch else {
            return true;
        };
        if self.buf[self.pos] != ch {
            self.putback = ch;
            self.pos_state.insert(PosState::PUSHBACK);
        }
        true
    }

    /// Write one character at the current position (or at the content end
    /// under `APP`), growing the region as needed.
    pub fn put(&mut self, ch: char) -> bool {
        if !(self.file.is_some() && self.mode.contains(OpenMode::OUT))
            || self.pos_state.contains(PosState::BROKEN)
        {
            return false;
        }
        let dest = if self.mode.contains(OpenMode::APP) { self.fend } else { self.pos };
        if dest >= self.buf.len() {
            self.extend_region();
        }
        self.buf[dest] = ch;
        if self.mode.contains(OpenMode::APP) {
            self.pos_state = PosState::AT_END;
        }
        if dest + 1 > self.fend {
            self.fend = dest + 1;
        }
        self.pos += 1;
        true
    }

    /// Write every character of `s`; stops at the first failure.
    pub fn put_str(&mut self, s: &str) -> bool {
        s.chars().all(|ch| self.put(ch))
    }

    /// Reposition relative to the start, current position, or content end.
    ///
    /// `SeekFrom::Current(0)` only reports the position (failing when the
    /// position is broken); every other seek clamps into the content and
    /// resets the position state. Returns the offset from the start.
    pub fn seek_off(&mut self, pos: SeekFrom) -> Option<u64> {
        self.file.as_ref()?;
        let target = match pos {
            SeekFrom::Start(off) => off as i128,
            SeekFrom::Current(0) => {
                if self.pos_state.contains(PosState::BROKEN) {
                    return None;
                }
                return Some(self.pos as u64);
            }
            SeekFrom::Current(off) => self.pos as i128 + off as i128,
            SeekFrom::End(off) => self.fend as i128 + off as i128,
        };
        self.pos = target.clamp(0, self.fend as i128) as usize;
        self.pos_state = PosState::empty();
        Some(self.pos as u64)
    }

    /// Set an absolute position, clamped into the content.
    pub fn seek_pos(&mut self, pos: u64) -> Option<u64> {
        self.file.as_ref()?;
        self.pos_state = PosState::empty();
        self.pos = usize::try_from(pos).unwrap_or(usize::MAX).min(self.fend);
        Some(self.pos as u64)
    }

    /// Move live data into a region of exactly `units` capacity.
    ///
    /// Rejected when `units` is zero or smaller than the live prefix.
    pub fn set_buffer(&mut self, units: usize) -> bool {
        if units == 0 || units < self.fend {
            return false;
        }
        let mut next = vec!['\0'; units];
        next[..self.fend].copy_from_slice(&self.buf[..self.fend]);
        self.buf = next;
        true
    }

    fn extend_region(&mut self) {
        let mut next = vec!['\0'; chunked(self.buf.len() + 1)];
        next[..self.fend].copy_from_slice(&self.buf[..self.fend]);
        self.buf = next;
    }

    /// Encode `[put_area_start, fend)` and write it back to the file:
    /// appended under `APP`, replacing the content otherwise. An empty
    /// conversion counts as failure.
    fn flush_buffer(&mut self) -> VfsResult<()> {
        let file = self
            .file
            .as_ref()
            .ok_or(VfsError::new(VfsErrorKind::Internal, "filebuf.flush"))?;
        let chars = &self.buf[self.put_area_start..self.fend];
        let bytes = encode_all(self.codec.as_deref(), &mut self.conv_state, chars).ok_or(
            VfsError::new(VfsErrorKind::IllegalSequence, "filebuf.flush.encode"),
        )?;
        if bytes.is_empty() {
            return Err(VfsError::new(VfsErrorKind::Internal, "filebuf.flush.empty"));
        }
        tracing::trace!(bytes = bytes.len(), append = self.mode.contains(OpenMode::APP), "flush");
        if self.mode.contains(OpenMode::APP) {
            file.append(&bytes)
        } else {
            file.write(&bytes)
        }
    }

    fn reset(&mut self) {
        self.file = None;
        self.mode = OpenMode::empty();
        self.conv_state = CodecState::default();
        self.pos_state = PosState::empty();
        self.putback = '\0';
        self.buf = Vec::new();
        self.pos = 0;
        self.fend = 0;
        self.put_area_start = 0;
    }
}

impl Default for FileBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FileBuf {
    fn drop(&mut self) {
        if self.file.is_some() {
            // Flush failure on drop (e.g. nothing to write) is unreportable.
            let _ = self.close();
        }
    }
}
