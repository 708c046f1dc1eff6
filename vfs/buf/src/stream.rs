//! User-facing stream wrappers.
//!
//! Thin shells over [`FileBuf`] that force the appropriate direction flag
//! at open, keep a sticky fail flag in place of exceptions, and expose the
//! buffer through `std::io::{Read, Write, Seek}`. Bytes crossing the trait
//! boundary are UTF-8; one staged character bridges partial reads and
//! writes.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use virtfs_core::{File, Filesystem, OpenMode, VfsError};

use crate::buffer::FileBuf;
use crate::codec::{utf8_step, Utf8Step};

fn to_io_error(err: VfsError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Up to one encoded character awaiting delivery to a byte-oriented reader.
#[derive(Clone, Copy, Debug, Default)]
struct OutStage {
    bytes: [u8; 4],
    len: u8,
    taken: u8,
}

impl OutStage {
    fn take(&mut self) -> Option<u8> {
        if self.taken >= self.len {
            return None;
        }
        let byte = self.bytes[self.taken as usize];
        self.taken += 1;
        Some(byte)
    }

    fn fill(&mut self, ch: char) {
        let s = ch.encode_utf8(&mut self.bytes);
        self.len = s.len() as u8;
        self.taken = 0;
    }
}

/// Up to one partial UTF-8 sequence received from a byte-oriented writer.
#[derive(Clone, Copy, Debug, Default)]
struct InStage {
    bytes: [u8; 4],
    len: u8,
}

fn read_bytes(buf: &mut FileBuf, stage: &mut OutStage, out: &mut [u8]) -> usize {
    let mut n = 0usize;
    while n < out.len() {
        if let Some(byte) = stage.take() {
            out[n] = byte;
            n += 1;
            continue;
        }
        let Some(ch) = buf.next() else { break };
        let len = ch.len_utf8();
        if n + len <= out.len() {
            ch.encode_utf8(&mut out[n..n + len]);
            n += len;
        } else {
            stage.fill(ch);
        }
    }
    n
}

fn write_bytes(buf: &mut FileBuf, stage: &mut InStage, bytes: &[u8]) -> io::Result<usize> {
    let mut offset = 0usize;

    // Finish a sequence split across write calls.
    while stage.len > 0 {
        let Some(&byte) = bytes.get(offset) else {
            return Ok(bytes.len());
        };
        stage.bytes[stage.len as usize] = byte;
        stage.len += 1;
        offset += 1;
        match utf8_step(&stage.bytes[..stage.len as usize]) {
            Utf8Step::Char(ch, len) if len == stage.len as usize => {
                stage.len = 0;
                put_checked(buf, ch)?;
            }
            Utf8Step::Incomplete => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid utf-8 in stream write",
                ));
            }
        }
    }

    while offset < bytes.len() {
        match utf8_step(&bytes[offset..]) {
            Utf8Step::Char(ch, len) => {
                put_checked(buf, ch)?;
                offset += len;
            }
            Utf8Step::Incomplete => {
                let rest = &bytes[offset..];
                stage.bytes[..rest.len()].copy_from_slice(rest);
                stage.len = rest.len() as u8;
                offset = bytes.len();
            }
            Utf8Step::Invalid => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid utf-8 in stream write",
                ));
            }
            Utf8Step::Empty => break,
        }
    }
    Ok(bytes.len())
}

fn put_checked(buf: &mut FileBuf, ch: char) -> io::Result<()> {
    if buf.put(ch) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "stream buffer rejected the write",
        ))
    }
}

macro_rules! stream_common {
    ($name:ident) => {
        impl $name {
            pub fn is_open(&self) -> bool {
                self.buf.is_open()
            }

            /// True after a failed open, close, or flush.
            pub fn fail(&self) -> bool {
                self.fail
            }

            /// Clear the sticky fail flag.
            pub fn clear_fail(&mut self) {
                self.fail = false;
            }

            pub fn buf(&self) -> &FileBuf {
                &self.buf
            }

            pub fn buf_mut(&mut self) -> &mut FileBuf {
                &mut self.buf
            }

            /// The file this stream is mounted on, while open.
            pub fn file(&self) -> Option<&Arc<File>> {
                self.buf.file()
            }

            pub fn close(&mut self) {
                if self.buf.close().is_err() {
                    self.fail = true;
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

/// Character input stream over a file; opening always adds `IN`.
pub struct FileReader {
    buf: FileBuf,
    fail: bool,
    stage: OutStage,
}

impl FileReader {
    pub fn new() -> Self {
        Self {
            buf: FileBuf::new(),
            fail: false,
            stage: OutStage::default(),
        }
    }

    pub fn open(&mut self, fs: &Filesystem, path: &str, mode: OpenMode) {
        if self.buf.open(fs, path, mode | OpenMode::IN).is_err() {
            self.fail = true;
        }
    }

    pub fn read_char(&mut self) -> Option<char> {
        self.buf.next()
    }
}

stream_common!(FileReader);

impl Read for FileReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        Ok(read_bytes(&mut self.buf, &mut self.stage, out))
    }
}

/// Character output stream over a file; opening always adds `OUT`.
pub struct FileWriter {
    buf: FileBuf,
    fail: bool,
    stage: InStage,
}

impl FileWriter {
    pub fn new() -> Self {
        Self {
            buf: FileBuf::new(),
            fail: false,
            stage: InStage::default(),
        }
    }

    pub fn open(&mut self, fs: &Filesystem, path: &str, mode: OpenMode) {
        if self.buf.open(fs, path, mode | OpenMode::OUT).is_err() {
            self.fail = true;
        }
    }

    pub fn write_char(&mut self, ch: char) -> bool {
        self.buf.put(ch)
    }

    pub fn write_str(&mut self, s: &str) -> bool {
        self.buf.put_str(s)
    }
}

stream_common!(FileWriter);

impl Write for FileWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        write_bytes(&mut self.buf, &mut self.stage, bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buf.sync().map_err(to_io_error)
    }
}

/// Bidirectional stream over a file; the caller picks the direction flags.
pub struct FileStream {
    buf: FileBuf,
    fail: bool,
    out_stage: OutStage,
    in_stage: InStage,
}

impl FileStream {
    pub fn new() -> Self {
        Self {
            buf: FileBuf::new(),
            fail: false,
            out_stage: OutStage::default(),
            in_stage: InStage::default(),
        }
    }

    pub fn open(&mut self, fs: &Filesystem, path: &str, mode: OpenMode) {
        if self.buf.open(fs, path, mode).is_err() {
            self.fail = true;
        }
    }

    pub fn read_char(&mut self) -> Option<char> {
        self.buf.next()
    }

    pub fn write_char(&mut self, ch: char) -> bool {
        self.buf.put(ch)
    }
}

stream_common!(FileStream);

impl Read for FileStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        Ok(read_bytes(&mut self.buf, &mut self.out_stage, out))
    }
}

impl Write for FileStream {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        write_bytes(&mut self.buf, &mut self.in_stage, bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buf.sync().map_err(to_io_error)
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek_off(pos).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek on a closed or broken stream",
            )
        })
    }
}
