//! Pluggable byte/character converters.
//!
//! A [`Codec`] translates between the external byte form of a file and the
//! internal character form of a stream buffer, in chunks, carrying state so
//! multibyte sequences split across chunk boundaries reassemble correctly.
//! The locale-free default is no codec at all, which the buffer treats as a
//! raw unit-for-unit copy.

/// Result classification of one conversion call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecStatus {
    /// All consumable input was converted.
    Ok,
    /// Conversion stopped early: destination full or input ended inside a
    /// multibyte sequence (the remainder is carried in the state).
    Partial,
    /// This codec performs no conversion; the caller should copy raw.
    NoConv,
    /// The input cannot be converted.
    Error,
}

/// Outcome of one conversion call: status plus progress counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub status: CodecStatus,
    /// Source units consumed (bytes for decode, chars for encode).
    pub consumed: usize,
    /// Destination units produced (chars for decode, bytes for encode).
    pub produced: usize,
}

impl Conversion {
    pub fn new(status: CodecStatus, consumed: usize, produced: usize) -> Self {
        Self {
            status,
            consumed,
            produced,
        }
    }
}

/// Running conversion state: at most one partial multibyte sequence.
#[derive(Clone, Debug, Default)]
pub struct CodecState {
    pending: [u8; 4],
    pending_len: u8,
}

impl CodecState {
    pub fn is_clear(&self) -> bool {
        self.pending_len == 0
    }

    pub fn clear(&mut self) {
        self.pending_len = 0;
    }

    fn push(&mut self, byte: u8) {
        self.pending[self.pending_len as usize] = byte;
        self.pending_len += 1;
    }

    fn pending(&self) -> &[u8] {
        &self.pending[..self.pending_len as usize]
    }
}

/// A stateful byte/character converter.
pub trait Codec {
    /// True when conversion is always the identity; such codecs are dropped
    /// by the buffer in favor of the raw-copy fast path.
    fn always_noconv(&self) -> bool {
        false
    }

    /// Convert external bytes into characters.
    fn decode(&self, state: &mut CodecState, src: &[u8], dst: &mut [char]) -> Conversion;

    /// Convert characters into external bytes.
    fn encode(&self, state: &mut CodecState, src: &[char], dst: &mut [u8]) -> Conversion;
}

/// One decoding step over the front of a byte slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Utf8Step {
    Char(char, usize),
    Incomplete,
    Invalid,
    Empty,
}

pub(crate) fn utf8_step(bytes: &[u8]) -> Utf8Step {
    let Some(&first) = bytes.first() else {
        return Utf8Step::Empty;
    };
    let len = match first {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Utf8Step::Invalid,
    };
    if bytes.len() < len {
        return match std::str::from_utf8(bytes) {
            Err(err) if err.error_len().is_none() => Utf8Step::Incomplete,
            _ => Utf8Step::Invalid,
        };
    }
    match std::str::from_utf8(&bytes[..len]) {
        Ok(s) => match s.chars().next() {
            Some(ch) => Utf8Step::Char(ch, len),
            None => Utf8Step::Invalid,
        },
        Err(_) => Utf8Step::Invalid,
    }
}

/// UTF-8 codec: external bytes are UTF-8, internal units are Unicode
/// scalars. Sequences split across chunks are carried in the state.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Codec;

impl Codec for Utf8Codec {
    fn decode(&self, state: &mut CodecState, src: &[u8], dst: &mut [char]) -> Conversion {
        let mut consumed = 0usize;
        let mut produced = 0usize;

        // Finish a sequence carried over from the previous chunk.
        while !state.is_clear() {
            if produced >= dst.len() {
                return Conversion::new(CodecStatus::Partial, consumed, produced);
            }
            let Some(&byte) = src.get(consumed) else {
                return Conversion::new(CodecStatus::Partial, consumed, produced);
            };
            state.push(byte);
            consumed += 1;
            match utf8_step(state.pending()) {
                Utf8Step::Char(ch, len) if len == state.pending().len() => {
                    state.clear();
                    dst[produced] = ch;
                    produced += 1;
                }
                Utf8Step::Incomplete => {}
                _ => return Conversion::new(CodecStatus::Error, consumed, produced),
            }
        }

        while produced < dst.len() {
            match utf8_step(&src[consumed..]) {
                Utf8Step::Empty => return Conversion::new(CodecStatus::Ok, consumed, produced),
                Utf8Step::Char(ch, len) => {
                    dst[produced] = ch;
                    produced += 1;
                    consumed += len;
                }
                Utf8Step::Incomplete => {
                    // Stash the truncated tail so the next chunk can finish it.
                    for &byte in &src[consumed..] {
                        state.push(byte);
                    }
                    consumed = src.len();
                    return Conversion::new(CodecStatus::Partial, consumed, produced);
                }
                Utf8Step::Invalid => {
                    return Conversion::new(CodecStatus::Error, consumed, produced);
                }
            }
        }

        let status = if consumed == src.len() {
            CodecStatus::Ok
        } else {
            CodecStatus::Partial
        };
        Conversion::new(status, consumed, produced)
    }

    fn encode(&self, _state: &mut CodecState, src: &[char], dst: &mut [u8]) -> Conversion {
        let mut consumed = 0usize;
        let mut produced = 0usize;
        for &ch in src {
            let len = ch.len_utf8();
            if produced + len > dst.len() {
                return Conversion::new(CodecStatus::Partial, consumed, produced);
            }
            ch.encode_utf8(&mut dst[produced..produced + len]);
            produced += len;
            consumed += 1;
        }
        Conversion::new(CodecStatus::Ok, consumed, produced)
    }
}

/// The identity codec; always reports `NoConv`.
///
/// Installing it through `imbue` is equivalent to removing the codec: the
/// buffer recognizes `always_noconv` and takes the raw-copy fast path.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn always_noconv(&self) -> bool {
        true
    }

    fn decode(&self, _state: &mut CodecState, _src: &[u8], _dst: &mut [char]) -> Conversion {
        Conversion::new(CodecStatus::NoConv, 0, 0)
    }

    fn encode(&self, _state: &mut CodecState, _src: &[char], _dst: &mut [u8]) -> Conversion {
        Conversion::new(CodecStatus::NoConv, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_decodes_ascii() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let mut dst = ['\0'; 8];
        let conv = codec.decode(&mut state, b"abc", &mut dst);
        assert_eq!(conv.status, CodecStatus::Ok);
        assert_eq!(conv.consumed, 3);
        assert_eq!(conv.produced, 3);
        assert_eq!(&dst[..3], &['a', 'b', 'c']);
    }

    #[test]
    fn utf8_carries_split_sequence_across_calls() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let mut dst = ['\0'; 8];

        // "é" (0xc3 0xa9) split across two chunks.
        let conv = codec.decode(&mut state, b"caf\xc3", &mut dst);
        assert_eq!(conv.status, CodecStatus::Partial);
        assert_eq!(conv.consumed, 4);
        assert_eq!(conv.produced, 3);
        assert!(!state.is_clear());

        let conv = codec.decode(&mut state, b"\xa9!", &mut dst);
        assert_eq!(conv.status, CodecStatus::Ok);
        assert_eq!(conv.produced, 2);
        assert_eq!(&dst[..2], &['\u{e9}', '!']);
        assert!(state.is_clear());
    }

    #[test]
    fn utf8_rejects_invalid_sequences() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let mut dst = ['\0'; 4];
        let conv = codec.decode(&mut state, b"\xff", &mut dst);
        assert_eq!(conv.status, CodecStatus::Error);

        let mut state = CodecState::default();
        let conv = codec.decode(&mut state, b"\xc3", &mut dst);
        assert_eq!(conv.status, CodecStatus::Partial);
        let conv = codec.decode(&mut state, b"x", &mut dst);
        assert_eq!(conv.status, CodecStatus::Error);
    }

    #[test]
    fn utf8_reports_partial_on_full_destination() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let mut dst = ['\0'; 2];
        let conv = codec.decode(&mut state, b"abcd", &mut dst);
        assert_eq!(conv.status, CodecStatus::Partial);
        assert_eq!(conv.consumed, 2);
        assert_eq!(conv.produced, 2);
    }

    #[test]
    fn utf8_encodes_multibyte() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let mut dst = [0u8; 8];
        let conv = codec.encode(&mut state, &['\u{e9}', 'x'], &mut dst);
        assert_eq!(conv.status, CodecStatus::Ok);
        assert_eq!(conv.produced, 3);
        assert_eq!(&dst[..3], b"\xc3\xa9x");
    }

    #[test]
    fn utf8_encode_partial_when_destination_short() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let mut dst = [0u8; 1];
        let conv = codec.encode(&mut state, &['\u{e9}'], &mut dst);
        assert_eq!(conv.status, CodecStatus::Partial);
        assert_eq!(conv.consumed, 0);
        assert_eq!(conv.produced, 0);
    }

    #[test]
    fn identity_reports_noconv() {
        let codec = IdentityCodec;
        assert!(codec.always_noconv());
        let mut state = CodecState::default();
        let mut dst = ['\0'; 1];
        assert_eq!(
            codec.decode(&mut state, b"x", &mut dst).status,
            CodecStatus::NoConv
        );
    }
}
