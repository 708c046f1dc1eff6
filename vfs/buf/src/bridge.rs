//! Streaming drivers over a [`Codec`].
//!
//! Both drivers loop a fixed-size scratch area over the input, appending
//! each converted chunk and advancing, so arbitrarily long content converts
//! with bounded intermediate storage. Conversion state lives with the
//! caller and is retained across calls, which lets multibyte sequences
//! split across flushes reassemble.

use crate::codec::{Codec, CodecState, CodecStatus};

/// Scratch area size, in destination units, for one conversion step.
const SCRATCH_UNITS: usize = 256;

/// Convert external bytes into characters; `None` on conversion failure.
///
/// With no codec the copy is raw: each byte becomes the character with the
/// same scalar value. A `NoConv` verdict from the codec abandons whatever
/// accumulated and raw-copies the remaining input.
pub fn decode_all(
    codec: Option<&dyn Codec>,
    state: &mut CodecState,
    bytes: &[u8],
) -> Option<Vec<char>> {
    let Some(codec) = codec else {
        return Some(raw_decode(bytes));
    };

    let mut out = Vec::with_capacity(bytes.len());
    let mut offset = 0usize;
    while offset < bytes.len() {
        let mut scratch = ['\0'; SCRATCH_UNITS];
        let conv = codec.decode(state, &bytes[offset..], &mut scratch);
        match conv.status {
            CodecStatus::Ok | CodecStatus::Partial => {
                if conv.consumed == 0 && conv.produced == 0 {
                    return None; // no forward progress
                }
                out.extend_from_slice(&scratch[..conv.produced]);
                offset += conv.consumed;
            }
            CodecStatus::NoConv => return Some(raw_decode(&bytes[offset..])),
            CodecStatus::Error => return None,
        }
    }
    Some(out)
}

/// Convert characters into external bytes; `None` on conversion failure.
pub fn encode_all(
    codec: Option<&dyn Codec>,
    state: &mut CodecState,
    chars: &[char],
) -> Option<Vec<u8>> {
    let Some(codec) = codec else {
        return Some(raw_encode(chars));
    };

    let mut out = Vec::with_capacity(chars.len());
    let mut offset = 0usize;
    while offset < chars.len() {
        let mut scratch = [0u8; SCRATCH_UNITS];
        let conv = codec.encode(state, &chars[offset..], &mut scratch);
        match conv.status {
            CodecStatus::Ok | CodecStatus::Partial => {
                if conv.consumed == 0 && conv.produced == 0 {
                    return None;
                }
                out.extend_from_slice(&scratch[..conv.produced]);
                offset += conv.consumed;
            }
            CodecStatus::NoConv => return Some(raw_encode(&chars[offset..])),
            CodecStatus::Error => return None,
        }
    }
    Some(out)
}

fn raw_decode(bytes: &[u8]) -> Vec<char> {
    bytes.iter().map(|&b| b as char).collect()
}

fn raw_encode(chars: &[char]) -> Vec<u8> {
    chars.iter().map(|&ch| ch as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{IdentityCodec, Utf8Codec};

    #[test]
    fn raw_copy_without_codec() {
        let mut state = CodecState::default();
        let chars = decode_all(None, &mut state, b"\x00a\xff").expect("decode");
        assert_eq!(chars, ['\0', 'a', '\u{ff}']);

        let bytes = encode_all(None, &mut state, &chars).expect("encode");
        assert_eq!(bytes, b"\x00a\xff");
    }

    #[test]
    fn utf8_round_trip_through_drivers() {
        let codec = Utf8Codec;
        let text = "gr\u{fc}ner Apfel \u{1f34f}";

        let mut state = CodecState::default();
        let chars =
            decode_all(Some(&codec), &mut state, text.as_bytes()).expect("decode");
        assert_eq!(chars, text.chars().collect::<Vec<_>>());

        let mut state = CodecState::default();
        let bytes = encode_all(Some(&codec), &mut state, &chars).expect("encode");
        assert_eq!(bytes, text.as_bytes());
    }

    #[test]
    fn long_input_crosses_scratch_boundaries() {
        let codec = Utf8Codec;
        let text = "\u{e9}".repeat(1000); // 2 bytes per char, > one scratch
        let mut state = CodecState::default();
        let chars =
            decode_all(Some(&codec), &mut state, text.as_bytes()).expect("decode");
        assert_eq!(chars.len(), 1000);
        assert!(chars.iter().all(|&ch| ch == '\u{e9}'));
    }

    #[test]
    fn invalid_input_fails() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        assert!(decode_all(Some(&codec), &mut state, b"ok\xffbad").is_none());
    }

    #[test]
    fn noconv_codec_falls_back_to_raw() {
        let codec = IdentityCodec;
        let mut state = CodecState::default();
        let chars = decode_all(Some(&codec), &mut state, b"xyz").expect("decode");
        assert_eq!(chars, ['x', 'y', 'z']);
    }

    #[test]
    fn state_persists_between_driver_calls() {
        let codec = Utf8Codec;
        let mut state = CodecState::default();

        let first = decode_all(Some(&codec), &mut state, b"a\xc3").expect("first half");
        assert_eq!(first, ['a']);
        assert!(!state.is_clear());

        let second = decode_all(Some(&codec), &mut state, b"\xa9b").expect("second half");
        assert_eq!(second, ['\u{e9}', 'b']);
        assert!(state.is_clear());
    }
}
