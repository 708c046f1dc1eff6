//! Property-based tests for the stream buffer and codecs.

use proptest::prelude::*;

use virtfs_buf::{decode_all, encode_all, CodecState, FileBuf, Utf8Codec};
use virtfs_core::{Filesystem, OpenMode, VfsPath};

fn stored_content(fs: &Filesystem, path: &str) -> Vec<u8> {
    fs.root()
        .lookup(&VfsPath::parse(path))
        .expect("file")
        .as_file()
        .expect("is file")
        .read_all()
}

proptest! {
    // P8: characters written through the buffer under the UTF-8 codec read
    // back identically through the same codec.
    #[test]
    fn utf8_stream_round_trip(text in "\\PC{1,64}") {
        let fs = Filesystem::new();

        let mut buf = FileBuf::with_codec(Box::new(Utf8Codec));
        buf.open(&fs, "doc", OpenMode::OUT).expect("open for write");
        prop_assert!(buf.put_str(&text));
        buf.close().expect("close flushes");
        prop_assert_eq!(stored_content(&fs, "doc"), text.as_bytes());

        let mut buf = FileBuf::with_codec(Box::new(Utf8Codec));
        buf.open(&fs, "doc", OpenMode::IN).expect("open for read");
        let read: String = std::iter::from_fn(|| buf.next()).collect();
        prop_assert_eq!(read, text);
    }

    // Raw (codec-free) streams round-trip arbitrary bytes one unit per
    // character.
    #[test]
    fn raw_stream_round_trip(bytes in prop::collection::vec(any::<u8>(), 1..128)) {
        let fs = Filesystem::new();
        let file = fs
            .root()
            .create_file(&VfsPath::parse("blob"), false)
            .expect("create");
        file.write(&bytes).expect("write");

        let mut buf = FileBuf::new();
        buf.open(&fs, "blob", OpenMode::IN).expect("open");
        let read: Vec<u8> = std::iter::from_fn(|| buf.next()).map(|ch| ch as u8).collect();
        prop_assert_eq!(read, bytes);
    }

    // The codec drivers invert each other regardless of how content is
    // chunked internally.
    #[test]
    fn codec_drivers_invert(text in "\\PC{0,200}") {
        let codec = Utf8Codec;
        let mut state = CodecState::default();
        let chars = decode_all(Some(&codec), &mut state, text.as_bytes())
            .expect("decode valid utf-8");
        let mut state = CodecState::default();
        let bytes = encode_all(Some(&codec), &mut state, &chars).expect("encode");
        prop_assert_eq!(bytes, text.as_bytes());
    }

    // P6 over arbitrary offsets: a seek from the start reports back clamped
    // into the content.
    #[test]
    fn tell_after_seek_is_clamped(len in 0usize..64, target in 0u64..256) {
        let fs = Filesystem::new();
        let file = fs
            .root()
            .create_file(&VfsPath::parse("f"), false)
            .expect("create");
        file.write(&vec![b'x'; len]).expect("write");

        let mut buf = FileBuf::new();
        buf.open(&fs, "f", OpenMode::IN).expect("open");
        buf.seek_off(std::io::SeekFrom::Start(target)).expect("seek");
        let told = buf
            .seek_off(std::io::SeekFrom::Current(0))
            .expect("tell");
        prop_assert_eq!(told, target.min(len as u64));
    }

    // P5 for content-preserving modes: open then close leaves content
    // untouched when nothing was written.
    #[test]
    fn preserving_open_close_keeps_content(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let fs = Filesystem::new();
        let file = fs
            .root()
            .create_file(&VfsPath::parse("f"), false)
            .expect("create");
        file.write(&bytes).expect("write");

        for mode in [OpenMode::IN, OpenMode::IN | OpenMode::ATE] {
            let mut buf = FileBuf::new();
            buf.open(&fs, "f", mode).expect("open");
            buf.close().expect("close");
            prop_assert_eq!(stored_content(&fs, "f"), bytes.clone());
        }
    }
}
