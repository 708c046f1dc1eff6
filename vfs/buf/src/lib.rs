//! Buffered character streams over the `virtfs-core` in-memory tree.
//!
//! The centerpiece is [`FileBuf`], a stream buffer that overlays a growable
//! character region onto one file: open modes, get/put areas, putback,
//! seeking, and codec-mediated conversion between the file's byte form and
//! the buffer's character form. [`FileReader`], [`FileWriter`], and
//! [`FileStream`] wrap it behind `std::io` traits.

pub mod bridge;
pub mod buffer;
pub mod codec;
pub mod stream;

pub use bridge::{decode_all, encode_all};
pub use buffer::FileBuf;
pub use codec::{Codec, CodecState, CodecStatus, Conversion, IdentityCodec, Utf8Codec};
pub use stream::{FileReader, FileStream, FileWriter};
