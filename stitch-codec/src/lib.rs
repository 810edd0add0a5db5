//! # stitch-codec - Text Codec for Byte Streams
//!
//! `stitch-codec` converts between the `Bytes` chunks carried by stitch streams and
//! the text that injection stages splice into them.
//!
//! - [`encode_text`] / [`decode_text`]: one-shot, stateless conversions
//! - [`TextDecoder`]: a streaming decoder that carries a multi-byte UTF-8 sequence
//!   split across two chunks over to the next call instead of mangling it
//!
//! ```rust
//! use stitch_codec::{TextDecoder, encode_text};
//!
//! let bytes = encode_text("héllo");
//! let (head, tail) = bytes.split_at(2); // splits the 2-byte 'é'
//!
//! let mut decoder = TextDecoder::new();
//! let mut text = decoder.decode(head);
//! text.push_str(&decoder.decode(tail));
//! assert_eq!(text, "héllo");
//! assert!(decoder.finish().is_none());
//! ```

#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

/// UTF-8 encoding and streaming decoding
pub mod text;

pub use text::{TextDecoder, decode_text, encode_text};
