use bytes::{Bytes, BytesMut};
use log::trace;

/// Encodes `text` as a UTF-8 chunk.
pub fn encode_text(text: &str) -> Bytes {
    Bytes::copy_from_slice(text.as_bytes())
}

/// Decodes a complete UTF-8 chunk, replacing invalid sequences with U+FFFD.
///
/// Use [`TextDecoder`] when the input arrives in pieces.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Streaming UTF-8 decoder.
///
/// A chunk boundary may fall inside a multi-byte sequence. Those trailing bytes are
/// held back and prepended to the next chunk, so the decoded text is identical to
/// decoding the concatenated input in one go. Sequences that are invalid rather than
/// incomplete are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct TextDecoder {
    pending: BytesMut,
}

impl TextDecoder {
    /// Creates a decoder with nothing held back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk`, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let mut out = String::with_capacity(buf.len());
        let mut rest = &buf[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid..];
                        }
                        None => {
                            trace!("holding back {} bytes of a split sequence", after.len());
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Returns `true` if bytes of an incomplete sequence are held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Ends decoding, handing back any bytes that never formed a complete character.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.split().freeze())
        }
    }
}
