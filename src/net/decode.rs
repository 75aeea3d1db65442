//! Streaming read decoders.
//!
//! A decoder sees the filled region of the read buffer and returns a payload
//! plus the number of bytes it consumed. Unconsumed bytes stay at the front of
//! the buffer and are offered again with the next chunk.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid UTF-8 sequence at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("read buffer full with {buffered} undecodable bytes")]
    BufferFull { buffered: usize },

    #[error("stream ended with {buffered} undecoded bytes")]
    Trailing { buffered: usize },
}

/// Turns raw bytes into read payloads.
pub trait Decoder: Send + 'static {
    type Output: Send + 'static;

    /// Decode a prefix of `filled`. Returns the payload and bytes consumed.
    fn decode(&mut self, filled: &[u8]) -> Result<(Self::Output, usize), DecodeError>;
}

/// Passes bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl Decoder for BytesDecoder {
    type Output = Vec<u8>;

    fn decode(&mut self, filled: &[u8]) -> Result<(Vec<u8>, usize), DecodeError> {
        Ok((filled.to_vec(), filled.len()))
    }
}

/// Decodes UTF-8 text.
///
/// A multi-byte sequence split across reads is held back until the rest
/// arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Decoder;

impl Decoder for Utf8Decoder {
    type Output = String;

    fn decode(&mut self, filled: &[u8]) -> Result<(String, usize), DecodeError> {
        match std::str::from_utf8(filled) {
            Ok(text) => Ok((text.to_owned(), filled.len())),
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&filled[..valid]).into_owned();
                Ok((text, valid))
            }
            Err(e) => Err(DecodeError::InvalidUtf8 {
                offset: e.valid_up_to(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_consume_everything() {
        let (out, used) = BytesDecoder.decode(b"abc").unwrap();
        assert_eq!(out, b"abc");
        assert_eq!(used, 3);
    }

    #[test]
    fn utf8_holds_back_split_sequence() {
        let euro = "€".as_bytes();
        let mut chunk = b"ab".to_vec();
        chunk.extend_from_slice(&euro[..2]);

        let (out, used) = Utf8Decoder.decode(&chunk).unwrap();
        assert_eq!(out, "ab");
        assert_eq!(used, 2);

        let mut rest = euro[..2].to_vec();
        rest.push(euro[2]);
        let (out, used) = Utf8Decoder.decode(&rest).unwrap();
        assert_eq!(out, "€");
        assert_eq!(used, 3);
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        let err = Utf8Decoder.decode(b"ok\xffno").unwrap_err();
        assert_eq!(err, DecodeError::InvalidUtf8 { offset: 2 });
        assert_eq!(err.to_string(), "invalid UTF-8 sequence at byte 2");
    }
}
