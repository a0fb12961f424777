//! Incremental text codecs for the channel.
//!
//! The decoder buffers partial multi-byte sequences between reads and
//! replaces malformed input with U+FFFD. The encoder replaces characters the
//! target encoding cannot represent with `?`.

use crate::domain::error::{LinkTermError, LinkTermResult};
use encoding_rs::{CoderResult, Decoder, Encoder, EncoderResult, Encoding};
use std::fmt;

const HEXLIFY: &str = "hexlify";

/// A named text encoding usable on either direction of the channel
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TextCodec {
    Encoding(&'static Encoding),
    /// Bytes shown as space separated hex pairs; typed hex digits sent as bytes
    Hexlify,
}

impl TextCodec {
    /// Look up a codec by label (`utf-8`, `latin1`, `hexlify`, ...)
    pub fn for_label(label: &str) -> LinkTermResult<Self> {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case(HEXLIFY) {
            return Ok(TextCodec::Hexlify);
        }
        Encoding::for_label(trimmed.as_bytes())
            .map(TextCodec::Encoding)
            .ok_or_else(|| LinkTermError::UnknownEncoding(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextCodec::Encoding(encoding) => encoding.name(),
            TextCodec::Hexlify => HEXLIFY,
        }
    }

    pub fn decoder(&self) -> RxDecoder {
        match self {
            TextCodec::Encoding(encoding) => RxDecoder::Text(encoding.new_decoder()),
            TextCodec::Hexlify => RxDecoder::Hexlify,
        }
    }

    pub fn encoder(&self) -> TxEncoder {
        match self {
            TextCodec::Encoding(encoding) => TxEncoder::Text(encoding.new_encoder()),
            TextCodec::Hexlify => TxEncoder::Hexlify { high: None },
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        TextCodec::Encoding(encoding_rs::UTF_8)
    }
}

impl fmt::Debug for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextCodec({})", self.name())
    }
}

impl fmt::Display for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Incremental decoder for bytes received from the channel
pub enum RxDecoder {
    Text(Decoder),
    Hexlify,
}

impl RxDecoder {
    /// Decode one chunk. Incomplete trailing sequences are kept for the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        match self {
            RxDecoder::Text(decoder) => {
                let mut out = String::new();
                let mut src = bytes;
                loop {
                    let needed = decoder
                        .max_utf8_buffer_length(src.len())
                        .unwrap_or(src.len() * 3 + 16);
                    out.reserve(needed);
                    let (result, read, _replaced) = decoder.decode_to_string(src, &mut out, false);
                    src = &src[read..];
                    match result {
                        CoderResult::InputEmpty => break,
                        CoderResult::OutputFull => continue,
                    }
                }
                out
            }
            RxDecoder::Hexlify => {
                let mut out = String::with_capacity(bytes.len() * 3);
                for byte in bytes {
                    out.push_str(&hex::encode_upper([*byte]));
                    out.push(' ');
                }
                out
            }
        }
    }
}

impl fmt::Debug for RxDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RxDecoder::Text(decoder) => write!(f, "RxDecoder({})", decoder.encoding().name()),
            RxDecoder::Hexlify => write!(f, "RxDecoder({})", HEXLIFY),
        }
    }
}

/// Incremental encoder for text sent to the channel
pub enum TxEncoder {
    Text(Encoder),
    Hexlify { high: Option<u8> },
}

impl TxEncoder {
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        match self {
            TxEncoder::Text(encoder) => {
                let mut out = Vec::new();
                let mut src = text;
                loop {
                    let needed = encoder
                        .max_buffer_length_from_utf8_without_replacement(src.len())
                        .unwrap_or(src.len() * 4 + 16);
                    out.reserve(needed);
                    let (result, read) =
                        encoder.encode_from_utf8_to_vec_without_replacement(src, &mut out, false);
                    src = &src[read..];
                    match result {
                        EncoderResult::InputEmpty => break,
                        EncoderResult::OutputFull => continue,
                        EncoderResult::Unmappable(_) => out.push(b'?'),
                    }
                }
                out
            }
            TxEncoder::Hexlify { high } => {
                let mut out = Vec::new();
                for c in text.chars() {
                    if let Some(nibble) = c.to_digit(16) {
                        let nibble = nibble as u8;
                        match high.take() {
                            Some(upper) => out.push(upper << 4 | nibble),
                            None => *high = Some(nibble),
                        }
                    } else if c == ' ' {
                        // a space separates values; a dangling half byte is dropped
                        *high = None;
                    }
                }
                out
            }
        }
    }
}

impl fmt::Debug for TxEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxEncoder::Text(encoder) => write!(f, "TxEncoder({})", encoder.encoding().name()),
            TxEncoder::Hexlify { high } => write!(f, "TxEncoder({}, pending={:?})", HEXLIFY, high),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(TextCodec::for_label("utf-8").unwrap().name(), "UTF-8");
        assert_eq!(TextCodec::for_label("UTF8").unwrap().name(), "UTF-8");
        assert_eq!(TextCodec::for_label("latin1").unwrap().name(), "windows-1252");
        assert_eq!(TextCodec::for_label("HEXLIFY").unwrap(), TextCodec::Hexlify);
        assert!(matches!(
            TextCodec::for_label("klingon"),
            Err(LinkTermError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_split_utf8_sequence() {
        let whole = "grüß €".as_bytes();
        let mut reference = TextCodec::default().decoder();
        let expected = reference.decode(whole);
        assert_eq!(expected, "grüß €");

        // '€' is three bytes; split it after the first one
        let split = whole.len() - 2;
        let mut decoder = TextCodec::default().decoder();
        let mut text = decoder.decode(&whole[..split]);
        assert_eq!(text, "grüß ");
        text.push_str(&decoder.decode(&whole[split..]));
        assert_eq!(text, expected);
    }

    #[test]
    fn test_byte_by_byte_decoding() {
        let mut decoder = TextCodec::default().decoder();
        let text: String = "日本".bytes().map(|b| decoder.decode(&[b])).collect();
        assert_eq!(text, "日本");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut decoder = TextCodec::default().decoder();
        assert_eq!(decoder.decode(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn test_single_byte_encoding() {
        let codec = TextCodec::for_label("latin1").unwrap();
        assert_eq!(codec.decoder().decode(&[0xe9]), "é");
        assert_eq!(codec.encoder().encode("é€"), vec![0xe9, 0x80]);
        // not representable in windows-1252
        assert_eq!(codec.encoder().encode("a日b"), b"a?b".to_vec());
    }

    #[test]
    fn test_utf8_encoder() {
        let mut encoder = TextCodec::default().encoder();
        assert_eq!(encoder.encode("a\r\n"), b"a\r\n".to_vec());
        assert_eq!(encoder.encode("ü"), vec![0xc3, 0xbc]);
    }

    #[test]
    fn test_hexlify_decode() {
        let mut decoder = TextCodec::Hexlify.decoder();
        assert_eq!(decoder.decode(&[0x00, 0xab, 0x41]), "00 AB 41 ");
    }

    #[test]
    fn test_hexlify_encode_across_calls() {
        let mut encoder = TextCodec::Hexlify.encoder();
        assert_eq!(encoder.encode("4"), Vec::<u8>::new());
        assert_eq!(encoder.encode("1"), vec![0x41]);
        assert_eq!(encoder.encode("de AD"), vec![0xde, 0xad]);
        // a space drops a half-typed value; other characters are ignored
        assert_eq!(encoder.encode("f 0x1"), vec![0x01]);
    }
}
