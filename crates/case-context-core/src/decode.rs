//! Content normalizer: raw bytes to UTF-8 text.
//!
//! Reference folders mix files saved by different editors over many years,
//! so a single encoding cannot be assumed. Decoding walks an explicit,
//! ordered chain of [`Decoder`]s. Every attempt returns a tagged
//! [`DecodeAttempt`] instead of silently substituting replacement
//! characters; the first decoder that accepts the bytes wins.
//!
//! # Default chain
//!
//! 1. **UTF-8**, strict. A leading byte-order mark is stripped.
//! 2. **GB18030**, strict. Under the WHATWG encoding standard the GBK and
//!    GB2312 labels share this decoder, so one attempt covers all three
//!    legacy simplified-Chinese encodings.
//! 3. **Windows-1252**, the permissive single-byte fallback. It maps every
//!    byte.
//!
//! Each step only accepts output free of control characters other than tab,
//! line feed, carriage return and form feed. NUL-laden or escape-laden
//! binary data is rejected even where it happens to be well-formed UTF-8 or
//! GB18030.
//!
//! # Example
//!
//! ```rust
//! use case_context_core::decode::decode_bytes;
//!
//! let decoded = decode_bytes("数据库".as_bytes()).unwrap();
//! assert_eq!(decoded.text, "数据库");
//! assert_eq!(decoded.encoding, "UTF-8");
//! ```

use crate::error::DecodeError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One step in the decoding chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Utf8,
    Gb18030,
    Windows1252,
}

/// Outcome of a single decoder attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeAttempt {
    Decoded(String),
    Rejected,
}

/// Successfully decoded content together with the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
}

const DEFAULT_CHAIN: [Decoder; 3] = [Decoder::Utf8, Decoder::Gb18030, Decoder::Windows1252];

impl Decoder {
    /// The chain used for corpus files, in attempt order.
    pub fn default_chain() -> &'static [Decoder] {
        &DEFAULT_CHAIN
    }

    /// Display name of the encoding.
    pub fn name(self) -> &'static str {
        match self {
            Decoder::Utf8 => "UTF-8",
            Decoder::Gb18030 => "GB18030",
            Decoder::Windows1252 => "windows-1252",
        }
    }

    /// Try to decode `bytes` with this decoder only.
    ///
    /// Every decoder rejects output containing control characters other
    /// than tab, line feed, carriage return and form feed.
    pub fn attempt(self, bytes: &[u8]) -> DecodeAttempt {
        let text = match self {
            Decoder::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            Decoder::Gb18030 => encoding_rs::GB18030
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            Decoder::Windows1252 => {
                let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
                Some(text.into_owned())
            }
        };
        match text {
            Some(text) if !text.chars().any(is_disallowed_control) => DecodeAttempt::Decoded(text),
            _ => DecodeAttempt::Rejected,
        }
    }
}

fn is_disallowed_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\u{0C}')
}

/// Decode with the default chain.
pub fn decode_bytes(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    decode_with(Decoder::default_chain(), bytes)
}

/// Decode with an explicit chain, returning the first accepted result.
pub fn decode_with(chain: &[Decoder], bytes: &[u8]) -> Result<Decoded, DecodeError> {
    let mut tried = Vec::with_capacity(chain.len());
    for decoder in chain {
        match decoder.attempt(bytes) {
            DecodeAttempt::Decoded(text) => {
                return Ok(Decoded {
                    text,
                    encoding: decoder.name(),
                })
            }
            DecodeAttempt::Rejected => tried.push(decoder.name()),
        }
    }
    Err(DecodeError::Undecodable { tried })
}
