// src/core/shebang.rs

//! Reads the first line of a script, in whatever Unicode encoding its byte-order
//! mark announces.

use crate::constants::SHEBANG_HEAD_SIZE;
use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

/// Text encodings a script head may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl TextEncoding {
    /// Size of one code unit in bytes.
    fn unit_size(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16Le | Self::Utf16Be => 2,
            Self::Utf32Le | Self::Utf32Be => 4,
        }
    }

    /// Bytes that follow the first byte of a `\r`/`\n` unit. Only little-endian
    /// encodings put the significant byte first.
    fn terminator_tail(self) -> usize {
        match self {
            Self::Utf16Le => 1,
            Self::Utf32Le => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf32Le => "UTF-32LE",
            Self::Utf32Be => "UTF-32BE",
        };
        f.write_str(name)
    }
}

// Longer marks first: FF FE 00 00 must not be taken for UTF-16LE.
const BOMS: [(&[u8], TextEncoding); 5] = [
    (&[0xFF, 0xFE, 0x00, 0x00], TextEncoding::Utf32Le),
    (&[0x00, 0x00, 0xFE, 0xFF], TextEncoding::Utf32Be),
    (&[0xEF, 0xBB, 0xBF], TextEncoding::Utf8),
    (&[0xFF, 0xFE], TextEncoding::Utf16Le),
    (&[0xFE, 0xFF], TextEncoding::Utf16Be),
];

/// The decoded first line of a script, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShebangLine {
    pub text: String,
    pub encoding: TextEncoding,
}

#[derive(Error, Debug, PartialEq, Eq)]
enum DecodeError {
    #[error("no line terminator within the first {0} bytes")]
    NoTerminator(usize),
    #[error("line length is not a multiple of the {0} code unit")]
    Misaligned(TextEncoding),
    #[error("line is not valid {0}")]
    Invalid(TextEncoding),
}

/// Reads up to the first 256 bytes of `path` and decodes its first line.
///
/// Returns `None` when the file cannot be read, when no line terminator appears in the
/// bytes read, or when the line is not valid text in the detected encoding. Callers
/// treat all of these as "not a script".
pub fn decode_head(path: &Path) -> Option<ShebangLine> {
    let head = match read_head(path) {
        Ok(head) => head,
        Err(e) => {
            log::debug!("Cannot read '{}' as a script: {}", path.display(), e);
            return None;
        }
    };
    match decode_first_line(&head) {
        Ok(line) => {
            log::debug!("First line of '{}' ({}): {}", path.display(), line.encoding, line.text);
            Some(line)
        }
        Err(e) => {
            log::debug!("'{}' has no usable first line: {}", path.display(), e);
            None
        }
    }
}

fn read_head(path: &Path) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SHEBANG_HEAD_SIZE);
    File::open(path)?
        .take(SHEBANG_HEAD_SIZE as u64)
        .read_to_end(&mut head)?;
    Ok(head)
}

/// Detects the encoding from a BOM and returns it with the BOM length. No BOM means
/// UTF-8 with nothing to skip.
fn detect_encoding(bytes: &[u8]) -> (TextEncoding, usize) {
    BOMS.iter()
        .find(|(bom, _)| bytes.starts_with(bom))
        .map(|(bom, encoding)| (*encoding, bom.len()))
        .unwrap_or((TextEncoding::Utf8, 0))
}

fn decode_first_line(head: &[u8]) -> Result<ShebangLine, DecodeError> {
    let (encoding, bom_len) = detect_encoding(head);
    let body = head.get(bom_len..).unwrap_or_default();

    let start = body
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .ok_or(DecodeError::NoTerminator(head.len()))?;
    // The whole terminator unit has to be inside what was read.
    let end = start + 1 + encoding.terminator_tail();
    if end > body.len() {
        return Err(DecodeError::NoTerminator(head.len()));
    }
    let unit = encoding.unit_size();
    if end % unit != 0 {
        return Err(DecodeError::Misaligned(encoding));
    }

    let line = body.get(..end - unit).unwrap_or_default();
    let text = decode(line, encoding)?;
    Ok(ShebangLine {
        text: text.trim_end().to_string(),
        encoding,
    })
}

fn decode(bytes: &[u8], encoding: TextEncoding) -> Result<String, DecodeError> {
    let strict = |codec: &'static encoding_rs::Encoding| {
        codec
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(DecodeError::Invalid(encoding))
    };
    match encoding {
        TextEncoding::Utf8 => strict(UTF_8),
        TextEncoding::Utf16Le => strict(UTF_16LE),
        TextEncoding::Utf16Be => strict(UTF_16BE),
        TextEncoding::Utf32Le | TextEncoding::Utf32Be => bytes
            .chunks_exact(4)
            .map(|chunk| {
                let quad = <[u8; 4]>::try_from(chunk).map_err(|_| DecodeError::Invalid(encoding))?;
                let value = match encoding {
                    TextEncoding::Utf32Le => u32::from_le_bytes(quad),
                    _ => u32::from_be_bytes(quad),
                };
                char::from_u32(value).ok_or(DecodeError::Invalid(encoding))
            })
            .collect(),
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn utf16(text: &str, little: bool) -> Vec<u8> {
        let mut bytes = if little { vec![0xFF, 0xFE] } else { vec![0xFE, 0xFF] };
        for unit in text.encode_utf16() {
            let pair = if little { unit.to_le_bytes() } else { unit.to_be_bytes() };
            bytes.extend_from_slice(&pair);
        }
        bytes
    }

    fn utf32(text: &str, little: bool) -> Vec<u8> {
        let mut bytes = if little {
            vec![0xFF, 0xFE, 0x00, 0x00]
        } else {
            vec![0x00, 0x00, 0xFE, 0xFF]
        };
        for c in text.chars() {
            let quad = if little {
                (c as u32).to_le_bytes()
            } else {
                (c as u32).to_be_bytes()
            };
            bytes.extend_from_slice(&quad);
        }
        bytes
    }

    #[test]
    fn test_plain_utf8_line() {
        let line = decode_first_line(b"#! /usr/bin/python3 -u  \nprint(1)\n").unwrap();
        assert_eq!(line.text, "#! /usr/bin/python3 -u");
        assert_eq!(line.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_utf8_bom_and_crlf() {
        let line = decode_first_line(b"\xEF\xBB\xBF#!python2\r\n").unwrap();
        assert_eq!(line.text, "#!python2");
        assert_eq!(line.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_no_terminator_returns_none() {
        assert_eq!(
            decode_first_line(b"#!/usr/bin/python"),
            Err(DecodeError::NoTerminator(17))
        );
        assert!(decode_first_line(b"").is_err());
    }

    #[test]
    fn test_utf16_both_byte_orders() {
        let le = decode_first_line(&utf16("#!python3\nrest", true)).unwrap();
        assert_eq!(le.text, "#!python3");
        assert_eq!(le.encoding, TextEncoding::Utf16Le);

        let be = decode_first_line(&utf16("#!python3\r\n", false)).unwrap();
        assert_eq!(be.text, "#!python3");
        assert_eq!(be.encoding, TextEncoding::Utf16Be);
    }

    #[test]
    fn test_utf32_bom_beats_utf16_bom() {
        let le = decode_first_line(&utf32("#!python\n", true)).unwrap();
        assert_eq!(le.encoding, TextEncoding::Utf32Le);
        assert_eq!(le.text, "#!python");

        let be = decode_first_line(&utf32("#!python\n", false)).unwrap();
        assert_eq!(be.encoding, TextEncoding::Utf32Be);
        assert_eq!(be.text, "#!python");
    }

    #[test]
    fn test_truncated_utf16_terminator_is_rejected() {
        // A lone 0x0A with the high byte cut off.
        let bytes = [0xFF, 0xFE, b'#', 0x00, b'!', 0x00, 0x0A];
        assert!(decode_first_line(&bytes).is_err());
    }

    #[test]
    fn test_misaligned_utf16_line_is_rejected() {
        // Odd number of bytes before the newline.
        let bytes = [0xFF, 0xFE, b'#', b'!', 0x00, 0x0A, 0x00];
        assert_eq!(
            decode_first_line(&bytes),
            Err(DecodeError::Misaligned(TextEncoding::Utf16Le))
        );
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert_eq!(
            decode_first_line(b"#!\xFF\xFEpython\n"),
            Err(DecodeError::Invalid(TextEncoding::Utf8))
        );
    }

    #[test]
    fn test_decode_head_reads_only_the_head() {
        // --- Setup ---
        let mut file = NamedTempFile::new().unwrap();
        let mut content = b"#!".to_vec();
        content.extend(std::iter::repeat_n(b'x', SHEBANG_HEAD_SIZE));
        content.push(b'\n');
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        let mut short = NamedTempFile::new().unwrap();
        short.write_all(b"#!/usr/bin/env python3\nimport sys\n").unwrap();
        short.flush().unwrap();

        // --- Execute & Assert ---
        assert!(decode_head(file.path()).is_none());
        assert_eq!(decode_head(short.path()).unwrap().text, "#!/usr/bin/env python3");
        assert!(decode_head(Path::new("no/such/script.py")).is_none());
    }
}
