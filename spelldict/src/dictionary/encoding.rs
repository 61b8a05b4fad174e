//! Line framing and character encoding of dictionary files.
use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Serialize};

use super::error::DictionaryError;

/// Separator written after every line. Reading accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeparator {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineSeparator {
    /// The separator of the platform the process runs on.
    pub const fn native() -> LineSeparator {
        if cfg!(windows) {
            LineSeparator::CrLf
        } else {
            LineSeparator::Lf
        }
    }

    /// The separator as written.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineSeparator::Lf => b"\n",
            LineSeparator::CrLf => b"\r\n",
        }
    }
}

impl Default for LineSeparator {
    fn default() -> Self {
        LineSeparator::native()
    }
}

/// Encodes and decodes single dictionary lines.
#[derive(Debug, Clone, Copy)]
pub struct LineCodec {
    encoding: &'static Encoding,
    separator: LineSeparator,
}

impl LineCodec {
    /// Resolves an encoding label such as `UTF-8` or Hunspell's `ISO8859-1`.
    ///
    /// Only ASCII-compatible encodings can be split on line feed bytes, so
    /// labels like `UTF-16LE` are refused.
    pub fn new(label: &str, separator: LineSeparator) -> Result<LineCodec, DictionaryError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .filter(|e| e.is_ascii_compatible())
            .ok_or_else(|| DictionaryError::UnknownEncoding(label.to_string()))?;

        Ok(LineCodec {
            encoding,
            separator,
        })
    }

    /// A UTF-8 codec.
    pub fn utf8(separator: LineSeparator) -> LineCodec {
        LineCodec {
            encoding: UTF_8,
            separator,
        }
    }

    /// Canonical name of the encoding, e.g. `windows-1252` for `ISO8859-1`.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Separator written after each line.
    pub fn separator(&self) -> LineSeparator {
        self.separator
    }

    /// Encodes `text` without a separator.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>, DictionaryError> {
        let (bytes, _, unmappable) = self.encoding.encode(text);
        if unmappable {
            return Err(DictionaryError::Unencodable {
                word: text.to_string(),
                encoding: self.encoding.name(),
            });
        }
        Ok(bytes)
    }

    /// Appends `line` and the separator to `buf`.
    pub fn encode_line(&self, line: &str, buf: &mut Vec<u8>) -> Result<(), DictionaryError> {
        buf.extend_from_slice(&self.encode(line)?);
        buf.extend_from_slice(self.separator.as_bytes());
        Ok(())
    }

    /// Decodes one raw line, dropping a trailing `\n` or `\r\n`.
    ///
    /// Returns `None` if the bytes are malformed in this encoding.
    pub fn decode_line<'a>(&self, raw: &'a [u8]) -> Option<Cow<'a, str>> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(trim_line_end(raw))
    }
}

pub(crate) fn trim_line_end(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}
