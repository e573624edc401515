//! Byte encodings used to turn a supplied password into digest input.

use super::{error::Error, normalize_name};
use std::{fmt, str::FromStr};
use zeroize::Zeroizing;

const REPLACEMENT: u8 = b'?';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    UsAscii,
    Iso8859_1,
    Utf16Be,
    Utf16Le,
    /// Big endian, prefixed with a byte-order mark.
    Utf16,
}

impl TextEncoding {
    pub const ALL: [Self; 6] = [
        Self::Utf8,
        Self::UsAscii,
        Self::Iso8859_1,
        Self::Utf16Be,
        Self::Utf16Le,
        Self::Utf16,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::UsAscii => "US-ASCII",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16 => "UTF-16",
        }
    }

    const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Utf8 => &["UTF8"],
            Self::UsAscii => &["ASCII"],
            Self::Iso8859_1 => &["LATIN1"],
            Self::Utf16Be | Self::Utf16Le | Self::Utf16 => &[],
        }
    }

    /// Encode `text`; characters the encoding cannot represent become `?`.
    #[must_use]
    pub fn encode(self, text: &str) -> Zeroizing<Vec<u8>> {
        let bytes = match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::UsAscii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT })
                .collect(),
            Self::Iso8859_1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                .collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16 => [0xFE, 0xFF]
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                .collect(),
        };
        Zeroizing::new(bytes)
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|encoding| {
                normalize_name(encoding.name()) == wanted
                    || encoding.aliases().iter().any(|alias| *alias == wanted)
            })
            .ok_or_else(|| Error::UnsupportedTextEncoding(name.to_string()))
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
