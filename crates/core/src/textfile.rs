//! Encoding-tolerant text file access.
//!
//! Reads try an ordered list of encodings and report which one succeeded;
//! writes always produce UTF-8 so every processed file converges on a single
//! encoding.

use std::{
    fmt, fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PageError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Windows-1252 mappings for 0x80..=0x9F; `None` marks the undefined bytes.
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// One decoding strategy in the ordered fallback list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8 with a leading byte-order mark (required, then stripped).
    #[serde(rename = "utf8-bom")]
    Utf8Bom,
    /// Plain UTF-8.
    #[serde(rename = "utf8")]
    Utf8,
    /// Windows code page 1252; its five unassigned bytes are rejected.
    #[serde(rename = "windows-1252")]
    Windows1252,
    /// ISO-8859-1 restricted to printable text; C1 controls are rejected.
    #[serde(rename = "latin-1")]
    Latin1,
}

impl TextEncoding {
    /// Most-common-first order used when nothing else is configured.
    pub const DEFAULT_ORDER: [TextEncoding; 4] = [
        TextEncoding::Utf8Bom,
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Windows1252,
    ];

    /// Stable label used in configuration and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8Bom => "utf8-bom",
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Decode `bytes`, returning `None` when they are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8Bom => {
                let rest = bytes.strip_prefix(UTF8_BOM)?;
                std::str::from_utf8(rest).ok().map(str::to_owned)
            }
            TextEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            TextEncoding::Windows1252 => bytes
                .iter()
                .map(|&byte| match byte {
                    0x80..=0x9F => WINDOWS_1252_HIGH[usize::from(byte - 0x80)],
                    _ => Some(char::from(byte)),
                })
                .collect(),
            TextEncoding::Latin1 => bytes
                .iter()
                .map(|&byte| match byte {
                    0x80..=0x9F => None,
                    _ => Some(char::from(byte)),
                })
                .collect(),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Text read from disk plus the encoding that decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// Decoded content.
    pub content: String,
    /// Strategy that succeeded.
    pub encoding: TextEncoding,
}

/// Reads text with an ordered encoding fallback and writes it back as UTF-8.
#[derive(Debug, Clone)]
pub struct TextFileAccessor {
    encodings: Vec<TextEncoding>,
}

impl Default for TextFileAccessor {
    fn default() -> Self {
        Self::new(TextEncoding::DEFAULT_ORDER.to_vec())
    }
}

impl TextFileAccessor {
    /// Build an accessor trying `encodings` in order.
    pub fn new(encodings: Vec<TextEncoding>) -> Self {
        Self { encodings }
    }

    /// Read `path`, returning the first successful decode.
    pub fn read_text(&self, path: impl AsRef<Path>) -> Result<DecodedText, PageError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|err| PageError::io(path, err))?;

        for &encoding in &self.encodings {
            if let Some(content) = encoding.decode(&bytes) {
                debug!("decoded {} as {}", path.display(), encoding);
                return Ok(DecodedText { content, encoding });
            }
        }

        Err(PageError::Decode {
            path: PathBuf::from(path),
            tried: self.encodings.clone(),
        })
    }

    /// Write `content` as UTF-8, replacing `path` atomically.
    ///
    /// The text goes to a temporary file in the target directory first and is
    /// renamed over the destination, so readers never observe a partial page.
    pub fn write_text(&self, path: impl AsRef<Path>, content: &str) -> Result<(), PageError> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|err| PageError::io(&parent, err))?;

        let mut staged =
            tempfile::NamedTempFile::new_in(&parent).map_err(|err| PageError::io(&parent, err))?;
        staged
            .write_all(content.as_bytes())
            .and_then(|_| staged.flush())
            .map_err(|err| PageError::io(path, err))?;
        staged
            .persist(path)
            .map_err(|err| PageError::io(path, err.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn prefers_bom_variant_when_marker_present() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bom.html");
        fs::write(&path, b"\xEF\xBB\xBF<p>caf\xC3\xA9</p>")?;

        let decoded = TextFileAccessor::default().read_text(&path)?;
        assert_eq!(decoded.encoding, TextEncoding::Utf8Bom);
        assert_eq!(decoded.content, "<p>café</p>");
        Ok(())
    }

    #[test]
    fn falls_back_to_legacy_code_pages() -> Result<()> {
        let dir = tempdir()?;
        let smart_quotes = dir.path().join("quotes.html");
        fs::write(&smart_quotes, b"\x93quoted\x94")?;
        let decoded = TextFileAccessor::default().read_text(&smart_quotes)?;
        assert_eq!(decoded.encoding, TextEncoding::Windows1252);
        assert_eq!(decoded.content, "\u{201C}quoted\u{201D}");

        let latin = dir.path().join("latin.html");
        fs::write(&latin, b"na\xEFve")?;
        let decoded = TextFileAccessor::default().read_text(&latin)?;
        assert_eq!(decoded.encoding, TextEncoding::Latin1);
        assert_eq!(decoded.content, "naïve");
        Ok(())
    }

    #[test]
    fn latin1_alone_rejects_control_range() {
        assert_eq!(TextEncoding::Latin1.decode(b"caf\xE9").as_deref(), Some("café"));
        assert!(TextEncoding::Latin1.decode(b"\x85").is_none());
        assert!(TextEncoding::Windows1252.decode(b"\x8D").is_none());
    }

    #[test]
    fn undecodable_bytes_report_every_attempt() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.html");
        fs::write(&path, b"\xC3\x28 \x81\x8D")?;

        let err = TextFileAccessor::default()
            .read_text(&path)
            .expect_err("bytes should not decode");
        match err {
            PageError::Decode { tried, .. } => {
                assert_eq!(tried, TextEncoding::DEFAULT_ORDER.to_vec());
            }
            other => panic!("unexpected error {other}"),
        }
        Ok(())
    }

    #[test]
    fn write_normalises_to_utf8() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("page.html");
        let accessor = TextFileAccessor::default();

        accessor.write_text(&path, "<p>naïve “quote”</p>")?;
        let bytes = fs::read(&path)?;
        assert!(!bytes.starts_with(UTF8_BOM));
        assert_eq!(accessor.read_text(&path)?.encoding, TextEncoding::Utf8);
        assert_eq!(String::from_utf8(bytes)?, "<p>naïve “quote”</p>");
        Ok(())
    }
}
