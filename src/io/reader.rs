//! Source decoding with PEP 263 awareness.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{Error, Result};

const BOM_UTF8: &[u8] = &[0xef, 0xbb, 0xbf];

static CODING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"coding[:=]\s*([-\w.]+)").unwrap());

/// Encodings the migrator knows how to decode and re-encode.
///
/// Anything declared outside this set aborts the file with a decode error
/// instead of risking a mangled rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// UTF-8 with a leading BOM, restored on write.
    Utf8Sig,
    Latin1,
}

/// A decoded source file plus everything needed to write it back
/// byte-faithfully.
#[derive(Debug)]
pub struct RawSource {
    /// Physical lines, each ending in `\n` except possibly the last.
    pub lines: Vec<String>,
    pub encoding: Encoding,
    /// True when the file used `\r\n` endings.
    pub crlf: bool,
}

impl RawSource {
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

/// Read and decode a Python source file.
pub fn read_source(path: &Path) -> Result<RawSource> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    decode(path, &bytes)
}

fn decode(path: &Path, bytes: &[u8]) -> Result<RawSource> {
    let (body, bom) = match bytes.strip_prefix(BOM_UTF8) {
        Some(rest) => (rest, true),
        None => (bytes, false),
    };

    let declared = declared_encoding(body);
    if bom {
        if let Some(enc) = &declared {
            if enc != "utf-8" {
                return Err(Error::decode(
                    path,
                    format!("BOM contradicts declared encoding {enc}"),
                ));
            }
        }
    }

    let encoding = match declared.as_deref() {
        None | Some("utf-8") => {
            if bom {
                Encoding::Utf8Sig
            } else {
                Encoding::Utf8
            }
        }
        Some("iso-8859-1") => Encoding::Latin1,
        Some(other) => {
            return Err(Error::decode(path, format!("unsupported encoding {other}")));
        }
    };

    let text = match encoding {
        Encoding::Utf8 | Encoding::Utf8Sig => String::from_utf8(body.to_vec())
            .map_err(|e| Error::decode(path, e.to_string()))?,
        // Latin-1 maps each byte to the code point of the same value.
        Encoding::Latin1 => body.iter().map(|&b| b as char).collect(),
    };

    let crlf = text.contains("\r\n");
    let normalized = if crlf { text.replace("\r\n", "\n") } else { text };
    let lines = normalized
        .split_inclusive('\n')
        .map(str::to_owned)
        .collect();

    Ok(RawSource {
        lines,
        encoding,
        crlf,
    })
}

/// PEP 263: the coding comment counts only on the first two lines.
///
/// Returns the canonical name, folding the latin-1 aliases together the way
/// the codecs module does.
fn declared_encoding(body: &[u8]) -> Option<String> {
    let head: Vec<&[u8]> = body.split(|&b| b == b'\n').take(2).collect();
    for line in head {
        let Ok(text) = std::str::from_utf8(line) else {
            continue;
        };
        if !text.trim_start().starts_with('#') {
            continue;
        }
        if let Some(caps) = CODING_RE.captures(text) {
            let enc = caps[1].to_ascii_lowercase().replace('_', "-");
            let canonical = if enc == "utf-8" || enc.starts_with("utf-8-") {
                "utf-8".to_owned()
            } else if matches!(enc.as_str(), "latin-1" | "iso-8859-1" | "iso-latin-1")
                || enc.starts_with("latin-1-")
                || enc.starts_with("iso-8859-1-")
                || enc.starts_with("iso-latin-1-")
            {
                "iso-8859-1".to_owned()
            } else {
                enc
            };
            return Some(canonical);
        }
    }
    None
}
