//! Input and output representations.
//!
//! A PDF can arrive as raw bytes, base64 text, a binary buffer, or a path to
//! a file; rendered pages can be handed back in the same four shapes.
//! [`Mode`] names the shape, [`SourceDescriptor`] carries an input and
//! [`Payload`] carries one output item.
//!
//! `RawBytes` and `BinaryBuffer` behave identically inside this crate. They
//! stay distinct so that bindings can map them onto two different host types
//! (a typed array and a buffer object, for instance) without losing which one
//! the caller used.

use crate::error::Pdf2PngError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Representation an input is provided in, or an output is requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    RawBytes,
    Base64Text,
    BinaryBuffer,
    /// Default: hand back paths, read nothing.
    #[default]
    FilePath,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::RawBytes,
        Mode::Base64Text,
        Mode::BinaryBuffer,
        Mode::FilePath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::RawBytes => "raw-bytes",
            Mode::Base64Text => "base64",
            Mode::BinaryBuffer => "buffer",
            Mode::FilePath => "file",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Pdf2PngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "raw-bytes" | "rawbytes" | "bytes" | "arraybuffer" | "array-buffer" => {
                Ok(Mode::RawBytes)
            }
            "base64" | "base64-text" | "base64text" => Ok(Mode::Base64Text),
            "buffer" | "binary-buffer" | "binarybuffer" => Ok(Mode::BinaryBuffer),
            "file" | "path" | "file-path" | "filepath" => Ok(Mode::FilePath),
            other => Err(Pdf2PngError::UnknownMode(other.to_string())),
        }
    }
}

/// Numeric tags in declaration order: 0 raw bytes, 1 base64, 2 buffer, 3 file.
impl TryFrom<u8> for Mode {
    type Error = Pdf2PngError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Mode::ALL
            .get(tag as usize)
            .copied()
            .ok_or_else(|| Pdf2PngError::UnknownMode(tag.to_string()))
    }
}

/// A PDF supplied by the caller, in one of the four [`Mode`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    RawBytes(Vec<u8>),
    Base64Text(String),
    BinaryBuffer(Vec<u8>),
    FilePath(PathBuf),
}

impl SourceDescriptor {
    pub fn mode(&self) -> Mode {
        match self {
            SourceDescriptor::RawBytes(_) => Mode::RawBytes,
            SourceDescriptor::Base64Text(_) => Mode::Base64Text,
            SourceDescriptor::BinaryBuffer(_) => Mode::BinaryBuffer,
            SourceDescriptor::FilePath(_) => Mode::FilePath,
        }
    }

    /// Build a descriptor from an untyped `(mode, bytes)` pair.
    ///
    /// Base64 text and file paths must be valid UTF-8.
    pub fn from_parts(mode: Mode, data: Vec<u8>) -> Result<Self, Pdf2PngError> {
        match mode {
            Mode::RawBytes => Ok(SourceDescriptor::RawBytes(data)),
            Mode::BinaryBuffer => Ok(SourceDescriptor::BinaryBuffer(data)),
            Mode::Base64Text => String::from_utf8(data)
                .map(SourceDescriptor::Base64Text)
                .map_err(|e| Pdf2PngError::NoPayload {
                    detail: format!("base64 text is not UTF-8: {e}"),
                }),
            Mode::FilePath => String::from_utf8(data)
                .map(|s| SourceDescriptor::FilePath(PathBuf::from(s.trim_end_matches(['\r', '\n']))))
                .map_err(|e| Pdf2PngError::NoPayload {
                    detail: format!("file path is not UTF-8: {e}"),
                }),
        }
    }

    /// Decode the descriptor into PDF bytes.
    ///
    /// Returns `Ok(None)` for [`SourceDescriptor::FilePath`], which is copied
    /// rather than written.
    pub fn to_bytes(&self) -> Result<Option<Vec<u8>>, Pdf2PngError> {
        match self {
            SourceDescriptor::RawBytes(b) | SourceDescriptor::BinaryBuffer(b) => Ok(Some(b.clone())),
            SourceDescriptor::Base64Text(text) => Ok(Some(decode_base64(text)?)),
            SourceDescriptor::FilePath(_) => Ok(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            SourceDescriptor::FilePath(p) => Some(p),
            _ => None,
        }
    }
}

/// Decode base64 text, tolerating whitespace and a `data:` URI prefix.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, Pdf2PngError> {
    let body = match text.find(";base64,") {
        Some(idx) if text.starts_with("data:") => &text[idx + ";base64,".len()..],
        _ => text,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// One collected output item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "data", rename_all = "kebab-case")]
pub enum Payload {
    RawBytes(Vec<u8>),
    Base64Text(String),
    BinaryBuffer(Vec<u8>),
    FilePath(PathBuf),
}

impl Payload {
    pub fn mode(&self) -> Mode {
        match self {
            Payload::RawBytes(_) => Mode::RawBytes,
            Payload::Base64Text(_) => Mode::Base64Text,
            Payload::BinaryBuffer(_) => Mode::BinaryBuffer,
            Payload::FilePath(_) => Mode::FilePath,
        }
    }

    /// Decoded bytes for the three buffer-like modes; `None` for paths.
    pub fn to_bytes(&self) -> Result<Option<Vec<u8>>, Pdf2PngError> {
        match self {
            Payload::RawBytes(b) | Payload::BinaryBuffer(b) => Ok(Some(b.clone())),
            Payload::Base64Text(t) => Ok(Some(STANDARD.decode(t)?)),
            Payload::FilePath(_) => Ok(None),
        }
    }
}
