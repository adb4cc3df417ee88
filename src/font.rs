//! Letter patterns: a character maps to the physical LED ids it lights.
//!
//! The editor only needs [`FontTable::lookup`]; where the table comes from
//! is up to the caller. [`JsonFont`] reads the usual font file layout:
//!
//! ```json
//! { "a": [9, 10, 11, 12, 18, 21], "b": [ ... ] }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A lookup from character to lit LED ids.
///
/// # Rust concept: trait objects
/// The editor stores a `Box<dyn FontTable + Send>`, so tests can hand it a
/// tiny in-memory table while the server loads one from disk.
pub trait FontTable {
    /// Ids lit for `ch`, or `None` if the font has no glyph for it.
    fn lookup(&self, ch: char) -> Option<&[u8]>;
}

/// A font with no glyphs, used when none is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyFont;

impl FontTable for EmptyFont {
    fn lookup(&self, _ch: char) -> Option<&[u8]> {
        None
    }
}

/// A font table loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct JsonFont {
    glyphs: HashMap<char, Vec<u8>>,
}

impl JsonFont {
    /// Read a font file from disk.
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        let font = Self::parse(&text)?;
        tracing::info!("Loaded {} glyphs from {}", font.len(), path.display());
        Ok(font)
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl FromIterator<(char, Vec<u8>)> for JsonFont {
    fn from_iter<T: IntoIterator<Item = (char, Vec<u8>)>>(iter: T) -> Self {
        Self {
            glyphs: iter.into_iter().collect(),
        }
    }
}

impl FontTable for JsonFont {
    fn lookup(&self, ch: char) -> Option<&[u8]> {
        self.glyphs.get(&ch).map(Vec::as_slice)
    }
}
