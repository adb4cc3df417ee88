//! Frame editor and Arduino exporter for an 8x8 serpentine-wired LED matrix.
//!
//! The library is split into small, host-testable pieces:
//! - [`addressing`]: logical (col, row) to physical wire index
//! - [`frame`]: one 8x8 frame and its sparse/dense encodings
//! - [`animation`]: the ordered, never-empty frame sequence
//! - [`playback`]: play/pause state machine and its timer thread
//! - [`export`]: the Arduino `PROGMEM` table serializer
//! - [`convert`]: samples a panned/zoomed image into a frame
//! - [`font`]: letter-to-pattern lookup
//! - [`preview`]: PNG rendering of frames and the converter canvas
//! - [`editor`]: the session that ties all of the above together
//!
//! The main binary wraps an [`editor::Editor`] in the HTTP API from [`server`].

pub mod addressing;
pub mod animation;
pub mod convert;
pub mod editor;
pub mod export;
pub mod font;
pub mod frame;
pub mod playback;
pub mod preview;
pub mod server;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Grid configuration ─────────────────────────────────────────────

/// Number of LED rows on the matrix.
pub const ROWS: usize = 8;

/// Number of LED columns on the matrix.
pub const COLUMNS: usize = 8;

/// Total number of LEDs on the strip.
pub const LED_COUNT: usize = ROWS * COLUMNS;

// ── Color ──────────────────────────────────────────────────────────

/// An RGB color as stored on each LED cell.
///
/// The textual form is the CSS-style hex string `#rrggbb`. Parsing also
/// accepts the `#rgb` shorthand, an omitted `#`, and either letter case.
///
/// # Rust concept: serde conversions
/// `try_from = "String"` / `into = "String"` make serde go through our own
/// parser and formatter, so JSON bodies carry `"#ff0000"` rather than an
/// object with three fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::new(0xff, 0x00, 0x00);
    pub const BLACK: Color = Color::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the `#` is optional, case-insensitive).
    ///
    /// Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        // All bytes are ASCII hex digits here, so byte slicing is safe.
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                // #abc expands to #aabbcc, i.e. each nibble times 0x11
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Some(Self::new(r * 0x11, g * 0x11, b * 0x11))
            }
            6 => Some(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => None,
        }
    }

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channels in wire order.
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error returned when a string is not a valid hex color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex color: {:?}", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s).ok_or_else(|| ParseColorError(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_hex()
    }
}

impl From<image::Rgba<u8>> for Color {
    fn from(p: image::Rgba<u8>) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

// ── Tests ──────────────────────────────────────────────────────────
