//! Physical addressing for a serpentine-wired matrix.
//!
//! The strip enters at the bottom of the panel and snakes upward. Counting
//! from the top, odd rows run in raster order and even rows run reversed so
//! that consecutive wire indices stay physically adjacent:
//!
//! ```text
//! row 0:  63 62 61 60 59 58 57 56
//! row 1:  48 49 50 51 52 53 54 55
//! row 2:  47 46 45 44 43 42 41 40
//! ...
//! row 7:   0  1  2  3  4  5  6  7
//! ```

use crate::{COLUMNS, LED_COUNT, ROWS};

/// A position on the grid, guaranteed to be inside `COLUMNS x ROWS`.
///
/// # Rust concept: making invalid states unrepresentable
/// The fields are private, so the only way to obtain a `GridPos` is through
/// [`GridPos::new`] (which checks bounds) or [`GridPos::all`]. Every function
/// taking a `GridPos` is therefore total and never needs a runtime check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridPos {
    col: u8,
    row: u8,
}

impl GridPos {
    /// Returns `None` when the coordinates fall outside the grid.
    pub fn new(col: usize, row: usize) -> Option<Self> {
        (col < COLUMNS && row < ROWS).then_some(Self {
            col: col as u8,
            row: row as u8,
        })
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    /// All positions in row-major order: row 0 left to right, then row 1...
    pub fn all() -> impl Iterator<Item = GridPos> {
        (0..ROWS).flat_map(|row| {
            (0..COLUMNS).map(move |col| GridPos {
                col: col as u8,
                row: row as u8,
            })
        })
    }

    /// Physical wire index of the LED at this position.
    pub fn led_index(self) -> u8 {
        led_index(self.col(), self.row())
    }
}

/// Map a grid position to the wire-order index of its LED.
///
/// `base` is the raster index counted from the bottom row of the strip;
/// even rows (from the top) use the mirrored column.
///
/// Callers outside this module should prefer [`GridPos::led_index`]; this
/// function assumes `col < COLUMNS` and `row < ROWS`.
pub(crate) fn led_index(col: usize, row: usize) -> u8 {
    debug_assert!(col < COLUMNS && row < ROWS);
    let base = LED_COUNT - (COLUMNS * (row + 1) - col);
    let reversed = base + (COLUMNS - 1) - 2 * col;
    let index = if row % 2 == 0 { reversed } else { base };
    index as u8
}
