//! One animation frame: an 8x8 grid of LED cells plus its display time.
//!
//! A grid has two flat encodings besides the 2-D layout:
//! - the sparse list of lit physical indices ([`Grid::active_ids`])
//! - the dense per-LED byte table produced by [`crate::export`]

use crate::addressing::GridPos;
use crate::{COLUMNS, Color, LED_COUNT, ROWS};
use serde::Serialize;

/// Wait assigned to a freshly created frame.
pub const DEFAULT_WAIT_MS: u32 = 1000;

/// Increment used by editors when stepping a frame's wait up or down.
pub const WAIT_STEP_MS: u32 = 100;

/// Color given to cells of a default grid.
pub const DEFAULT_CELL_COLOR: Color = Color::RED;

/// A single LED on the grid.
///
/// `physical_index` is fixed by the cell's position when the grid is built;
/// only `on` and `color` ever change afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct LedCell {
    /// Whether the LED emits `color`
    pub on: bool,
    /// Color shown while on
    #[schema(value_type = String, example = "#ff0000")]
    pub color: Color,
    /// Wire-order index of this LED
    physical_index: u8,
}

impl LedCell {
    pub fn physical_index(&self) -> u8 {
        self.physical_index
    }
}

/// The 8x8 cell layout of one frame, indexed `[row][col]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: [[LedCell; COLUMNS]; ROWS],
}

impl Grid {
    /// Build a grid where exactly the LEDs listed in `active_ids` are on.
    ///
    /// Every cell gets `color`, lit or not, so toggling a cell later keeps a
    /// sensible color. Ids outside `0..LED_COUNT` are ignored.
    pub fn with_active(active_ids: &[u8], color: Color) -> Self {
        let mut lit = [false; LED_COUNT];
        for &id in active_ids {
            if let Some(slot) = lit.get_mut(id as usize) {
                *slot = true;
            }
        }

        let mut cells = [[LedCell {
            on: false,
            color,
            physical_index: 0,
        }; COLUMNS]; ROWS];
        for pos in GridPos::all() {
            let led = pos.led_index();
            cells[pos.row()][pos.col()] = LedCell {
                on: lit[led as usize],
                color,
                physical_index: led,
            };
        }
        Self { cells }
    }

    /// Rebuild a grid from its sparse encoding. Inverse of [`Grid::active_ids`].
    pub fn from_active_ids(ids: &[u8], color: Color) -> Self {
        Self::with_active(ids, color)
    }

    /// Physical indices of every lit cell, ascending.
    pub fn active_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self
            .cells()
            .filter(|(_, cell)| cell.on)
            .map(|(_, cell)| cell.physical_index)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn cell(&self, pos: GridPos) -> &LedCell {
        &self.cells[pos.row()][pos.col()]
    }

    /// Replace the on/off state and color of one cell.
    pub fn set_cell(&mut self, pos: GridPos, on: bool, color: Color) {
        let cell = &mut self.cells[pos.row()][pos.col()];
        cell.on = on;
        cell.color = color;
    }

    /// Flip a cell and paint it with `color`, returning the new state.
    pub fn toggle_cell(&mut self, pos: GridPos, color: Color) -> bool {
        let on = !self.cell(pos).on;
        self.set_cell(pos, on, color);
        on
    }

    /// Cells in row-major traversal order.
    pub fn cells(&self) -> impl Iterator<Item = (GridPos, &LedCell)> {
        GridPos::all().map(|pos| (pos, self.cell(pos)))
    }

    /// Rows of cells, top to bottom.
    pub fn rows(&self) -> &[[LedCell; COLUMNS]; ROWS] {
        &self.cells
    }
}

impl Default for Grid {
    /// All LEDs off, painted with [`DEFAULT_CELL_COLOR`].
    fn default() -> Self {
        Self::with_active(&[], DEFAULT_CELL_COLOR)
    }
}

/// One animation frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub wait_ms: u32,
    pub grid: Grid,
}

impl Frame {
    pub fn new(grid: Grid) -> Self {
        Self {
            wait_ms: DEFAULT_WAIT_MS,
            grid,
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(Grid::default())
    }
}
