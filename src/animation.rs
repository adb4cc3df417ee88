//! The animation: an ordered, never-empty sequence of frames.
//!
//! The animation also owns the current selection. Editing commands act on
//! the selected frame, and playback advances the same index, so there is one
//! source of truth for "which frame is showing".

use crate::frame::{Frame, Grid};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Animation {
    /// Invariant: never empty.
    frames: Vec<Frame>,
    /// Invariant: `current < frames.len()`.
    current: usize,
}

impl Animation {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.current]
    }

    pub fn current_frame_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.current]
    }

    /// Select a frame. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Move the selection to the next frame, wrapping to the first.
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.frames.len();
        self.current
    }

    /// Append a default frame and select it.
    pub fn add_frame(&mut self) -> usize {
        self.push_frame(Frame::default())
    }

    /// Append `frame` and select it.
    pub fn push_frame(&mut self, frame: Frame) -> usize {
        self.frames.push(frame);
        self.current = self.frames.len() - 1;
        self.current
    }

    /// Append a copy of frame `index` and select the copy.
    ///
    /// The copy owns its own grid: editing either frame afterwards never
    /// shows up in the other.
    pub fn clone_frame(&mut self, index: usize) -> Option<usize> {
        let copy = self.frames.get(index)?.clone();
        Some(self.push_frame(copy))
    }

    /// Remove frame `index` unless it is the only one left.
    ///
    /// On success the selection resets to the first frame.
    pub fn delete_frame(&mut self, index: usize) -> bool {
        if self.frames.len() <= 1 || index >= self.frames.len() {
            return false;
        }
        self.frames.remove(index);
        self.current = 0;
        true
    }

    /// Drop everything and start over with a single default frame.
    pub fn delete_all(&mut self) {
        *self = Self::new();
    }

    /// Turn every LED of frame `index` off, keeping its wait.
    pub fn clear_frame(&mut self, index: usize) -> bool {
        self.replace_grid(index, Grid::default())
    }

    /// Swap in a whole new grid for frame `index`, keeping its wait.
    pub fn replace_grid(&mut self, index: usize, grid: Grid) -> bool {
        match self.frames.get_mut(index) {
            Some(frame) => {
                frame.grid = grid;
                true
            }
            None => false,
        }
    }

    /// Set the wait of frame `index`. Negative values are rejected.
    pub fn set_wait(&mut self, index: usize, wait_ms: i64) -> bool {
        let Ok(wait_ms) = u32::try_from(wait_ms) else {
            return false;
        };
        match self.frames.get_mut(index) {
            Some(frame) => {
                frame.wait_ms = wait_ms;
                true
            }
            None => false,
        }
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new()
    }
}
