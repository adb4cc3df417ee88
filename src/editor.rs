//! The editing session: one animation plus everything the editor UI keeps
//! around it (active color, palette, playback, image converter, font).
//!
//! Every method corresponds to one control of the editor. Commands that
//! cannot apply (deleting the last frame, a negative wait, an unknown
//! letter) leave the session untouched and return `false`/`None` instead of
//! failing.

use crate::Color;
use crate::addressing::GridPos;
use crate::animation::Animation;
use crate::convert::{ConvertError, Converter, Nudge, Viewport};
use crate::export;
use crate::font::{EmptyFont, FontTable};
use crate::frame::{Frame, Grid};
use crate::playback::{Playback, Tick};
use image::RgbaImage;
use serde::Serialize;

/// Color selected when a session starts.
pub const DEFAULT_ACTIVE_COLOR: Color = Color::new(0xff, 0x00, 0xae);

// ── Palette ──────────────────────────────────────────────────────────

/// Colors saved for quick reuse, in the order they were added.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    /// Add a color. Returns `false` if it was already saved.
    pub fn add(&mut self, color: Color) -> bool {
        if self.contains(color) {
            return false;
        }
        self.colors.push(color);
        true
    }

    pub fn remove(&mut self, color: Color) -> bool {
        let before = self.colors.len();
        self.colors.retain(|&c| c != color);
        self.colors.len() != before
    }

    pub fn contains(&self, color: Color) -> bool {
        self.colors.contains(&color)
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

// ── Status ───────────────────────────────────────────────────────────

/// Snapshot of the session for clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct EditorStatus {
    /// Index of the selected (or currently playing) frame
    pub current_frame: usize,
    /// Number of frames in the animation
    pub frame_count: usize,
    /// Wait of the selected frame in milliseconds
    pub wait_ms: u32,
    /// Whether playback is running
    pub playing: bool,
    /// Physical ids lit in the selected frame, ascending
    pub active_ids: Vec<u8>,
    /// Color applied by LED clicks and letters
    #[schema(value_type = String, example = "#ff00ae")]
    pub active_color: Color,
    /// Saved colors
    #[schema(value_type = Vec<String>)]
    pub palette: Vec<Color>,
    /// Whether an image is loaded in the converter
    pub image_loaded: bool,
    /// Where the converter draws the image
    pub viewport: Viewport,
}

// ── Editor ───────────────────────────────────────────────────────────

pub struct Editor {
    animation: Animation,
    playback: Playback,
    active_color: Color,
    palette: Palette,
    converter: Converter,
    font: Box<dyn FontTable + Send>,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_font(Box::new(EmptyFont))
    }

    pub fn with_font(font: Box<dyn FontTable + Send>) -> Self {
        Self {
            animation: Animation::new(),
            playback: Playback::new(),
            active_color: DEFAULT_ACTIVE_COLOR,
            palette: Palette::default(),
            converter: Converter::new(),
            font,
        }
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut Animation {
        &mut self.animation
    }

    pub fn status(&self) -> EditorStatus {
        let frame = self.animation.current_frame();
        EditorStatus {
            current_frame: self.animation.current(),
            frame_count: self.animation.len(),
            wait_ms: frame.wait_ms,
            playing: self.playback.is_playing(),
            active_ids: frame.grid.active_ids(),
            active_color: self.active_color,
            palette: self.palette.colors().to_vec(),
            image_loaded: self.converter.has_image(),
            viewport: self.converter.viewport(),
        }
    }

    // ── Frame editing ────────────────────────────────────────────────

    /// Flip one LED of the selected frame, painting it with the active color.
    pub fn toggle_led(&mut self, pos: GridPos) -> bool {
        let color = self.active_color;
        self.animation.current_frame_mut().grid.toggle_cell(pos, color)
    }

    /// Set the wait of the selected frame. Negative values are ignored.
    pub fn set_wait(&mut self, wait_ms: i64) -> bool {
        let applied = self.animation.set_wait(self.animation.current(), wait_ms);
        if !applied {
            tracing::debug!("Ignoring invalid wait {}ms", wait_ms);
        }
        applied
    }

    pub fn select_frame(&mut self, index: usize) -> bool {
        self.animation.select(index)
    }

    pub fn add_frame(&mut self) -> usize {
        self.animation.add_frame()
    }

    /// Duplicate the selected frame at the end and select the copy.
    pub fn clone_frame(&mut self) -> usize {
        let current = self.animation.current();
        self.animation
            .clone_frame(current)
            .unwrap_or_else(|| self.animation.current())
    }

    pub fn clear_frame(&mut self) -> bool {
        self.animation.clear_frame(self.animation.current())
    }

    /// Delete the selected frame unless it is the last one.
    pub fn delete_frame(&mut self) -> bool {
        let deleted = self.animation.delete_frame(self.animation.current());
        if !deleted {
            tracing::debug!("Refusing to delete the only frame");
        }
        deleted
    }

    pub fn delete_all(&mut self) {
        self.animation.delete_all();
    }

    // ── Colors ───────────────────────────────────────────────────────

    pub fn active_color(&self) -> Color {
        self.active_color
    }

    pub fn set_active_color(&mut self, color: Color) {
        self.active_color = color;
    }

    /// Save the active color to the palette.
    pub fn save_active_color(&mut self) -> bool {
        self.palette.add(self.active_color)
    }

    /// Remove the active color from the palette.
    pub fn remove_active_color(&mut self) -> bool {
        self.palette.remove(self.active_color)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    // ── Letters ──────────────────────────────────────────────────────

    /// Append a frame showing `letter` in the active color.
    ///
    /// Returns the new frame index, or `None` when the font has no
    /// (or an empty) glyph for the letter.
    pub fn add_letter(&mut self, letter: char) -> Option<usize> {
        let letter = letter.to_lowercase().next()?;
        let ids = match self.font.lookup(letter) {
            Some(ids) if !ids.is_empty() => ids,
            _ => {
                tracing::debug!("No glyph for {:?}", letter);
                return None;
            }
        };
        let frame = Frame::new(Grid::from_active_ids(ids, self.active_color));
        Some(self.animation.push_frame(frame))
    }

    // ── Image converter ──────────────────────────────────────────────

    pub fn load_image(&mut self, bytes: &[u8]) -> Result<Viewport, ConvertError> {
        let viewport = self.converter.load(bytes)?;
        tracing::info!("Loaded image ({} bytes)", bytes.len());
        Ok(viewport)
    }

    pub fn nudge_image(&mut self, nudge: Nudge) -> Result<Viewport, ConvertError> {
        self.converter.nudge(nudge)
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Install an image decoded elsewhere (see [`crate::convert::decode_upload`]).
    pub fn set_image(&mut self, img: RgbaImage) -> Viewport {
        let (width, height) = img.dimensions();
        let viewport = self.converter.set_image(img);
        tracing::info!("Loaded image ({}x{})", width, height);
        viewport
    }

    /// Replace the selected frame's grid with the sampled image.
    pub fn decode_image(&mut self) -> Result<usize, ConvertError> {
        let grid = self.converter.decode()?;
        Ok(self.apply_decoded(grid))
    }

    /// Store a grid sampled from a converter snapshot into the selected frame.
    pub fn apply_decoded(&mut self, grid: Grid) -> usize {
        let current = self.animation.current();
        self.animation.replace_grid(current, grid);
        current
    }

    // ── Playback ─────────────────────────────────────────────────────

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn play(&mut self) -> Option<Tick> {
        self.playback.play()
    }

    pub fn pause(&mut self) -> bool {
        self.playback.pause()
    }

    pub fn toggle_playback(&mut self) -> Option<Tick> {
        self.playback.toggle()
    }

    pub fn on_tick(&mut self, tick: Tick) -> Option<Tick> {
        self.playback.on_tick(tick, &mut self.animation)
    }

    // ── Export ───────────────────────────────────────────────────────

    pub fn export(&self) -> String {
        export::serialize(&self.animation)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::JsonFont;
    use crate::frame::DEFAULT_WAIT_MS;
    use image::{ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn pos(col: usize, row: usize) -> GridPos {
        GridPos::new(col, row).unwrap()
    }

    fn editor_with_font() -> Editor {
        let font: JsonFont = [('a', vec![1, 2, 3]), ('b', vec![])].into_iter().collect();
        Editor::with_font(Box::new(font))
    }

    #[test]
    fn fresh_session_defaults() {
        let status = Editor::new().status();
        assert_eq!(status.current_frame, 0);
        assert_eq!(status.frame_count, 1);
        assert_eq!(status.wait_ms, DEFAULT_WAIT_MS);
        assert!(!status.playing);
        assert!(status.active_ids.is_empty());
        assert_eq!(status.active_color.to_hex(), "#ff00ae");
        assert!(status.palette.is_empty());
        assert!(!status.image_loaded);
    }

    #[test]
    fn toggle_led_uses_active_color() {
        let mut editor = Editor::new();
        let teal = Color::new(0, 128, 128);
        editor.set_active_color(teal);

        assert!(editor.toggle_led(pos(0, 0)));
        let cell = *editor.animation().current_frame().grid.cell(pos(0, 0));
        assert!(cell.on);
        assert_eq!(cell.color, teal);
        assert_eq!(editor.status().active_ids, vec![63]);

        assert!(!editor.toggle_led(pos(0, 0)));
        assert!(editor.status().active_ids.is_empty());
    }

    #[test]
    fn edits_apply_to_selected_frame() {
        let mut editor = Editor::new();
        editor.add_frame();
        editor.toggle_led(pos(7, 7));
        editor.set_wait(300);

        editor.select_frame(0);
        assert!(editor.status().active_ids.is_empty());
        assert_eq!(editor.status().wait_ms, DEFAULT_WAIT_MS);

        editor.select_frame(1);
        assert_eq!(editor.status().active_ids, vec![7]);
        assert_eq!(editor.status().wait_ms, 300);
    }

    #[test]
    fn negative_wait_is_ignored() {
        let mut editor = Editor::new();
        assert!(editor.set_wait(200));
        assert!(!editor.set_wait(-5));
        assert_eq!(editor.status().wait_ms, 200);
    }

    #[test]
    fn clone_duplicates_selected_frame() {
        let mut editor = Editor::new();
        editor.toggle_led(pos(1, 1));
        editor.add_frame();
        editor.select_frame(0);

        assert_eq!(editor.clone_frame(), 2);
        assert_eq!(editor.status().active_ids, vec![pos(1, 1).led_index()]);

        // Editing the source afterwards leaves the clone alone.
        editor.select_frame(0);
        editor.toggle_led(pos(2, 2));
        editor.select_frame(2);
        assert_eq!(editor.status().active_ids, vec![pos(1, 1).led_index()]);
    }

    #[test]
    fn delete_and_delete_all() {
        let mut editor = Editor::new();
        assert!(!editor.delete_frame());

        editor.add_frame();
        editor.add_frame();
        assert!(editor.delete_frame());
        assert_eq!(editor.status().frame_count, 2);
        assert_eq!(editor.status().current_frame, 0);

        editor.delete_all();
        assert_eq!(editor.status().frame_count, 1);
    }

    #[test]
    fn clear_frame_turns_everything_off() {
        let mut editor = Editor::new();
        editor.toggle_led(pos(3, 3));
        editor.set_wait(700);
        assert!(editor.clear_frame());
        assert!(editor.status().active_ids.is_empty());
        assert_eq!(editor.status().wait_ms, 700);
    }

    #[test]
    fn palette_keeps_insertion_order_without_duplicates() {
        let mut editor = Editor::new();
        let colors = [Color::RED, Color::new(0, 255, 0), Color::RED];
        for c in colors {
            editor.set_active_color(c);
            editor.save_active_color();
        }
        assert_eq!(editor.palette().colors(), &[Color::RED, Color::new(0, 255, 0)]);

        editor.set_active_color(Color::RED);
        assert!(editor.remove_active_color());
        assert!(!editor.remove_active_color());
        assert_eq!(editor.palette().colors(), &[Color::new(0, 255, 0)]);
    }

    #[test]
    fn add_letter_appends_frame_in_active_color() {
        let mut editor = editor_with_font();
        editor.set_active_color(Color::new(0, 0, 255));

        assert_eq!(editor.add_letter('A'), Some(1));
        let status = editor.status();
        assert_eq!(status.current_frame, 1);
        assert_eq!(status.active_ids, vec![1, 2, 3]);
        assert_eq!(status.wait_ms, DEFAULT_WAIT_MS);
        let grid = &editor.animation().current_frame().grid;
        assert!(grid.cells().all(|(_, c)| c.color == Color::new(0, 0, 255)));
    }

    #[test]
    fn unknown_or_empty_letters_are_ignored() {
        let mut editor = editor_with_font();
        assert_eq!(editor.add_letter('z'), None);
        assert_eq!(editor.add_letter('b'), None);
        assert_eq!(editor.status().frame_count, 1);

        assert_eq!(Editor::new().add_letter('a'), None);
    }

    #[test]
    fn decode_replaces_selected_frame_only() {
        let img = RgbImage::from_pixel(400, 400, image::Rgb([255, 0, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let mut editor = Editor::new();
        assert!(matches!(
            editor.decode_image(),
            Err(ConvertError::NoImageLoaded)
        ));

        editor.add_frame();
        editor.set_wait(400);
        editor.load_image(&bytes).unwrap();
        assert_eq!(editor.decode_image().unwrap(), 1);

        let status = editor.status();
        assert_eq!(status.active_ids.len(), 64);
        assert_eq!(status.wait_ms, 400);
        assert!(status.image_loaded);
        assert_eq!(editor.animation().frame(0).unwrap().grid, Grid::default());
    }

    #[test]
    fn snapshot_decode_lands_in_selected_frame() {
        let mut editor = Editor::new();
        let viewport = editor.set_image(RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255])));
        assert_eq!(viewport.width, 400);

        let snapshot = editor.converter().clone();
        editor.add_frame();
        let grid = snapshot.decode().unwrap();
        assert_eq!(editor.apply_decoded(grid), 1);

        let status = editor.status();
        assert_eq!(status.active_ids.len(), 64);
        assert_eq!(editor.animation().frame(0).unwrap().grid, Grid::default());
    }

    #[test]
    fn bad_image_leaves_frame_untouched() {
        let mut editor = Editor::new();
        editor.toggle_led(pos(0, 0));
        assert!(editor.load_image(b"nope").is_err());
        assert!(editor.decode_image().is_err());
        assert_eq!(editor.status().active_ids, vec![63]);
    }

    #[test]
    fn export_reflects_frames() {
        let mut editor = Editor::new();
        editor.add_frame();
        assert!(editor.export().starts_with("const unsigned char PROGMEM anim[2][65][4] = "));
    }
}
