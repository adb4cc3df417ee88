//! Image-to-frame converter.
//!
//! An uploaded image is drawn onto a 400x400 canvas at a user-controlled
//! offset and size. A fixed 80x80 sample window at (160, 160) sits on top
//! of the canvas, split into an 8x8 grid of 10x10 cells. Decoding reads the
//! center pixel of every cell and turns it into a lit LED of that color.
//!
//! Panning and zooming move the image under the window; the window itself
//! never moves. Cells that land outside the drawn image read the canvas
//! background (transparent black).
//!
//! The image is scaled by nearest-neighbor lookup, one canvas pixel at a
//! time, so only the part of the viewport that lands on the canvas is ever
//! materialized no matter how far the image is grown.
//!
//! ## Rust concepts
//! - `Result` with a small error `enum` and `From` for `?` conversion
//! - `Arc` so a converter snapshot can be rendered off the editor lock

use crate::addressing::GridPos;
use crate::frame::Grid;
use crate::{COLUMNS, Color, ROWS};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Width and height of the drawing canvas.
pub const CANVAS_SIZE: u32 = 400;

/// Top-left corner of the sample window on the canvas.
pub const WINDOW_ORIGIN: u32 = 160;

/// Side length of one sample cell.
pub const CELL_SIZE: u32 = 10;

/// Side length of the sample window.
pub const WINDOW_SIZE: u32 = CELL_SIZE * COLUMNS as u32;

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConvertError {
    /// The uploaded bytes are not a readable image.
    Decode(image::ImageError),
    /// The image decoded but has no pixels.
    EmptyImage,
    /// An operation needs an image but none was loaded yet.
    NoImageLoaded,
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Decode(e) => write!(f, "could not decode image: {e}"),
            ConvertError::EmptyImage => f.write_str("image has zero width or height"),
            ConvertError::NoImageLoaded => f.write_str("no image loaded"),
        }
    }
}

impl std::error::Error for ConvertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConvertError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for ConvertError {
    fn from(e: image::ImageError) -> Self {
        ConvertError::Decode(e)
    }
}

// ── Viewport ─────────────────────────────────────────────────────────

/// Where the image is drawn on the canvas, in canvas pixels.
///
/// Width and height may drop to zero or below after repeated shrinking;
/// nothing is drawn then, and growing again brings the image back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Viewport {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Viewport {
    /// Fit an image of the given size to the canvas width, top-left aligned.
    pub fn fit(image_width: u32, image_height: u32) -> Self {
        let height = CANVAS_SIZE as f64 * image_height as f64 / image_width as f64;
        Self {
            x: 0,
            y: 0,
            width: CANVAS_SIZE as i64,
            height: height.round() as i64,
        }
    }
}

/// One press of a converter control button.
///
/// Wire names separate the step from the direction: `grow_1`, `shrink_100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Nudge {
    #[serde(rename = "grow_1")]
    Grow1,
    #[serde(rename = "shrink_1")]
    Shrink1,
    #[serde(rename = "grow_10")]
    Grow10,
    #[serde(rename = "shrink_10")]
    Shrink10,
    #[serde(rename = "grow_100")]
    Grow100,
    #[serde(rename = "shrink_100")]
    Shrink100,
    Left,
    Right,
    Up,
    Down,
}

impl Nudge {
    /// `(dx, dy, dsize)` applied to the viewport.
    fn delta(self) -> (i64, i64, i64) {
        match self {
            Nudge::Grow1 => (0, 0, 1),
            Nudge::Shrink1 => (0, 0, -1),
            Nudge::Grow10 => (0, 0, 10),
            Nudge::Shrink10 => (0, 0, -10),
            Nudge::Grow100 => (0, 0, 100),
            Nudge::Shrink100 => (0, 0, -100),
            Nudge::Left => (-1, 0, 0),
            Nudge::Right => (1, 0, 0),
            Nudge::Up => (0, -1, 0),
            Nudge::Down => (0, 1, 0),
        }
    }

    pub fn apply(self, viewport: Viewport) -> Viewport {
        let (dx, dy, ds) = self.delta();
        Viewport {
            x: viewport.x + dx,
            y: viewport.y + dy,
            width: viewport.width + ds,
            height: viewport.height + ds,
        }
    }
}

// ── Converter ────────────────────────────────────────────────────────

/// Uploaded image plus where it sits on the canvas.
///
/// Cloning is cheap: the pixels are shared, so handlers can snapshot the
/// converter and render it without holding the editor lock.
#[derive(Clone, Default)]
pub struct Converter {
    image: Option<Arc<RgbaImage>>,
    viewport: Viewport,
}

/// Decode uploaded bytes into RGBA pixels.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbaImage, ConvertError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(ConvertError::EmptyImage);
    }
    Ok(img)
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Decode raw image bytes and fit the result to the canvas.
    ///
    /// On failure the previously loaded image (if any) is kept.
    pub fn load(&mut self, bytes: &[u8]) -> Result<Viewport, ConvertError> {
        let img = decode_upload(bytes)?;
        Ok(self.set_image(img))
    }

    /// Replace the image with already decoded pixels and fit it to the canvas.
    pub fn set_image(&mut self, img: RgbaImage) -> Viewport {
        self.viewport = Viewport::fit(img.width(), img.height());
        self.image = Some(Arc::new(img));
        self.viewport
    }

    pub fn nudge(&mut self, nudge: Nudge) -> Result<Viewport, ConvertError> {
        if self.image.is_none() {
            return Err(ConvertError::NoImageLoaded);
        }
        self.viewport = nudge.apply(self.viewport);
        Ok(self.viewport)
    }

    /// The canvas with the image drawn at the current viewport.
    pub fn render_canvas(&self) -> Result<RgbaImage, ConvertError> {
        let img = self.image.as_deref().ok_or(ConvertError::NoImageLoaded)?;
        Ok(draw_canvas(img, self.viewport))
    }

    /// The canvas with the sample window outlined, for previews.
    pub fn render_preview(&self) -> Result<RgbaImage, ConvertError> {
        let mut canvas = self.render_canvas()?;
        let outline = Rgba([0, 0, 0, 255]);
        let (lo, hi) = (WINDOW_ORIGIN - 1, WINDOW_ORIGIN + WINDOW_SIZE);
        for i in lo..=hi {
            canvas.put_pixel(i, lo, outline);
            canvas.put_pixel(i, hi, outline);
            canvas.put_pixel(lo, i, outline);
            canvas.put_pixel(hi, i, outline);
        }
        Ok(canvas)
    }

    /// Sample the window into a fully lit grid.
    pub fn decode(&self) -> Result<Grid, ConvertError> {
        let canvas = self.render_canvas()?;
        Ok(sample_window(&canvas))
    }
}

/// Draw `img` scaled to `viewport` onto a blank canvas.
///
/// Only canvas pixels covered by the viewport are visited; each one looks up
/// the source pixel under its center.
fn draw_canvas(img: &RgbaImage, viewport: Viewport) -> RgbaImage {
    let mut canvas = RgbaImage::new(CANVAS_SIZE, CANVAS_SIZE);
    let Viewport {
        x,
        y,
        width,
        height,
    } = viewport;
    if width <= 0 || height <= 0 {
        return canvas;
    }

    for cy in visible_span(y, height) {
        let sy = source_coord(cy - y, height, img.height());
        for cx in visible_span(x, width) {
            let sx = source_coord(cx - x, width, img.width());
            canvas.put_pixel(cx as u32, cy as u32, *img.get_pixel(sx, sy));
        }
    }
    canvas
}

/// Canvas pixels in `origin..origin + len`, clipped to the canvas.
fn visible_span(origin: i64, len: i64) -> Range<i64> {
    let edge = CANVAS_SIZE as i64;
    origin.clamp(0, edge)..origin.saturating_add(len).clamp(0, edge)
}

/// Source pixel under the center of the `offset`-th of `span` scaled pixels.
///
/// `offset` is in `0..span`, so the result is in `0..source_len`.
fn source_coord(offset: i64, span: i64, source_len: u32) -> u32 {
    let scaled = (2 * offset as i128 + 1) * source_len as i128 / (2 * span as i128);
    scaled as u32
}

/// Canvas coordinate of the center of sample cell `(col, row)`.
pub fn sample_point(pos: GridPos) -> (u32, u32) {
    let half = CELL_SIZE / 2;
    (
        WINDOW_ORIGIN + CELL_SIZE * pos.col() as u32 + half,
        WINDOW_ORIGIN + CELL_SIZE * pos.row() as u32 + half,
    )
}

/// Read every cell center of the sample window on `canvas`.
pub fn sample_window(canvas: &RgbaImage) -> Grid {
    debug_assert_eq!(WINDOW_SIZE, CELL_SIZE * ROWS as u32);
    let mut grid = Grid::default();
    for pos in GridPos::all() {
        let (x, y) = sample_point(pos);
        let color = Color::from(*canvas.get_pixel(x, y));
        grid.set_cell(pos, true, color);
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LED_COUNT;
    use image::{ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Cursor;

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        png_bytes(&RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    #[test]
    fn sample_points_are_cell_centers() {
        assert_eq!(sample_point(GridPos::new(0, 0).unwrap()), (165, 165));
        assert_eq!(sample_point(GridPos::new(7, 0).unwrap()), (235, 165));
        assert_eq!(sample_point(GridPos::new(2, 5).unwrap()), (185, 215));
    }

    #[test]
    fn solid_red_image_decodes_to_all_red_lit_frame() {
        let mut converter = Converter::new();
        converter.load(&solid(CANVAS_SIZE, CANVAS_SIZE, [255, 0, 0])).unwrap();

        let grid = converter.decode().unwrap();
        assert_eq!(grid.active_ids(), (0..LED_COUNT as u8).collect::<Vec<_>>());
        assert!(grid.cells().all(|(_, c)| c.color.to_hex() == "#ff0000"));
        for (pos, cell) in grid.cells() {
            assert_eq!(cell.physical_index(), pos.led_index());
        }
    }

    #[rstest]
    #[case(100, 100, 400)]
    #[case(200, 100, 200)]
    #[case(100, 200, 800)]
    #[case(3, 2, 267)]
    fn load_fits_image_to_canvas_width(#[case] w: u32, #[case] h: u32, #[case] expected_h: i64) {
        let mut converter = Converter::new();
        let viewport = converter.load(&solid(w, h, [0, 0, 0])).unwrap();
        assert_eq!(
            viewport,
            Viewport {
                x: 0,
                y: 0,
                width: 400,
                height: expected_h
            }
        );
    }

    #[test]
    fn garbage_bytes_fail_and_keep_previous_image() {
        let mut converter = Converter::new();
        assert!(matches!(
            converter.load(b"definitely not an image"),
            Err(ConvertError::Decode(_))
        ));
        assert!(!converter.has_image());

        converter.load(&solid(10, 10, [0, 255, 0])).unwrap();
        assert!(converter.load(b"still not an image").is_err());
        assert!(converter.has_image());
        assert_eq!(converter.viewport().width, 400);
    }

    #[test]
    fn decode_without_image_is_an_error() {
        let converter = Converter::new();
        assert!(matches!(converter.decode(), Err(ConvertError::NoImageLoaded)));
    }

    #[test]
    fn nudge_without_image_is_an_error() {
        let mut converter = Converter::new();
        assert!(matches!(
            converter.nudge(Nudge::Left),
            Err(ConvertError::NoImageLoaded)
        ));
        assert_eq!(converter.viewport(), Viewport::default());
    }

    #[rstest]
    #[case(Nudge::Grow1, 0, 0, 401, 401)]
    #[case(Nudge::Shrink10, 0, 0, 390, 390)]
    #[case(Nudge::Grow100, 0, 0, 500, 500)]
    #[case(Nudge::Shrink100, 0, 0, 300, 300)]
    #[case(Nudge::Left, -1, 0, 400, 400)]
    #[case(Nudge::Right, 1, 0, 400, 400)]
    #[case(Nudge::Up, 0, -1, 400, 400)]
    #[case(Nudge::Down, 0, 1, 400, 400)]
    fn nudges_adjust_viewport(
        #[case] nudge: Nudge,
        #[case] x: i64,
        #[case] y: i64,
        #[case] width: i64,
        #[case] height: i64,
    ) {
        let mut converter = Converter::new();
        converter.load(&solid(50, 50, [0, 0, 0])).unwrap();
        assert_eq!(
            converter.nudge(nudge).unwrap(),
            Viewport {
                x,
                y,
                width,
                height
            }
        );
    }

    #[test]
    fn window_outside_image_reads_background() {
        let mut converter = Converter::new();
        converter.load(&solid(20, 20, [255, 255, 255])).unwrap();
        // 400 -> 100 px: the image now ends well before the window at 160.
        for _ in 0..3 {
            converter.nudge(Nudge::Shrink100).unwrap();
        }
        let grid = converter.decode().unwrap();
        assert!(grid.cells().all(|(_, c)| c.on && c.color == Color::BLACK));
    }

    #[test]
    fn fully_shrunk_image_draws_nothing() {
        let mut converter = Converter::new();
        converter.load(&solid(20, 20, [255, 255, 255])).unwrap();
        for _ in 0..5 {
            converter.nudge(Nudge::Shrink100).unwrap();
        }
        assert_eq!(converter.viewport().width, -100);
        let canvas = converter.render_canvas().unwrap();
        assert!(canvas.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn decode_samples_each_cell_independently() {
        // 10 px blocks aligned with the sample cells, colored by block index.
        let img = RgbImage::from_fn(CANVAS_SIZE, CANVAS_SIZE, |x, y| {
            image::Rgb([(x / 10) as u8 * 5, (y / 10) as u8 * 5, 128])
        });
        let mut converter = Converter::new();
        converter.load(&png_bytes(&img)).unwrap();

        let grid = converter.decode().unwrap();
        for (pos, cell) in grid.cells() {
            let block_x = 16 + pos.col() as u8;
            let block_y = 16 + pos.row() as u8;
            assert_eq!(cell.color, Color::new(block_x * 5, block_y * 5, 128));
        }
    }

    #[test]
    fn panning_moves_image_under_fixed_window() {
        // Left half red, right half blue, exactly canvas width.
        let img = RgbImage::from_fn(CANVAS_SIZE, CANVAS_SIZE, |x, _| {
            if x < 200 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let mut converter = Converter::new();
        converter.load(&png_bytes(&img)).unwrap();

        let before = converter.decode().unwrap();
        assert_eq!(before.cell(GridPos::new(3, 0).unwrap()).color, Color::RED);
        assert_eq!(
            before.cell(GridPos::new(4, 0).unwrap()).color,
            Color::new(0, 0, 255)
        );

        // Shift the image 40 px right: the red/blue boundary moves to x = 240.
        for _ in 0..40 {
            converter.nudge(Nudge::Right).unwrap();
        }
        let after = converter.decode().unwrap();
        assert!(after.cells().all(|(_, c)| c.color == Color::RED));
    }

    #[test]
    fn huge_viewport_decodes_without_scaling_whole_image() {
        let mut converter = Converter::new();
        converter.load(&solid(10, 10, [0, 200, 40])).unwrap();
        for _ in 0..300 {
            converter.nudge(Nudge::Grow100).unwrap();
        }
        assert_eq!(converter.viewport().width, 30_400);

        let grid = converter.decode().unwrap();
        assert!(grid.cells().all(|(_, c)| c.color == Color::new(0, 200, 40)));
    }

    #[test]
    fn upscaled_image_keeps_quadrants() {
        // 2x2 source, fitted to 400 px: each source pixel covers 200x200.
        let img = RgbImage::from_fn(2, 2, |x, y| match (x, y) {
            (0, 0) => image::Rgb([255, 0, 0]),
            (1, 0) => image::Rgb([0, 255, 0]),
            (0, 1) => image::Rgb([0, 0, 255]),
            _ => image::Rgb([255, 255, 0]),
        });
        let mut converter = Converter::new();
        converter.load(&png_bytes(&img)).unwrap();

        let grid = converter.decode().unwrap();
        let color = |col, row| grid.cell(GridPos::new(col, row).unwrap()).color;
        assert_eq!(color(0, 0), Color::new(255, 0, 0));
        assert_eq!(color(7, 0), Color::new(0, 255, 0));
        assert_eq!(color(0, 7), Color::new(0, 0, 255));
        assert_eq!(color(7, 7), Color::new(255, 255, 0));
    }

    #[test]
    fn image_partly_off_canvas_is_clipped() {
        let mut converter = Converter::new();
        converter.load(&solid(10, 10, [255, 255, 255])).unwrap();
        for _ in 0..300 {
            converter.nudge(Nudge::Left).unwrap();
        }
        // Drawn from x = -300 to 100: the left edge of the canvas is covered.
        let canvas = converter.render_canvas().unwrap();
        assert_eq!(canvas.get_pixel(0, 0)[3], 255);
        assert_eq!(canvas.get_pixel(99, 0)[3], 255);
        assert_eq!(canvas.get_pixel(100, 0)[3], 0);
    }

    #[test]
    fn snapshot_shares_pixels_and_keeps_viewport() {
        let mut converter = Converter::new();
        converter.load(&solid(10, 10, [255, 0, 0])).unwrap();
        let snapshot = converter.clone();
        converter.nudge(Nudge::Shrink100).unwrap();

        assert_eq!(snapshot.viewport().width, 400);
        assert!(snapshot.decode().unwrap().cells().all(|(_, c)| c.color == Color::RED));
    }

    #[rstest]
    #[case("grow_1", Nudge::Grow1)]
    #[case("shrink_1", Nudge::Shrink1)]
    #[case("grow_10", Nudge::Grow10)]
    #[case("shrink_10", Nudge::Shrink10)]
    #[case("grow_100", Nudge::Grow100)]
    #[case("shrink_100", Nudge::Shrink100)]
    #[case("left", Nudge::Left)]
    #[case("down", Nudge::Down)]
    fn nudge_wire_names(#[case] name: &str, #[case] expected: Nudge) {
        let parsed: Nudge = serde_json::from_value(serde_json::json!(name)).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn nudge_rejects_unseparated_names() {
        assert!(serde_json::from_str::<Nudge>("\"shrink10\"").is_err());
    }

    #[test]
    fn preview_outlines_window() {
        let mut converter = Converter::new();
        converter.load(&solid(10, 10, [255, 255, 255])).unwrap();
        let preview = converter.render_preview().unwrap();
        assert_eq!(*preview.get_pixel(159, 200), Rgba([0, 0, 0, 255]));
        assert_eq!(*preview.get_pixel(240, 200), Rgba([0, 0, 0, 255]));
        let inside = preview.get_pixel(200, 200);
        assert_eq!(inside[3], 255);
        assert!(inside[0] > 200 && inside[1] > 200 && inside[2] > 200);
    }
}
