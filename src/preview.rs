//! PNG previews of frames and of the converter canvas.

use crate::frame::Grid;
use crate::{COLUMNS, ROWS};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Fill color for LEDs that are off.
const OFF_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Border drawn around every LED square.
const BORDER: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Draw a grid as `cell_px`-sized squares with a 1 px border.
pub fn render_grid(grid: &Grid, cell_px: u32) -> RgbaImage {
    let cell_px = cell_px.max(3);
    let mut img = RgbaImage::from_pixel(COLUMNS as u32 * cell_px, ROWS as u32 * cell_px, BORDER);

    for (pos, cell) in grid.cells() {
        let fill = if cell.on {
            let [r, g, b] = cell.color.to_rgb();
            Rgba([r, g, b, 255])
        } else {
            OFF_FILL
        };
        let x0 = pos.col() as u32 * cell_px;
        let y0 = pos.row() as u32 * cell_px;
        for y in y0 + 1..y0 + cell_px - 1 {
            for x in x0 + 1..x0 + cell_px - 1 {
                img.put_pixel(x, y, fill);
            }
        }
    }
    img
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
