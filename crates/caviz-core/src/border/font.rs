//! 5×7 bitmap glyphs for the labels drawn into the border margins.

use ndarray::Array3;

use crate::colorize::Rgba;

/// Horizontal advance per character, including one column of spacing.
pub const CHAR_W: usize = 6;
/// Line height, including spacing.
pub const CHAR_H: usize = 9;

const GLYPH_ROWS: usize = 7;

/// Rows top to bottom; bit 0x10 is the leftmost column.
#[rustfmt::skip]
fn glyph(ch: char) -> Option<[u8; GLYPH_ROWS]> {
    let g = match ch {
        ' ' => [0x00,0x00,0x00,0x00,0x00,0x00,0x00],
        '%' => [0x18,0x19,0x02,0x04,0x08,0x13,0x03],
        '+' => [0x00,0x04,0x04,0x1F,0x04,0x04,0x00],
        '-' => [0x00,0x00,0x00,0x1F,0x00,0x00,0x00],
        '.' => [0x00,0x00,0x00,0x00,0x00,0x00,0x04],
        '/' => [0x00,0x01,0x02,0x04,0x08,0x10,0x00],
        '0' => [0x0E,0x11,0x13,0x15,0x19,0x11,0x0E],
        '1' => [0x04,0x0C,0x04,0x04,0x04,0x04,0x0E],
        '2' => [0x0E,0x11,0x01,0x02,0x04,0x08,0x1F],
        '3' => [0x1F,0x02,0x04,0x02,0x01,0x11,0x0E],
        '4' => [0x02,0x06,0x0A,0x12,0x1F,0x02,0x02],
        '5' => [0x1F,0x10,0x1E,0x01,0x01,0x11,0x0E],
        '6' => [0x06,0x08,0x10,0x1E,0x11,0x11,0x0E],
        '7' => [0x1F,0x01,0x02,0x04,0x08,0x08,0x08],
        '8' => [0x0E,0x11,0x11,0x0E,0x11,0x11,0x0E],
        '9' => [0x0E,0x11,0x11,0x0F,0x01,0x02,0x0C],
        ':' => [0x00,0x00,0x04,0x00,0x00,0x04,0x00],
        'a' => [0x00,0x00,0x0E,0x01,0x0F,0x11,0x0F],
        'e' => [0x00,0x00,0x0E,0x11,0x1F,0x10,0x0E],
        'f' => [0x06,0x09,0x08,0x1C,0x08,0x08,0x08],
        'm' => [0x00,0x00,0x1A,0x15,0x15,0x11,0x11],
        'n' => [0x00,0x00,0x16,0x19,0x11,0x11,0x11],
        'r' => [0x00,0x00,0x16,0x19,0x10,0x10,0x10],
        's' => [0x00,0x00,0x0E,0x10,0x0E,0x01,0x1E],
        't' => [0x08,0x08,0x1C,0x08,0x08,0x09,0x06],
        _ => return None,
    };
    Some(g)
}

/// Pixel width of `text` when drawn.
pub fn text_width(text: &str) -> usize {
    text.chars().count() * CHAR_W
}

/// Write one RGBA pixel addressed in display coordinates (row 0 at the top).
///
/// Canvases are stored (X, Y) with Y pointing up, so rows are flipped here.
/// Out-of-range writes are dropped.
pub fn put(canvas: &mut Array3<f32>, col: usize, row: usize, color: Rgba) {
    let (w, h, _) = canvas.dim();
    if col >= w || row >= h {
        return;
    }
    let y = h - 1 - row;
    for (c, &v) in color.iter().enumerate() {
        canvas[[col, y, c]] = v;
    }
}

/// Draw `text` with its top-left corner at (`col`, `row`). Characters
/// without a glyph advance the cursor but draw nothing.
pub fn draw_text(canvas: &mut Array3<f32>, col: usize, row: usize, text: &str, color: Rgba) {
    for (i, ch) in text.chars().enumerate() {
        let Some(g) = glyph(ch) else { continue };
        let x0 = col + i * CHAR_W;
        for (r, &bits) in g.iter().enumerate() {
            for c in 0..5 {
                if bits & (0x10 >> c) != 0 {
                    put(canvas, x0 + c, row + r, color);
                }
            }
        }
    }
}
