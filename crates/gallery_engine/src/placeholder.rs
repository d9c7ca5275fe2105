use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

pub const PLACEHOLDER_WIDTH: u32 = 800;
pub const PLACEHOLDER_HEIGHT: u32 = 600;
pub const PLACEHOLDER_TEXT: &str = "FAILED TO LOAD";

const BACKGROUND: Rgb<u8> = Rgb([0x1a, 0x1a, 0x1a]);
const FOREGROUND: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const SCALE: u32 = 5;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const ADVANCE: u32 = GLYPH_WIDTH + 1;

/// 5x7 bitmaps, one byte per row, most significant of the low five bits on the left.
fn glyph(c: char) -> Option<[u8; 7]> {
    let rows = match c {
        'A' => [0x0e, 0x11, 0x11, 0x1f, 0x11, 0x11, 0x11],
        'D' => [0x1e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1e],
        'E' => [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x1f],
        'F' => [0x1f, 0x10, 0x10, 0x1e, 0x10, 0x10, 0x10],
        'I' => [0x0e, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0e],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1f],
        'O' => [0x0e, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0e],
        'T' => [0x1f, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        _ => return None,
    };
    Some(rows)
}

/// Dark, fixed-size stand-in image with the failure marker centred on it.
pub fn placeholder_image() -> RgbImage {
    let mut img = RgbImage::from_pixel(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, BACKGROUND);
    let chars = PLACEHOLDER_TEXT.chars().count() as u32;
    let text_width = (chars * ADVANCE - 1) * SCALE;
    let origin_x = (PLACEHOLDER_WIDTH - text_width) / 2;
    let origin_y = (PLACEHOLDER_HEIGHT - GLYPH_HEIGHT * SCALE) / 2;

    for (position, c) in PLACEHOLDER_TEXT.chars().enumerate() {
        let Some(rows) = glyph(c) else {
            continue;
        };
        let glyph_x = origin_x + position as u32 * ADVANCE * SCALE;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x0 = glyph_x + col * SCALE;
                let y0 = origin_y + row as u32 * SCALE;
                for dy in 0..SCALE {
                    for dx in 0..SCALE {
                        img.put_pixel(x0 + dx, y0 + dy, FOREGROUND);
                    }
                }
            }
        }
    }
    img
}

pub fn placeholder_png() -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    placeholder_image().write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
