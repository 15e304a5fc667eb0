//! Face box and label drawing on RGB frames.
//!
//! Labels use a built-in 5x7 bitmap font (upper-case letters, digits and a
//! little punctuation), scaled up so names stay readable on webcam frames.

use crate::frame::FaceLocation;
use image::{Rgb, RgbImage};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: u32 = 2;
const LABEL_OFFSET: i64 = 15;
const GLYPH_WIDTH: i64 = 5;
const GLYPH_HEIGHT: i64 = 7;
const GLYPH_SCALE: i64 = 2;
const GLYPH_ADVANCE: i64 = (GLYPH_WIDTH + 1) * GLYPH_SCALE;

/// Draw every face box and its label onto `frame`.
pub fn annotate_faces<'a, I>(frame: &mut RgbImage, faces: I)
where
    I: IntoIterator<Item = (FaceLocation, &'a str)>,
{
    for (location, label) in faces {
        draw_rectangle(frame, &location, BOX_COLOR, BOX_THICKNESS);
        let baseline = label_baseline(location.top);
        draw_label(frame, location.left as i64, baseline, label, BOX_COLOR);
    }
}

/// Baseline row for a label attached to a box whose top edge is `top`.
///
/// Text sits above the box unless that would put it within the top margin,
/// in which case it goes just inside the box.
pub fn label_baseline(top: u32) -> i64 {
    let top = top as i64;
    if top - LABEL_OFFSET > LABEL_OFFSET {
        top - LABEL_OFFSET
    } else {
        top + LABEL_OFFSET
    }
}

/// Draw a hollow rectangle, growing inward by `thickness` pixels. Clipped to the frame.
pub fn draw_rectangle(frame: &mut RgbImage, location: &FaceLocation, color: Rgb<u8>, thickness: u32) {
    let (left, top) = (location.left as i64, location.top as i64);
    let (right, bottom) = (location.right as i64, location.bottom as i64);

    for inset in 0..thickness as i64 {
        let (l, t, r, b) = (left + inset, top + inset, right - inset, bottom - inset);
        if l > r || t > b {
            break;
        }
        for x in l..=r {
            put_pixel(frame, x, t, color);
            put_pixel(frame, x, b, color);
        }
        for y in t..=b {
            put_pixel(frame, l, y, color);
            put_pixel(frame, r, y, color);
        }
    }
}

/// Draw `text` with its bottom row on `baseline`, starting at column `x`.
pub fn draw_label(frame: &mut RgbImage, mut x: i64, baseline: i64, text: &str, color: Rgb<u8>) {
    let top = baseline - GLYPH_HEIGHT * GLYPH_SCALE + 1;
    for ch in text.chars().flat_map(char::to_uppercase) {
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = x + col * GLYPH_SCALE;
                    let py = top + row as i64 * GLYPH_SCALE;
                    for dy in 0..GLYPH_SCALE {
                        for dx in 0..GLYPH_SCALE {
                            put_pixel(frame, px + dx, py + dy, color);
                        }
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

fn put_pixel(frame: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < frame.width() as i64 && y < frame.height() as i64 {
        frame.put_pixel(x as u32, y as u32, color);
    }
}

#[rustfmt::skip]
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '\'' => [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn count_color(frame: &RgbImage, color: Rgb<u8>) -> usize {
        frame.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn test_rectangle_edges_and_interior() {
        let mut frame = RgbImage::new(50, 50);
        let loc = FaceLocation { top: 10, right: 30, bottom: 40, left: 5 };
        draw_rectangle(&mut frame, &loc, BOX_COLOR, 2);

        assert_eq!(*frame.get_pixel(5, 10), BOX_COLOR);
        assert_eq!(*frame.get_pixel(30, 40), BOX_COLOR);
        assert_eq!(*frame.get_pixel(6, 11), BOX_COLOR); // second ring
        assert_eq!(*frame.get_pixel(15, 25), BLACK);
        assert_eq!(*frame.get_pixel(4, 10), BLACK);
    }

    #[test]
    fn test_rectangle_clipped_to_frame() {
        let mut frame = RgbImage::new(20, 20);
        let loc = FaceLocation { top: 5, right: 100, bottom: 100, left: 5 };
        draw_rectangle(&mut frame, &loc, BOX_COLOR, 2);
        assert_eq!(*frame.get_pixel(19, 5), BOX_COLOR);
        assert_eq!(*frame.get_pixel(5, 19), BOX_COLOR);
    }

    #[test]
    fn test_label_baseline_above_box() {
        assert_eq!(label_baseline(100), 85);
    }

    #[test]
    fn test_label_baseline_below_when_near_top() {
        assert_eq!(label_baseline(30), 45);
        assert_eq!(label_baseline(0), 15);
    }

    #[test]
    fn test_label_draws_within_rows_above_baseline() {
        let mut frame = RgbImage::new(100, 40);
        draw_label(&mut frame, 2, 30, "AB", BOX_COLOR);
        assert!(count_color(&frame, BOX_COLOR) > 0);
        for (_, y, p) in frame.enumerate_pixels() {
            if *p == BOX_COLOR {
                assert!(y <= 30 && y > 30 - 14, "pixel at row {y}");
            }
        }
    }

    #[test]
    fn test_label_lowercase_matches_uppercase() {
        let mut lower = RgbImage::new(80, 20);
        let mut upper = RgbImage::new(80, 20);
        draw_label(&mut lower, 0, 15, "alice", BOX_COLOR);
        draw_label(&mut upper, 0, 15, "ALICE", BOX_COLOR);
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_annotate_faces_marks_every_box() {
        let mut frame = RgbImage::new(200, 200);
        let faces = [
            (FaceLocation { top: 50, right: 80, bottom: 90, left: 40 }, "Alice"),
            (FaceLocation { top: 100, right: 180, bottom: 150, left: 120 }, "Unknown"),
        ];
        annotate_faces(&mut frame, faces);
        assert_eq!(*frame.get_pixel(40, 50), BOX_COLOR);
        assert_eq!(*frame.get_pixel(120, 100), BOX_COLOR);
    }
}
