//! RGB pixel grids and serial frame encoding.

use crate::layout::PixelMapping;
use crate::link::BYTES_PER_CELL;
use crate::{Error, Result};
use tracing::warn;

/// One cell colour as `[r, g, b]`.
pub type Rgb = [u8; 3];

/// Read-only view of a rectangular grid of colours.
pub trait FrameSource {
    /// Number of columns.
    fn width(&self) -> usize;

    /// Number of rows.
    fn height(&self) -> usize;

    /// Colour at `(row, col)`. Callers stay within `height x width`.
    fn pixel(&self, row: usize, col: usize) -> Rgb;
}

/// Owned RGB grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    data: Vec<Rgb>,
    width: usize,
    height: usize,
}

impl Framebuffer {
    /// Creates a framebuffer initialized to black.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![[0; 3]; width * height],
            width,
            height,
        }
    }

    /// Creates a framebuffer filled with one colour.
    pub fn filled(width: usize, height: usize, color: Rgb) -> Self {
        Self {
            data: vec![color; width * height],
            width,
            height,
        }
    }

    /// Fills the whole grid with a solid colour.
    pub fn fill(&mut self, color: Rgb) {
        self.data.fill(color);
    }

    /// Clears the grid to black.
    pub fn clear(&mut self) {
        self.fill([0; 3]);
    }

    /// Sets a pixel; out-of-range coordinates are ignored.
    pub fn set_pixel(&mut self, row: usize, col: usize, color: Rgb) {
        if row < self.height && col < self.width {
            self.data[row * self.width + col] = color;
        }
    }

    /// Gets a pixel, or None when out of range.
    pub fn get_pixel(&self, row: usize, col: usize) -> Option<Rgb> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }
}

impl FrameSource for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn pixel(&self, row: usize, col: usize) -> Rgb {
        self.data[row * self.width + col]
    }
}

/// Builds the serial frame buffer: every cell's colour at `led_index * 3`.
///
/// `brightness` is clamped to `[0, 1]` and scales every colour byte.
pub fn build_serial_frame<F, M>(frame: &F, mapping: &M, brightness: f32) -> Vec<u8>
where
    F: FrameSource + ?Sized,
    M: PixelMapping + ?Sized,
{
    let (width, height) = (frame.width(), frame.height());
    let mut buffer = vec![0u8; width * height * BYTES_PER_CELL];
    let scale = brightness.clamp(0.0, 1.0);

    for row in 0..height {
        for col in 0..width {
            let range = mapping
                .led_index(row, col)
                .checked_mul(BYTES_PER_CELL)
                .and_then(|start| Some(start..start.checked_add(BYTES_PER_CELL)?));
            let Some(slot) = (match range {
                Some(range) => buffer.get_mut(range),
                None => None,
            }) else {
                warn!("LED index for ({}, {}) is out of range, skipped", row, col);
                continue;
            };
            let color = frame.pixel(row, col);
            for (dst, src) in slot.iter_mut().zip(color) {
                *dst = dim(src, scale);
            }
        }
    }

    buffer
}

fn dim(value: u8, scale: f32) -> u8 {
    if scale >= 1.0 {
        value
    } else {
        (value as f32 * scale).round() as u8
    }
}

/// Parses a hex colour string (e.g. "#FF0000" or "FF0000").
pub fn parse_hex_color(s: &str) -> Result<Rgb> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(Error::InvalidColor(s.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| Error::InvalidColor(s.to_string()))
    };

    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LedLayout;

    #[test]
    fn test_set_get_pixel() {
        let mut fb = Framebuffer::new(4, 3);
        fb.set_pixel(2, 3, [1, 2, 3]);
        assert_eq!(fb.get_pixel(2, 3), Some([1, 2, 3]));
        assert_eq!(fb.get_pixel(3, 0), None);
        fb.set_pixel(9, 9, [9, 9, 9]);
        fb.clear();
        assert_eq!(fb, Framebuffer::new(4, 3));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF8000").unwrap(), [255, 128, 0]);
        assert_eq!(parse_hex_color("00ff00").unwrap(), [0, 255, 0]);
        assert!(parse_hex_color("#FFF").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
    }

    #[test]
    fn test_serial_frame_follows_mapping() {
        let mut fb = Framebuffer::new(3, 2);
        fb.set_pixel(1, 0, [10, 20, 30]);

        // Serpentine: row 1 runs right to left, so (1, 0) is LED 5.
        let buffer = build_serial_frame(&fb, &LedLayout::Serpentine { width: 3 }, 1.0);
        assert_eq!(buffer.len(), 18);
        assert_eq!(&buffer[15..18], &[10, 20, 30]);
        assert!(buffer[..15].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_serial_frame_skips_unmapped_cells() {
        // The table has no entry for (0, 1).
        let fb = Framebuffer::filled(2, 1, [1, 2, 3]);
        let buffer = build_serial_frame(&fb, &LedLayout::Table(vec![vec![0]]), 1.0);
        assert_eq!(buffer, vec![1, 2, 3, 0, 0, 0]);

        let buffer = build_serial_frame(&fb, &|_row: usize, col: usize| col * 7, 1.0);
        assert_eq!(buffer, vec![1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn test_serial_frame_brightness() {
        let fb = Framebuffer::filled(1, 1, [200, 100, 0]);
        let layout = LedLayout::RowMajor { width: 1 };
        assert_eq!(build_serial_frame(&fb, &layout, 0.5), vec![100, 50, 0]);
        assert_eq!(build_serial_frame(&fb, &layout, 7.0), vec![200, 100, 0]);
        assert_eq!(build_serial_frame(&fb, &layout, -1.0), vec![0, 0, 0]);
    }
}
