// THEORY:
// The `frame` module owns the three buffer types that flow through a single
// pipeline pass:
//
// 1.  **Frame**: the raw RGBA frame as handed over by the frame source. It is
//     validated once at construction — every later stage can then index it
//     without re-checking bounds. Frames are ephemeral: one pipeline pass
//     consumes one frame and nothing downstream holds onto it.
// 2.  **HsvFrame**: the working-color-space image the segmenter thresholds
//     against. Produced once per pass, optionally re-written by the
//     preprocessor with an equalized value plane.
// 3.  **Mask**: a binary image, one per target color, scoped to the pass that
//     produced it. Stored as 0/255 bytes so it can be dumped straight to a
//     grayscale PNG when tuning thresholds.

use crate::core_modules::pixel::pixel::{HsvPixel, Pixel};
use crate::error::VisionError;

const BYTES_PER_PIXEL: usize = 4;

/// A raw RGBA frame received from the frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps a raw RGBA buffer, rejecting buffers whose length does not match
    /// the claimed dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, VisionError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(VisionError::MalformedFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        let index = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Pixel::from(&self.data[index..index + BYTES_PER_PIXEL])
    }

    /// Extracts a centered region of interest covering `fraction` of each
    /// dimension. A fraction at or above 1.0 returns the frame unchanged.
    pub fn crop_centered(&self, fraction: f64) -> Frame {
        if fraction >= 1.0 || fraction <= 0.0 {
            return self.clone();
        }

        let roi_width = ((self.width as f64 * fraction) as u32).max(1);
        let roi_height = ((self.height as f64 * fraction) as u32).max(1);
        let left = (self.width - roi_width) / 2;
        let top = (self.height - roi_height) / 2;

        let mut data = Vec::with_capacity(roi_width as usize * roi_height as usize * BYTES_PER_PIXEL);
        for y in top..top + roi_height {
            let row_start = (y as usize * self.width as usize + left as usize) * BYTES_PER_PIXEL;
            let row_end = row_start + roi_width as usize * BYTES_PER_PIXEL;
            data.extend_from_slice(&self.data[row_start..row_end]);
        }

        Frame {
            width: roi_width,
            height: roi_height,
            data,
        }
    }

    /// Converts the whole frame into HSV space.
    pub fn to_hsv(&self) -> HsvFrame {
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize);
        for chunk in self.data.chunks_exact(BYTES_PER_PIXEL) {
            pixels.push(Pixel::from(chunk).to_hsv());
        }
        HsvFrame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// A frame converted into the working hue/saturation/value space.
#[derive(Debug, Clone)]
pub struct HsvFrame {
    width: u32,
    height: u32,
    pixels: Vec<HsvPixel>,
}

impl HsvFrame {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> HsvPixel {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn pixels(&self) -> &[HsvPixel] {
        &self.pixels
    }

    /// Copies the value channel out as a flat plane.
    pub fn value_plane(&self) -> Vec<u8> {
        self.pixels.iter().map(|p| p.value).collect()
    }

    /// Rebuilds the frame with a replacement value plane, keeping hue and
    /// saturation untouched. The plane must match the frame's pixel count.
    pub fn with_value_plane(&self, plane: &[u8]) -> HsvFrame {
        debug_assert_eq!(plane.len(), self.pixels.len());
        let pixels = self
            .pixels
            .iter()
            .zip(plane.iter())
            .map(|(p, &value)| HsvPixel {
                hue: p.hue,
                saturation: p.saturation,
                value,
            })
            .collect();
        HsvFrame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// A binary image derived from an HsvFrame, one per target color.
/// Foreground pixels are 255, background 0.
#[derive(Debug, Clone)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != 0
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        self.data[y as usize * self.width as usize + x as usize] = if on { 255 } else { 0 };
    }

    /// Number of foreground pixels.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = Frame::from_rgba(4, 4, vec![0; 10]);
        assert!(matches!(err, Err(VisionError::MalformedFrame { .. })));
    }

    #[test]
    fn crop_centered_keeps_the_middle() {
        let mut data = vec![0u8; 10 * 10 * 4];
        // Paint the center pixel (5,5) white.
        let idx = (5 * 10 + 5) * 4;
        data[idx..idx + 4].copy_from_slice(&[255, 255, 255, 255]);
        let frame = Frame::from_rgba(10, 10, data).unwrap();

        let roi = frame.crop_centered(0.8);
        assert_eq!(roi.width(), 8);
        assert_eq!(roi.height(), 8);
        // (5,5) in the full frame is (4,4) in the 8x8 centered crop.
        assert_eq!(roi.pixel(4, 4).red, 255);
    }

    #[test]
    fn value_plane_round_trip_preserves_hue() {
        let data = vec![200u8, 40, 40, 255].repeat(4);
        let frame = Frame::from_rgba(2, 2, data).unwrap();
        let hsv = frame.to_hsv();
        let flattened = vec![10u8; 4];
        let rewritten = hsv.with_value_plane(&flattened);
        assert_eq!(rewritten.get(1, 1).hue, hsv.get(1, 1).hue);
        assert_eq!(rewritten.get(1, 1).value, 10);
    }
}
