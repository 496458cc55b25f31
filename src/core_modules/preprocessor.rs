// THEORY:
// The preprocessor normalizes illumination before any color thresholding
// happens. Segmentation ranges are calibrated for a nominal lighting level;
// a shadowed floor or a glaring window would otherwise push target pixels
// out of their value band and silently drop detections.
//
// The tool of choice is CLAHE (contrast-limited adaptive histogram
// equalization) applied to the value channel only: the image is divided into
// a fixed grid of tiles, each tile gets its own clipped histogram and lookup
// table, and every pixel is remapped by bilinearly interpolating between the
// four nearest tile LUTs. Clipping caps how hard any single tile may stretch
// contrast, which keeps near-uniform regions from being blown up into noise
// the way global equalization would.
//
// This stage must never take the pipeline down: if the value plane is
// degenerate the frame passes through unequalized.

use crate::core_modules::frame::HsvFrame;
use crate::error::VisionError;
use tracing::warn;

/// Contrast limit, expressed as a multiplier on the uniform bin count of a
/// tile histogram. Conservative, to avoid over-equalization.
pub const CLAHE_CLIP_LIMIT: f32 = 2.0;

/// Number of tiles per axis. An 8x8 grid suits medium-sized targets.
pub const CLAHE_GRID_SIZE: usize = 8;

const BINS: usize = 256;

/// Equalizes the value channel of an HSV frame. On failure the frame is
/// returned unequalized so the pipeline stays responsive.
pub fn equalize_value_channel(frame: &HsvFrame) -> HsvFrame {
    match clahe_value_plane(frame) {
        Ok(plane) => frame.with_value_plane(&plane),
        Err(e) => {
            warn!("equalization skipped, using raw value channel: {e}");
            frame.clone()
        }
    }
}

/// Runs CLAHE over the frame's value plane and returns the remapped plane.
fn clahe_value_plane(frame: &HsvFrame) -> Result<Vec<u8>, VisionError> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    if width == 0 || height == 0 {
        return Err(VisionError::Preprocess("empty value plane"));
    }

    let plane = frame.value_plane();

    // Tile dimensions, rounded up so the grid always covers the frame.
    let tile_w = width.div_ceil(CLAHE_GRID_SIZE).max(1);
    let tile_h = height.div_ceil(CLAHE_GRID_SIZE).max(1);
    let cols = width.div_ceil(tile_w);
    let rows = height.div_ceil(tile_h);

    // One clipped-histogram LUT per tile.
    let mut luts = vec![[0u8; BINS]; cols * rows];
    for ty in 0..rows {
        for tx in 0..cols {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[plane[y * width + x] as usize] += 1;
                }
            }

            let tile_pixels = (x1 - x0) * (y1 - y0);
            clip_and_redistribute(&mut hist, tile_pixels);
            luts[ty * cols + tx] = lut_from_histogram(&hist, tile_pixels);
        }
    }

    // Remap every pixel through the four nearest tile LUTs.
    let mut out = vec![0u8; plane.len()];
    for y in 0..height {
        let fy = (y as f32 / tile_h as f32) - 0.5;
        let ty0 = (fy.floor().max(0.0)) as usize;
        let ty1 = (ty0 + 1).min(rows - 1);
        let wy = if ty0 == ty1 {
            0.0
        } else {
            (fy - ty0 as f32).clamp(0.0, 1.0)
        };

        for x in 0..width {
            let fx = (x as f32 / tile_w as f32) - 0.5;
            let tx0 = (fx.floor().max(0.0)) as usize;
            let tx1 = (tx0 + 1).min(cols - 1);
            let wx = if tx0 == tx1 {
                0.0
            } else {
                (fx - tx0 as f32).clamp(0.0, 1.0)
            };

            let v = plane[y * width + x] as usize;
            let v00 = luts[ty0 * cols + tx0][v] as f32;
            let v10 = luts[ty0 * cols + tx1][v] as f32;
            let v01 = luts[ty1 * cols + tx0][v] as f32;
            let v11 = luts[ty1 * cols + tx1][v] as f32;

            let blended = v00 * (1.0 - wx) * (1.0 - wy)
                + v10 * wx * (1.0 - wy)
                + v01 * (1.0 - wx) * wy
                + v11 * wx * wy;

            out[y * width + x] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(out)
}

/// Caps histogram bins at the clip limit and spreads the excess evenly.
fn clip_and_redistribute(hist: &mut [u32; BINS], tile_pixels: usize) {
    let limit = ((tile_pixels as f32 / BINS as f32) * CLAHE_CLIP_LIMIT).ceil() as u32;

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let share = excess / BINS as u32;
    let remainder = (excess % BINS as u32) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += share;
        if i < remainder {
            *bin += 1;
        }
    }
}

/// Builds the cumulative-distribution lookup table for one tile.
fn lut_from_histogram(hist: &[u32; BINS], total: usize) -> [u8; BINS] {
    let mut cdf = [0u32; BINS];
    let mut running = 0u32;
    for (i, &count) in hist.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let mut lut = [0u8; BINS];
    let denom = total as f32 - cdf_min as f32;
    if denom <= 0.0 {
        // A flat tile: every pixel has the same value, leave it dark.
        return lut;
    }
    for i in 0..BINS {
        let mapped = (cdf[i] as f32 - cdf_min as f32) / denom * 255.0;
        lut[i] = mapped.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::Frame;

    fn frame_from_gray(width: u32, height: u32, values: &[u8]) -> HsvFrame {
        let mut data = Vec::with_capacity(values.len() * 4);
        for &v in values {
            data.extend_from_slice(&[v, v, v, 255]);
        }
        Frame::from_rgba(width, height, data).unwrap().to_hsv()
    }

    #[test]
    fn low_contrast_plane_is_stretched() {
        // Values squeezed into [100, 120] should spread out noticeably, but
        // the clip limit keeps the stretch bounded (no full-range blowout).
        let width = 256u32;
        let height = 256u32;
        let values: Vec<u8> = (0..width * height)
            .map(|i| 100 + (i % 21) as u8)
            .collect();
        let frame = frame_from_gray(width, height, &values);

        let out = equalize_value_channel(&frame);
        let plane = out.value_plane();
        let lo = *plane.iter().min().unwrap();
        let hi = *plane.iter().max().unwrap();
        assert!(hi - lo > 40, "range {lo}..{hi} was not expanded");
    }

    #[test]
    fn hue_and_saturation_are_untouched() {
        let data = vec![180u8, 40, 40, 255].repeat(32 * 32);
        let frame = Frame::from_rgba(32, 32, data).unwrap().to_hsv();
        let before = frame.get(10, 10);

        let out = equalize_value_channel(&frame);
        let after = out.get(10, 10);
        assert_eq!(after.hue, before.hue);
        assert_eq!(after.saturation, before.saturation);
    }

    #[test]
    fn bright_object_on_black_keeps_its_extremes() {
        // A bright patch on a black background must stay separable: black
        // stays at 0 and the patch stays near the top of the range.
        let width = 40u32;
        let height = 40u32;
        let mut values = vec![0u8; (width * height) as usize];
        for y in 10..30 {
            for x in 10..30 {
                values[(y * width + x) as usize] = 250;
            }
        }
        let frame = frame_from_gray(width, height, &values);
        let plane = equalize_value_channel(&frame).value_plane();

        assert_eq!(plane[0], 0);
        assert!(plane[(15 * width + 15) as usize] > 200);
    }

    #[test]
    fn non_divisible_dimensions_are_covered() {
        let width = 50u32;
        let height = 37u32;
        let values = vec![90u8; (width * height) as usize];
        let frame = frame_from_gray(width, height, &values);
        let out = equalize_value_channel(&frame);
        assert_eq!(out.width(), width);
        assert_eq!(out.height(), height);
    }
}
