// THEORY:
// The segmenter turns an equalized HSV frame into one binary mask per target
// color. Each mask is a per-pixel inclusive-range test against calibrated
// hue/saturation/value bounds, then cleaned with morphological opening
// (erosion then dilation, removes speckle) followed by closing (dilation
// then erosion, fills small holes).
//
// Red needs special handling: its hue band straddles the wrap-around point
// of the hue circle, so it is expressed as two disjoint ranges whose masks
// are unioned before morphology.
//
// Colors are a closed enum. The frame source and any configuration surface
// speak strings; `TargetColor::normalize` is the single place those strings
// are interpreted, so no stringly-typed color ever travels further into the
// pipeline.

use crate::core_modules::frame::{HsvFrame, Mask};
use crate::core_modules::pixel::pixel::HsvPixel;

/// Side length of the square structuring element used for opening/closing.
pub const MORPH_KERNEL_SIZE: u32 = 5;

/// The colors this system is calibrated to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetColor {
    Red,
    Green,
    Magenta,
}

impl TargetColor {
    pub const ALL: [TargetColor; 3] = [TargetColor::Red, TargetColor::Green, TargetColor::Magenta];

    /// Maps loose external spellings onto the closed enum. Legacy labels
    /// from the field ("rojo", "verde") are accepted alongside the English
    /// names.
    pub fn normalize(label: &str) -> Option<TargetColor> {
        match label.trim().to_ascii_lowercase().as_str() {
            "red" | "rojo" => Some(TargetColor::Red),
            "green" | "verde" => Some(TargetColor::Green),
            "magenta" | "purple" => Some(TargetColor::Magenta),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetColor::Red => "Red",
            TargetColor::Green => "Green",
            TargetColor::Magenta => "Magenta",
        }
    }

    /// Single-letter wire code used by the raw pilar command encoding.
    /// Magenta marks the parking section, hence the "E".
    pub fn code(&self) -> char {
        match self {
            TargetColor::Red => 'R',
            TargetColor::Green => 'G',
            TargetColor::Magenta => 'E',
        }
    }
}

/// An inclusive HSV threshold range.
#[derive(Debug, Clone, Copy)]
pub struct HsvRange {
    pub lo: (u8, u8, u8),
    pub hi: (u8, u8, u8),
}

impl HsvRange {
    #[inline]
    fn contains(&self, p: HsvPixel) -> bool {
        p.hue >= self.lo.0
            && p.hue <= self.hi.0
            && p.saturation >= self.lo.1
            && p.saturation <= self.hi.1
            && p.value >= self.lo.2
            && p.value <= self.hi.2
    }
}

/// Low red band, at the bottom of the hue circle.
pub const RED_LOW_RANGE: HsvRange = HsvRange {
    lo: (0, 100, 80),
    hi: (10, 255, 255),
};

/// High red band, just below the wrap-around point.
pub const RED_HIGH_RANGE: HsvRange = HsvRange {
    lo: (172, 100, 80),
    hi: (180, 255, 255),
};

/// Green band, widened at the low end to keep very dark greens.
pub const GREEN_RANGE: HsvRange = HsvRange {
    lo: (30, 40, 25),
    hi: (90, 255, 255),
};

pub const MAGENTA_RANGE: HsvRange = HsvRange {
    lo: (145, 90, 60),
    hi: (170, 255, 255),
};

/// Builds the cleaned binary mask for one target color.
pub fn segment_color(frame: &HsvFrame, color: TargetColor) -> Mask {
    let raw = match color {
        TargetColor::Red => {
            let low = in_range(frame, &RED_LOW_RANGE);
            let high = in_range(frame, &RED_HIGH_RANGE);
            union(&low, &high)
        }
        TargetColor::Green => in_range(frame, &GREEN_RANGE),
        TargetColor::Magenta => in_range(frame, &MAGENTA_RANGE),
    };
    morph_close(&morph_open(&raw, MORPH_KERNEL_SIZE), MORPH_KERNEL_SIZE)
}

/// Segments every target color in one pass over the frame.
pub fn segment_all(frame: &HsvFrame) -> Vec<(TargetColor, Mask)> {
    TargetColor::ALL
        .iter()
        .map(|&color| (color, segment_color(frame, color)))
        .collect()
}

fn in_range(frame: &HsvFrame, range: &HsvRange) -> Mask {
    let mut mask = Mask::new(frame.width(), frame.height());
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            if range.contains(frame.get(x, y)) {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

fn union(a: &Mask, b: &Mask) -> Mask {
    let mut out = Mask::new(a.width(), a.height());
    for y in 0..a.height() {
        for x in 0..a.width() {
            out.set(x, y, a.is_set(x, y) || b.is_set(x, y));
        }
    }
    out
}

/// Erosion then dilation: removes speckle smaller than the kernel.
pub fn morph_open(mask: &Mask, kernel: u32) -> Mask {
    dilate(&erode(mask, kernel), kernel)
}

/// Dilation then erosion: fills holes smaller than the kernel.
pub fn morph_close(mask: &Mask, kernel: u32) -> Mask {
    erode(&dilate(mask, kernel), kernel)
}

fn erode(mask: &Mask, kernel: u32) -> Mask {
    let reach = (kernel / 2) as i32;
    let mut out = Mask::new(mask.width(), mask.height());
    for y in 0..mask.height() as i32 {
        for x in 0..mask.width() as i32 {
            let mut keep = true;
            'window: for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx < 0
                        || ny < 0
                        || nx >= mask.width() as i32
                        || ny >= mask.height() as i32
                        || !mask.is_set(nx as u32, ny as u32)
                    {
                        keep = false;
                        break 'window;
                    }
                }
            }
            out.set(x as u32, y as u32, keep);
        }
    }
    out
}

fn dilate(mask: &Mask, kernel: u32) -> Mask {
    let reach = (kernel / 2) as i32;
    let mut out = Mask::new(mask.width(), mask.height());
    for y in 0..mask.height() as i32 {
        for x in 0..mask.width() as i32 {
            let mut hit = false;
            'window: for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let nx = x + dx;
                    let ny = y + dy;
                    if nx >= 0
                        && ny >= 0
                        && nx < mask.width() as i32
                        && ny < mask.height() as i32
                        && mask.is_set(nx as u32, ny as u32)
                    {
                        hit = true;
                        break 'window;
                    }
                }
            }
            out.set(x as u32, y as u32, hit);
        }
    }
    out
}
