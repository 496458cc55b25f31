// THEORY:
// The geometry estimator converts image-space measurements into the two
// quantities the command resolver actually consumes: an estimated distance
// and a coarse bearing.
//
// Distance uses an inverse-square-root model calibrated against a single
// known (area, distance) pair: apparent area shrinks with the square of
// distance, so `distance = sqrt(reference_area / area) * reference_distance`.
// The estimate is clamped to the physically plausible band of the arena.
//
// Bearing comes in two deliberately separate flavors. The two-bucket
// left/right split at 0.60 is what the command tables were tuned against and
// is the ONLY bearing the resolver ever sees. The three-bucket
// left/center/right sector exists for operator display and must never feed
// command resolution — unifying the two thresholds would silently change
// command semantics.

/// Apparent area (square pixels) of a target at the reference distance.
pub const REFERENCE_AREA: f64 = 26000.0;

/// Distance in centimeters at which `REFERENCE_AREA` was measured.
pub const REFERENCE_DISTANCE_CM: f64 = 30.0;

/// Clamp band for the distance estimate.
pub const MIN_DISTANCE_CM: u32 = 10;
pub const MAX_DISTANCE_CM: u32 = 135;

/// Normalized-x split between Left and Right for command resolution.
pub const BEARING_SPLIT: f64 = 0.60;

/// Normalized-x bounds of the three-bucket display sector.
pub const SECTOR_LEFT_MAX: f64 = 0.33;
pub const SECTOR_RIGHT_MIN: f64 = 0.80;

/// Two-bucket bearing used by the command resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bearing {
    Left,
    Right,
}

impl Bearing {
    pub fn code(&self) -> char {
        match self {
            Bearing::Left => 'L',
            Bearing::Right => 'R',
        }
    }
}

/// Three-bucket sector, informational display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sector {
    Left,
    Center,
    Right,
}

/// Estimates object distance in centimeters from its apparent area.
/// Monotonic: a larger area never yields a larger distance.
pub fn estimate_distance_cm(area: f64) -> u32 {
    if area <= 0.0 {
        return MAX_DISTANCE_CM;
    }
    let estimate = (REFERENCE_AREA / area).sqrt() * REFERENCE_DISTANCE_CM;
    (estimate as u32).clamp(MIN_DISTANCE_CM, MAX_DISTANCE_CM)
}

/// Two-bucket bearing from the normalized centroid x.
pub fn bearing(norm_x: f64) -> Bearing {
    if norm_x < BEARING_SPLIT {
        Bearing::Left
    } else {
        Bearing::Right
    }
}

/// Three-bucket display sector from the normalized centroid x.
pub fn display_sector(norm_x: f64) -> Sector {
    if norm_x < SECTOR_LEFT_MAX {
        Sector::Left
    } else if norm_x > SECTOR_RIGHT_MIN {
        Sector::Right
    } else {
        Sector::Center
    }
}
