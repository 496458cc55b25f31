// THEORY:
// The shape validator decides whether a contour is a plausible rigid target
// or an organic false positive (foliage, hands, shadows). Color alone is not
// enough — a sunlit leaf can match the green band perfectly — so acceptance
// is a battery of geometric checks that a rigid rectangular marker passes
// easily and an irregular blob does not.
//
// The battery runs in two passes, mirroring how the thresholds were tuned:
// 1.  **Basic regularity**: solidity, aspect ratio, extent, and the
//     perimeter-squared-over-area complexity ratio. Cheap metrics that kill
//     most noise.
// 2.  **Advanced rectangularity**: bounding-box fill, convexity, convexity
//     defect count, sharp-angle (spike) detection, and a vertex-count band
//     after a fixed-tolerance re-approximation.
//
// Every check short-circuits on failure; since all checks are AND-ed the
// order never changes the verdict, only the work done. Each rejection is
// logged at debug level with the offending metric so thresholds can be
// re-tuned in the field from a log capture.

use crate::core_modules::contour::{Contour, Point, approx_poly_closed, convex_hull};
use tracing::debug;

/// Minimum enclosed area for a contour to be considered at all.
pub const MIN_CONTOUR_AREA: f64 = 800.0;

/// Minimum solidity (contour area / convex hull area) for regular shapes.
pub const MIN_SOLIDITY: f64 = 0.5;

/// Accepted bounding-box aspect ratio band (width / height).
pub const MIN_ASPECT_RATIO: f64 = 0.25;
pub const MAX_ASPECT_RATIO: f64 = 4.0;

/// Minimum extent (contour area / bounding-box area).
pub const MIN_EXTENT: f64 = 0.4;

/// Maximum perimeter^2 / area ratio; jagged boundaries score high.
pub const MAX_PERIMETER_AREA_RATIO: f64 = 20.0;

/// Minimum bounding-box fill for the advanced rectangularity pass.
pub const MIN_RECTANGULARITY: f64 = 0.6;

/// Minimum contour/hull area ratio under the advanced pass.
pub const MIN_CONVEXITY: f64 = 0.85;

/// Maximum number of concave notches a rigid target may show.
pub const MAX_CONVEXITY_DEFECTS: usize = 3;

/// A hull gap shallower than this is raster jitter, not a defect.
pub const DEFECT_DEPTH_FLOOR: f64 = 1.0;

/// Interior angles below this many degrees count as spikes.
pub const SPIKE_ANGLE_THRESHOLD: f64 = 45.0;

/// How many boundary vertices the spike walk inspects at most.
pub const SPIKE_SAMPLE_LIMIT: usize = 20;

/// More sharp angles than this rejects the shape as spiky/organic.
pub const MAX_SHARP_ANGLES: usize = 2;

/// Tolerance factor for the vertex-count re-approximation.
pub const VERTEX_APPROX_EPSILON: f64 = 0.02;

/// Accepted vertex-count band after re-approximation.
pub const MIN_VERTICES: usize = 4;
pub const MAX_VERTICES: usize = 12;

/// Full accept/reject verdict for a smoothed contour. Deterministic: the
/// same contour always produces the same verdict.
pub fn validate(contour: &Contour) -> bool {
    let area = contour.area();
    if area <= MIN_CONTOUR_AREA {
        debug!(area, "contour rejected: below minimum area");
        return false;
    }
    is_regular_shape(contour, area) && is_rectangular_shape(contour, area)
}

/// Basic regularity pass: cheap metrics that reject most organic noise.
fn is_regular_shape(contour: &Contour, area: f64) -> bool {
    let hull = convex_hull(&contour.points);
    let hull_area = Contour::new(hull).area();
    let solidity = if hull_area > 0.0 { area / hull_area } else { 0.0 };
    if solidity < MIN_SOLIDITY {
        debug!(solidity, "contour rejected: low solidity");
        return false;
    }

    let bbox = contour.bounding_box();
    if bbox.height <= 0 {
        return false;
    }
    let aspect_ratio = bbox.width as f64 / bbox.height as f64;
    if !(MIN_ASPECT_RATIO..=MAX_ASPECT_RATIO).contains(&aspect_ratio) {
        debug!(aspect_ratio, "contour rejected: aspect ratio out of band");
        return false;
    }

    let bbox_area = (bbox.width as f64) * (bbox.height as f64);
    let extent = area / bbox_area;
    if extent < MIN_EXTENT {
        debug!(extent, "contour rejected: low extent");
        return false;
    }

    let perimeter = contour.perimeter();
    let complexity = perimeter * perimeter / area;
    if complexity > MAX_PERIMETER_AREA_RATIO {
        debug!(complexity, "contour rejected: boundary too complex");
        return false;
    }

    true
}

/// Advanced rectangularity pass: the filters that separate a rigid marker
/// from a leaf-like silhouette of comparable size.
fn is_rectangular_shape(contour: &Contour, area: f64) -> bool {
    let bbox = contour.bounding_box();
    let bbox_area = (bbox.width as f64) * (bbox.height as f64);
    if bbox_area <= 0.0 {
        return false;
    }
    let rectangularity = area / bbox_area;
    if rectangularity < MIN_RECTANGULARITY {
        debug!(rectangularity, "contour rejected: low rectangularity");
        return false;
    }

    let hull = convex_hull(&contour.points);
    let hull_area = Contour::new(hull.clone()).area();
    let convexity = if hull_area > 0.0 { area / hull_area } else { 0.0 };
    if convexity < MIN_CONVEXITY {
        debug!(convexity, "contour rejected: low convexity");
        return false;
    }

    // Defects may be uncomputable for tiny hulls; skip the check then.
    if let Some(defects) = convexity_defect_count(&contour.points, &hull) {
        if defects > MAX_CONVEXITY_DEFECTS {
            debug!(defects, "contour rejected: too many convexity defects");
            return false;
        }
    }

    if has_sharp_spikes(&contour.points) {
        debug!("contour rejected: triangular spikes detected");
        return false;
    }

    let epsilon = VERTEX_APPROX_EPSILON * contour.perimeter();
    let vertices = approx_poly_closed(&contour.points, epsilon).len();
    if !(MIN_VERTICES..=MAX_VERTICES).contains(&vertices) {
        debug!(vertices, "contour rejected: vertex count out of band");
        return false;
    }

    true
}

/// Counts concave notches: hull gaps whose deepest boundary point sits more
/// than `DEFECT_DEPTH_FLOOR` below the hull chord. Returns None when the
/// hull is too small for defects to be defined.
fn convexity_defect_count(points: &[Point], hull: &[Point]) -> Option<usize> {
    if hull.len() < 3 || points.len() < 4 {
        return None;
    }

    // Positions of the hull vertices along the contour, in contour order.
    let mut hull_indices: Vec<usize> = hull
        .iter()
        .filter_map(|h| points.iter().position(|p| p == h))
        .collect();
    if hull_indices.len() < 3 {
        return None;
    }
    hull_indices.sort_unstable();

    let n = points.len();
    let mut defects = 0;
    for w in 0..hull_indices.len() {
        let start = hull_indices[w];
        let end = hull_indices[(w + 1) % hull_indices.len()];
        let gap_len = (end + n - start) % n;
        if gap_len <= 1 {
            continue;
        }

        let a = points[start];
        let b = points[end];
        let mut depth: f64 = 0.0;
        let mut i = (start + 1) % n;
        while i != end {
            depth = depth.max(point_to_segment(points[i], a, b));
            i = (i + 1) % n;
        }
        if depth > DEFECT_DEPTH_FLOOR {
            defects += 1;
        }
    }
    Some(defects)
}

fn point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let abx = (b.x - a.x) as f64;
    let aby = (b.y - a.y) as f64;
    let length = (abx * abx + aby * aby).sqrt();
    if length < f64::EPSILON {
        let dx = (p.x - a.x) as f64;
        let dy = (p.y - a.y) as f64;
        return (dx * dx + dy * dy).sqrt();
    }
    ((p.x - a.x) as f64 * aby - (p.y - a.y) as f64 * abx).abs() / length
}

/// Walks up to the first `SPIKE_SAMPLE_LIMIT` vertices (wrapping) and
/// measures the interior angle at each via the dot-product formula. More
/// than `MAX_SHARP_ANGLES` angles under the threshold means the outline is
/// spiky the way leaves and serrated organic shapes are.
fn has_sharp_spikes(points: &[Point]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let mut sharp_angles = 0;
    let samples = points.len().min(SPIKE_SAMPLE_LIMIT);
    for i in 0..samples {
        let p1 = points[i];
        let p2 = points[(i + 1) % points.len()];
        let p3 = points[(i + 2) % points.len()];

        let v1 = ((p1.x - p2.x) as f64, (p1.y - p2.y) as f64);
        let v2 = ((p3.x - p2.x) as f64, (p3.y - p2.y) as f64);

        let dot = v1.0 * v2.0 + v1.1 * v2.1;
        let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
        let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
        if mag1 <= 0.0 || mag2 <= 0.0 {
            continue;
        }

        let angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0).acos().to_degrees();
        if angle < SPIKE_ANGLE_THRESHOLD {
            sharp_angles += 1;
            if sharp_angles > MAX_SHARP_ANGLES {
                return true;
            }
        }
    }

    false
}
