// THEORY:
// The `contour` module is the bridge between raster masks and geometry. It
// owns three jobs:
//
// 1.  **Extraction**: find the outermost boundary polygon of every connected
//     foreground region in a mask. Internal contours (holes) are ignored —
//     only the outer silhouette of an object matters for shape validation.
//     Extraction is a breadth-first component sweep with a visited grid,
//     followed by Moore-neighbour tracing of each component's border.
// 2.  **Polygon math**: area, perimeter, moments and convex hull for the
//     extracted polygons. Moments use Green's theorem over the closed
//     polygon, which is what the downstream centroid and area checks are
//     calibrated against.
// 3.  **Smoothing**: two passes of Douglas-Peucker approximation with
//     perimeter-proportional tolerances. The first pass is coarse and strips
//     pixel-level jitter; the second, finer pass runs only when the shape
//     still has more than 4 vertices and preserves corner detail. A pass
//     that degenerates the polygon falls back to its input — a noisy object
//     is better than a dropped one.

use crate::core_modules::frame::Mask;

/// A 2D point on the pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Axis-aligned bounding box of a contour.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// An ordered, closed boundary polygon. Smoothing passes replace the whole
/// contour rather than mutating it in place.
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<Point>,
}

/// Factor applied to the perimeter to get the first-pass smoothing
/// tolerance. The second pass uses half of it.
pub const SMOOTHING_EPSILON: f64 = 0.008;

// 8-neighbourhood in clockwise order (image coordinates, y grows down).
const NEIGHBOURS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// First-order polygon moments (m00, m10, m01) via Green's theorem.
    /// m00 is the signed area; the centroid is (m10/m00, m01/m00).
    pub fn moments(&self) -> (f64, f64, f64) {
        let n = self.points.len();
        if n < 3 {
            return (0.0, 0.0, 0.0);
        }
        let mut m00 = 0.0;
        let mut m10 = 0.0;
        let mut m01 = 0.0;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
            m00 += cross;
            m10 += (p.x + q.x) as f64 * cross;
            m01 += (p.y + q.y) as f64 * cross;
        }
        (m00 / 2.0, m10 / 6.0, m01 / 6.0)
    }

    /// Enclosed area in square pixels.
    pub fn area(&self) -> f64 {
        self.moments().0.abs()
    }

    /// Area-weighted centroid, or None when the zeroth moment vanishes
    /// (degenerate polygons must never reach a divide).
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let (m00, m10, m01) = self.moments();
        if m00.abs() < f64::EPSILON {
            return None;
        }
        Some((m10 / m00, m01 / m00))
    }

    /// Closed perimeter length.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                let dx = (p.x - q.x) as f64;
                let dy = (p.y - q.y) as f64;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }
}

/// Extracts the external boundary of every 8-connected foreground region.
pub fn extract_external_contours(mask: &Mask) -> Vec<Contour> {
    let width = mask.width() as i32;
    let height = mask.height() as i32;
    let mut labeled = vec![false; (width * height) as usize];
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            if labeled[idx] || !mask.is_set(x as u32, y as u32) {
                continue;
            }

            // First pixel of an unvisited component in scan order: its outer
            // border passes through it. Trace the border, then flood the
            // component so it is never revisited.
            let boundary = trace_boundary(mask, Point { x, y });
            flood_component(mask, Point { x, y }, &mut labeled);
            contours.push(Contour::new(boundary));
        }
    }

    contours
}

/// Moore-neighbour boundary tracing, clockwise, starting from the first
/// component pixel in scan order (whose west neighbour is guaranteed to be
/// background).
fn trace_boundary(mask: &Mask, start: Point) -> Vec<Point> {
    let is_set = |p: Point| -> bool {
        p.x >= 0
            && p.y >= 0
            && p.x < mask.width() as i32
            && p.y < mask.height() as i32
            && mask.is_set(p.x as u32, p.y as u32)
    };

    let mut boundary = vec![start];
    let mut current = start;
    // Direction index pointing back at the pixel we entered from; the scan
    // found `start` left-to-right, so its west neighbour is background.
    let mut backtrack = 4usize;

    // Bounded walk: a border can visit each pixel at most a handful of
    // times, so this limit is never hit by a real mask.
    let max_steps = (mask.width() as usize * mask.height() as usize + 1) * 4;
    let mut second: Option<Point> = None;

    for _ in 0..max_steps {
        let mut advanced = false;
        for i in 1..=8 {
            let dir = (backtrack + i) % 8;
            let candidate = Point {
                x: current.x + NEIGHBOURS[dir].0,
                y: current.y + NEIGHBOURS[dir].1,
            };
            if !is_set(candidate) {
                continue;
            }

            // Closed the loop: back at the start, about to repeat the walk.
            if candidate == start && second.is_some() && current != start {
                if boundary.len() > 1 {
                    return boundary;
                }
            }
            if second.is_none() {
                second = Some(candidate);
            }

            if candidate != start {
                boundary.push(candidate);
            }
            backtrack = (dir + 4) % 8;
            current = candidate;
            advanced = true;
            break;
        }
        if !advanced {
            // Isolated pixel.
            break;
        }
        if current == start && boundary.len() > 1 {
            return boundary;
        }
    }

    boundary
}

/// Marks every pixel of the component containing `seed` as labeled.
fn flood_component(mask: &Mask, seed: Point, labeled: &mut [bool]) {
    let width = mask.width() as i32;
    let height = mask.height() as i32;
    let mut queue = vec![seed];
    labeled[(seed.y * width + seed.x) as usize] = true;

    while let Some(p) = queue.pop() {
        for (dx, dy) in NEIGHBOURS {
            let nx = p.x + dx;
            let ny = p.y + dy;
            if nx < 0 || ny < 0 || nx >= width || ny >= height {
                continue;
            }
            let idx = (ny * width + nx) as usize;
            if !labeled[idx] && mask.is_set(nx as u32, ny as u32) {
                labeled[idx] = true;
                queue.push(Point { x: nx, y: ny });
            }
        }
    }
}

/// Smooths a contour with up to two passes of polygon approximation.
/// Degenerate results fall back to the unsmoothed input.
pub fn smooth_contour(contour: &Contour) -> Contour {
    if contour.points.len() < 3 {
        return contour.clone();
    }

    let epsilon = SMOOTHING_EPSILON * contour.perimeter();
    let first = approx_poly_closed(&contour.points, epsilon);
    if first.len() < 3 {
        return contour.clone();
    }

    let smoothed = if first.len() > 4 {
        let first_contour = Contour::new(first.clone());
        let refine_epsilon = SMOOTHING_EPSILON * 0.5 * first_contour.perimeter();
        let second = approx_poly_closed(&first, refine_epsilon);
        if second.len() >= 3 { second } else { first }
    } else {
        first
    };

    Contour::new(smoothed)
}

/// Douglas-Peucker approximation of a closed polygon. The ring is split at
/// its first vertex and the vertex farthest from it, each open chain is
/// simplified independently, and the halves are rejoined.
pub fn approx_poly_closed(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let anchor = points[0];
    let mut pivot = 0;
    let mut best = 0.0;
    for (i, p) in points.iter().enumerate() {
        let dx = (p.x - anchor.x) as f64;
        let dy = (p.y - anchor.y) as f64;
        let d = dx * dx + dy * dy;
        if d > best {
            best = d;
            pivot = i;
        }
    }
    if pivot == 0 {
        // Every point coincides with the anchor.
        return vec![anchor];
    }

    let mut ring: Vec<Point> = points.to_vec();
    ring.push(anchor);

    let half_one = douglas_peucker(&ring[0..=pivot], epsilon);
    let half_two = douglas_peucker(&ring[pivot..], epsilon);

    let mut out = half_one;
    out.pop(); // pivot is re-added by the second half
    out.extend_from_slice(&half_two);
    out.pop(); // the duplicated anchor closing the ring
    out
}

/// Classic recursive Douglas-Peucker over an open chain.
fn douglas_peucker(chain: &[Point], epsilon: f64) -> Vec<Point> {
    if chain.len() <= 2 {
        return chain.to_vec();
    }

    let first = chain[0];
    let last = chain[chain.len() - 1];
    let mut best = 0.0;
    let mut index = 0;
    for (i, p) in chain.iter().enumerate().skip(1).take(chain.len() - 2) {
        let d = perpendicular_distance(*p, first, last);
        if d > best {
            best = d;
            index = i;
        }
    }

    if best > epsilon {
        let mut left = douglas_peucker(&chain[..=index], epsilon);
        let right = douglas_peucker(&chain[index..], epsilon);
        left.pop();
        left.extend_from_slice(&right);
        left
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
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

/// Convex hull via Andrew's monotone chain, returned counter-clockwise.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    sorted.dedup();
    let n = sorted.len();
    if n < 3 {
        return sorted;
    }

    let cross = |o: Point, a: Point, b: Point| -> i64 {
        (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
    };

    let mut hull: Vec<Point> = Vec::with_capacity(n * 2);
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev() {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(width: u32, height: u32, x0: u32, y0: u32, w: u32, h: u32) -> Mask {
        let mut mask = Mask::new(width, height);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.set(x, y, true);
            }
        }
        mask
    }

    #[test]
    fn rectangle_yields_one_external_contour() {
        let mask = rect_mask(40, 30, 5, 5, 20, 10);
        let contours = extract_external_contours(&mask);
        assert_eq!(contours.len(), 1);

        // Boundary through pixel centers encloses (w-1) x (h-1).
        let area = contours[0].area();
        assert!((area - (19.0 * 9.0)).abs() < 1.0, "area {area}");
    }

    #[test]
    fn holes_are_ignored() {
        let mut mask = rect_mask(40, 40, 5, 5, 20, 20);
        for y in 10..15 {
            for x in 10..15 {
                mask.set(x, y, false);
            }
        }
        let contours = extract_external_contours(&mask);
        assert_eq!(contours.len(), 1, "internal contour leaked out");
    }

    #[test]
    fn separate_components_yield_separate_contours() {
        let mut mask = rect_mask(60, 30, 2, 2, 10, 10);
        for y in 15..25 {
            for x in 40..55 {
                mask.set(x, y, true);
            }
        }
        let contours = extract_external_contours(&mask);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn smoothing_reduces_rectangle_to_four_corners() {
        let mask = rect_mask(60, 60, 10, 10, 30, 20);
        let contours = extract_external_contours(&mask);
        let smoothed = smooth_contour(&contours[0]);
        assert_eq!(smoothed.points.len(), 4, "got {:?}", smoothed.points);
    }

    #[test]
    fn smoothing_preserves_area_roughly() {
        let mask = rect_mask(80, 80, 10, 10, 40, 30);
        let contours = extract_external_contours(&mask);
        let raw_area = contours[0].area();
        let smoothed = smooth_contour(&contours[0]);
        assert!((smoothed.area() - raw_area).abs() / raw_area < 0.05);
    }

    #[test]
    fn degenerate_contour_falls_back_to_input() {
        let line = Contour::new(vec![
            Point { x: 0, y: 0 },
            Point { x: 5, y: 0 },
            Point { x: 10, y: 0 },
        ]);
        let smoothed = smooth_contour(&line);
        // A zero-area polyline must survive untouched rather than vanish.
        assert_eq!(smoothed.points.len(), 3);
    }

    #[test]
    fn centroid_matches_rectangle_center() {
        let mask = rect_mask(50, 50, 10, 20, 21, 11);
        let contours = extract_external_contours(&mask);
        let (cx, cy) = contours[0].centroid().unwrap();
        assert!((cx - 20.0).abs() < 0.5, "cx {cx}");
        assert!((cy - 25.0).abs() < 0.5, "cy {cy}");
    }

    #[test]
    fn hull_of_a_cross_is_convex() {
        let points = vec![
            Point { x: 0, y: 5 },
            Point { x: 5, y: 0 },
            Point { x: 10, y: 5 },
            Point { x: 5, y: 10 },
            Point { x: 5, y: 5 }, // interior
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point { x: 5, y: 5 }));
    }
}
