// THEORY:
// The ranker is the point where raster work ends and decision work begins.
// It collects every contour that survived validation — across all target
// colors — and condenses the frame into at most two `Detection`s: the
// primary (largest area) and the secondary (second largest). Everything
// downstream (geometry, command resolution) speaks only in Detections.
//
// Detections are immutable snapshots of a single frame. The only history
// the system keeps is whatever the temporal stabilizer derives from the
// stream of resolved commands; the ranker itself is stateless.

use crate::core_modules::contour::Contour;
use crate::core_modules::segmenter::TargetColor;

/// One validated, ranked object in a frame.
#[derive(Debug, Clone)]
pub struct Detection {
    pub color: TargetColor,
    /// Enclosed area in square pixels.
    pub area: f64,
    /// Centroid in absolute pixel coordinates of the analyzed frame.
    pub center_x: f64,
    pub center_y: f64,
    /// Centroid normalized to [0, 1] against the analyzed frame dimensions.
    pub norm_x: f64,
    pub norm_y: f64,
    /// Dimensions of the frame the detection was made in.
    pub frame_width: u32,
    pub frame_height: u32,
}

/// The ranked output of one frame. Both slots empty is a valid terminal
/// state — the world simply contained no target.
#[derive(Debug, Clone, Default)]
pub struct DualDetection {
    pub primary: Option<Detection>,
    pub secondary: Option<Detection>,
}

/// Ranks validated contours by area and fills the primary/secondary slots.
/// Contours whose zeroth moment vanishes are excluded before ranking so no
/// degenerate centroid division can occur.
pub fn rank(
    candidates: Vec<(TargetColor, Contour)>,
    frame_width: u32,
    frame_height: u32,
) -> DualDetection {
    let mut detections: Vec<Detection> = candidates
        .into_iter()
        .filter_map(|(color, contour)| {
            let (center_x, center_y) = contour.centroid()?;
            Some(Detection {
                color,
                area: contour.area(),
                center_x,
                center_y,
                norm_x: center_x / frame_width as f64,
                norm_y: center_y / frame_height as f64,
                frame_width,
                frame_height,
            })
        })
        .collect();

    detections.sort_by(|a, b| b.area.total_cmp(&a.area));

    let mut iter = detections.into_iter();
    DualDetection {
        primary: iter.next(),
        secondary: iter.next(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::contour::Point;

    fn rect_contour(x: i32, y: i32, width: i32, height: i32) -> Contour {
        Contour::new(vec![
            Point { x, y },
            Point { x: x + width, y },
            Point { x: x + width, y: y + height },
            Point { x, y: y + height },
        ])
    }

    #[test]
    fn largest_area_becomes_primary() {
        let dual = rank(
            vec![
                (TargetColor::Green, rect_contour(0, 0, 30, 30)),
                (TargetColor::Red, rect_contour(100, 100, 60, 60)),
            ],
            320,
            240,
        );
        assert_eq!(dual.primary.unwrap().color, TargetColor::Red);
        assert_eq!(dual.secondary.unwrap().color, TargetColor::Green);
    }

    #[test]
    fn empty_input_is_a_valid_terminal_state() {
        let dual = rank(vec![], 320, 240);
        assert!(dual.primary.is_none());
        assert!(dual.secondary.is_none());
    }

    #[test]
    fn zero_moment_contours_are_excluded() {
        // A straight line has no enclosed area and must never rank.
        let line = Contour::new(vec![
            Point { x: 0, y: 0 },
            Point { x: 50, y: 0 },
            Point { x: 100, y: 0 },
        ]);
        let dual = rank(vec![(TargetColor::Green, line)], 320, 240);
        assert!(dual.primary.is_none());
    }

    #[test]
    fn centroid_is_normalized_against_frame_dimensions() {
        let dual = rank(vec![(TargetColor::Red, rect_contour(60, 40, 40, 40))], 160, 120);
        let primary = dual.primary.unwrap();
        assert!((primary.center_x - 80.0).abs() < 1e-9);
        assert!((primary.norm_x - 0.5).abs() < 1e-9);
        assert!((primary.norm_y - 0.5).abs() < 1e-9);
    }
}
