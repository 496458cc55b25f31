// tests/test_pipeline.rs — End-to-end tests over synthetic scenes: painted
// RGBA frames go through ROI, equalization, segmentation, contour work,
// validation, ranking and command resolution in one call.

use prometheus_vision::core_modules::command::Command;
use prometheus_vision::core_modules::frame::Frame;
use prometheus_vision::core_modules::geometry::Sector;
use prometheus_vision::core_modules::segmenter::TargetColor;
use prometheus_vision::pipeline::{CommandMode, PerceptionPipeline, PipelineConfig, Report};

const GREEN: [u8; 4] = [0, 255, 0, 255];
const RED: [u8; 4] = [255, 0, 0, 255];
const MAGENTA: [u8; 4] = [255, 0, 255, 255];

/// Paints a dark floor with colored rectangles on top.
fn scene(width: u32, height: u32, rects: &[(u32, u32, u32, u32, [u8; 4])]) -> Frame {
    let mut data = vec![0u8; (width * height * 4) as usize];
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&[12, 12, 12, 255]);
    }
    for &(x0, y0, w, h, rgba) in rects {
        for y in y0..(y0 + h).min(height) {
            for x in x0..(x0 + w).min(width) {
                let idx = ((y * width + x) * 4) as usize;
                data[idx..idx + 4].copy_from_slice(&rgba);
            }
        }
    }
    Frame::from_rgba(width, height, data).unwrap()
}

fn pipeline(width: u32, height: u32) -> PerceptionPipeline {
    let mut config = PipelineConfig::new(width, height);
    config.roi_fraction = 1.0;
    PerceptionPipeline::new(config)
}

fn detection_data(report: Report) -> prometheus_vision::pipeline::DetectionData {
    match report {
        Report::Detection(data) => data,
        Report::NoDetection => panic!("expected a detection"),
    }
}

#[test]
fn green_marker_mid_left_resolves_to_c09() {
    // A 55x54 marker traces to a 54x53 boundary polygon (2862 px^2), which
    // the calibration maps to 90cm: squarely in the mid zone.
    let frame = scene(320, 240, &[(40, 90, 55, 54, GREEN)]);
    let report = pipeline(320, 240).process_frame(&frame).unwrap();

    let data = detection_data(report);
    let primary = data.dual.primary.as_ref().unwrap();
    assert_eq!(primary.color, TargetColor::Green);
    assert_eq!(data.primary_distance_cm, 90);
    assert_eq!(data.command, Command::Case("C09"));
    assert!(data.dual.secondary.is_none());
}

#[test]
fn red_near_left_plus_green_far_right_resolves_to_the_dual_case() {
    // Primary: 98x97 red, boundary area 9312 -> 50cm (near zone), on the
    // left. Secondary: 42x40 green, boundary area 1599 -> 120cm (far zone),
    // on the right. The configured dual pattern (Red,L,Green,R) is C15.
    let frame = scene(
        320,
        240,
        &[(20, 40, 98, 97, RED), (230, 100, 42, 40, GREEN)],
    );
    let report = pipeline(320, 240).process_frame(&frame).unwrap();

    let data = detection_data(report);
    let primary = data.dual.primary.as_ref().unwrap();
    let secondary = data.dual.secondary.as_ref().unwrap();
    assert_eq!(primary.color, TargetColor::Red);
    assert_eq!(secondary.color, TargetColor::Green);
    assert_eq!(data.primary_distance_cm, 50);
    assert_eq!(data.command, Command::Case("C15"));
}

#[test]
fn dual_scene_with_primary_outside_near_zone_falls_back_to_primary() {
    // Same pattern, but the red primary now sits in the mid zone (90cm):
    // the resolver must ignore the dual table and use red/mid/left = C10.
    let frame = scene(
        320,
        240,
        &[(20, 40, 55, 54, RED), (230, 100, 42, 40, GREEN)],
    );
    let report = pipeline(320, 240).process_frame(&frame).unwrap();

    let data = detection_data(report);
    assert_eq!(data.command, Command::Case("C10"));
    assert!(data.note.contains("using primary"));
}

#[test]
fn magenta_has_no_case_but_is_still_detected() {
    let frame = scene(320, 240, &[(40, 90, 55, 54, MAGENTA)]);
    let report = pipeline(320, 240).process_frame(&frame).unwrap();

    let data = detection_data(report);
    assert_eq!(data.dual.primary.as_ref().unwrap().color, TargetColor::Magenta);
    assert_eq!(data.command, Command::NoDetection);
}

#[test]
fn raw_pilar_mode_encodes_the_primary_directly() {
    let mut config = PipelineConfig::new(320, 240);
    config.roi_fraction = 1.0;
    config.command_mode = CommandMode::RawPilar;
    let pipeline = PerceptionPipeline::new(config);

    let frame = scene(320, 240, &[(40, 90, 55, 54, MAGENTA)]);
    let data = detection_data(pipeline.process_frame(&frame).unwrap());
    assert_eq!(data.command.token(), "E,90,L");
}

#[test]
fn a_thin_sliver_is_filtered_out_by_shape_validation() {
    // 200x8: plenty of area and color, but the aspect ratio marks it as a
    // stripe of floor tape, not a marker.
    let frame = scene(320, 240, &[(40, 100, 200, 8, GREEN)]);
    let report = pipeline(320, 240).process_frame(&frame).unwrap();
    assert!(matches!(report, Report::NoDetection));
}

#[test]
fn display_sector_is_reported_alongside_the_command() {
    // Centroid at x ~ 0.21: Left for both the display sector and the
    // resolver bearing.
    let frame = scene(320, 240, &[(40, 90, 55, 54, GREEN)]);
    let data = detection_data(pipeline(320, 240).process_frame(&frame).unwrap());
    assert_eq!(data.primary_sector, Sector::Left);

    // Centroid at x ~ 0.72: Right for the resolver (split at 0.60) but
    // still Center for the display (right sector starts at 0.80). The two
    // bucketings must stay independent.
    let frame = scene(320, 240, &[(205, 90, 55, 54, GREEN)]);
    let data = detection_data(pipeline(320, 240).process_frame(&frame).unwrap());
    assert_eq!(data.primary_sector, Sector::Center);
    assert_eq!(data.command, Command::Case("C03"));
}

#[test]
fn roi_crop_excludes_border_objects() {
    // With the default 0.8 ROI, a marker hugging the frame edge is outside
    // the analyzed region and must not be detected.
    let config = PipelineConfig::new(320, 240);
    assert!((config.roi_fraction - 0.8).abs() < 1e-9);
    let pipeline = PerceptionPipeline::new(config);

    let frame = scene(320, 240, &[(0, 0, 30, 20, GREEN)]);
    let report = pipeline.process_frame(&frame).unwrap();
    assert!(matches!(report, Report::NoDetection));
}
