// THEORY:
// The `pipeline` module is the top-level per-frame API of the perception
// core. It chains the full stage stack — ROI crop, HSV conversion, value
// equalization, color segmentation, contour extraction and smoothing, shape
// validation, ranking, geometry estimation and command resolution — into a
// single pure call: one `Frame` in, one `Report` out.
//
// The pipeline is deliberately free of threads, clocks and I/O. Temporal
// behavior (debouncing, timeouts, dispatch pacing) lives in `runtime`;
// keeping this layer pure makes every frame decision reproducible in a unit
// test.

use crate::core_modules::command::{self, Command, Resolved};
use crate::core_modules::contour::{extract_external_contours, smooth_contour};
use crate::core_modules::frame::Frame;
use crate::core_modules::geometry::{self, Sector};
use crate::core_modules::preprocessor::equalize_value_channel;
use crate::core_modules::ranker::{self, DualDetection};
use crate::core_modules::segmenter::{TargetColor, segment_all};
use crate::core_modules::shape_validator::validate;
use crate::core_modules::stabilizer::STABILITY_WINDOW;
use crate::error::VisionError;
use std::time::Duration;
use tracing::debug;

// Re-export key data structures for the public API.
pub use crate::core_modules::command::{NO_DETECTION_CODE, Resolved as ResolvedCommand};
pub use crate::core_modules::dispatch::{DISPATCH_QUEUE_DEPTH, MIN_COMMAND_INTERVAL};
pub use crate::core_modules::ranker::Detection;

/// Fraction of each frame dimension kept by the centered region-of-interest
/// crop. 1.0 disables cropping.
pub const ROI_FRACTION: f64 = 0.8;

/// How long the detection monitor waits before injecting the sentinel.
pub const DETECTION_TIMEOUT: Duration = Duration::from_millis(200);

/// Which wire vocabulary the resolver produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    /// Resolve against the static case tables ("C01".."C38" / "N").
    CaseTable,
    /// Encode the primary detection as a raw color,distance,bearing token.
    RawPilar,
}

/// Configuration for the perception pipeline, allowing for tunable behavior.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub image_width: u32,
    pub image_height: u32,
    /// Centered crop fraction applied before any analysis.
    pub roi_fraction: f64,
    /// Value-channel CLAHE on/off.
    pub enable_equalization: bool,
    pub command_mode: CommandMode,
    /// Dwell time a resolved command needs before dispatch.
    pub stability_window: Duration,
    /// Silence on the detection stream that triggers the sentinel.
    pub detection_timeout: Duration,
    /// Pacing floor between transport sends.
    pub min_command_interval: Duration,
    pub dispatch_queue_depth: usize,
}

impl PipelineConfig {
    pub fn new(image_width: u32, image_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            roi_fraction: ROI_FRACTION,
            enable_equalization: true,
            command_mode: CommandMode::CaseTable,
            stability_window: STABILITY_WINDOW,
            detection_timeout: DETECTION_TIMEOUT,
            min_command_interval: MIN_COMMAND_INTERVAL,
            dispatch_queue_depth: DISPATCH_QUEUE_DEPTH,
        }
    }
}

/// The detailed data package for a frame that produced a detection.
#[derive(Debug, Clone)]
pub struct DetectionData {
    pub dual: DualDetection,
    pub command: Command,
    /// How the command came about (case description or fallback note).
    pub note: String,
    /// Estimated distance of the primary, for operator display.
    pub primary_distance_cm: u32,
    /// Three-bucket display sector of the primary. Never feeds resolution.
    pub primary_sector: Sector,
}

/// The primary output of the perception pipeline for a single frame.
#[derive(Debug, Clone)]
pub enum Report {
    NoDetection,
    Detection(DetectionData),
}

/// The main, top-level struct for the perception core.
pub struct PerceptionPipeline {
    config: PipelineConfig,
}

impl PerceptionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full stage chain over one frame.
    pub fn process_frame(&self, frame: &Frame) -> Result<Report, VisionError> {
        if frame.width() != self.config.image_width || frame.height() != self.config.image_height {
            return Err(VisionError::FrameSizeMismatch {
                want_width: self.config.image_width,
                want_height: self.config.image_height,
                got_width: frame.width(),
                got_height: frame.height(),
            });
        }

        // Stage 1: Region of interest.
        let roi = frame.crop_centered(self.config.roi_fraction);

        // Stage 2: Working color space + illumination normalization.
        let hsv = roi.to_hsv();
        let hsv = if self.config.enable_equalization {
            equalize_value_channel(&hsv)
        } else {
            hsv
        };

        // Stage 3: Per-color masks.
        let masks = segment_all(&hsv);

        // Stage 4: Boundaries, smoothed, then validated.
        let mut candidates: Vec<(TargetColor, _)> = Vec::new();
        for (color, mask) in &masks {
            for contour in extract_external_contours(mask) {
                let smoothed = smooth_contour(&contour);
                if validate(&smoothed) {
                    candidates.push((*color, smoothed));
                }
            }
        }
        debug!(valid = candidates.len(), "contours surviving validation");

        // Stage 5: Ranking.
        let dual = ranker::rank(candidates, roi.width(), roi.height());
        let Some(primary) = dual.primary.clone() else {
            return Ok(Report::NoDetection);
        };

        // Stage 6: Geometry + command resolution.
        let primary_distance_cm = geometry::estimate_distance_cm(primary.area);
        let primary_bearing = geometry::bearing(primary.norm_x);
        let primary_sector = geometry::display_sector(primary.norm_x);

        let resolved = match self.config.command_mode {
            CommandMode::RawPilar => Resolved {
                command: Command::Pilar {
                    color: primary.color,
                    distance_cm: primary_distance_cm,
                    bearing: primary_bearing,
                },
                note: format!("raw {} pilar", primary.color.name()),
            },
            CommandMode::CaseTable => match &dual.secondary {
                Some(secondary) => command::resolve_dual(
                    (primary.color, primary_bearing, primary_distance_cm),
                    (
                        secondary.color,
                        geometry::bearing(secondary.norm_x),
                        geometry::estimate_distance_cm(secondary.area),
                    ),
                ),
                None => {
                    command::resolve_single(primary.color, primary_bearing, primary_distance_cm)
                }
            },
        };

        debug!(
            token = %resolved.command.token(),
            note = %resolved.note,
            "frame resolved"
        );

        Ok(Report::Detection(DetectionData {
            dual,
            command: resolved.command,
            note: resolved.note,
            primary_distance_cm,
            primary_sector,
        }))
    }
}
