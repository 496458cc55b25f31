// THEORY:
// Error taxonomy for the perception core. The guiding rule is that nothing in
// this crate is user-fatal: a bad frame is skipped, degenerate geometry falls
// back to a safe default inside the stage that hit it, and resolution
// ambiguity is answered with the sentinel command. The only errors that
// surface as `Err` are the ones a caller can meaningfully react to — a frame
// it handed us that cannot be analyzed, or a transport hand-off that failed.

use thiserror::Error;

/// Errors surfaced by the perception pipeline.
#[derive(Debug, Error)]
pub enum VisionError {
    /// The supplied pixel buffer does not describe the frame it claims to.
    #[error("frame buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    MalformedFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The frame handed to the pipeline does not match the configured size.
    #[error("frame is {got_width}x{got_height}, pipeline configured for {want_width}x{want_height}")]
    FrameSizeMismatch {
        want_width: u32,
        want_height: u32,
        got_width: u32,
        got_height: u32,
    },

    /// Value-channel equalization could not run on this frame.
    #[error("value-channel equalization failed: {0}")]
    Preprocess(&'static str),
}

/// Errors returned by a `Transport` implementation during the final hand-off.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is closed")]
    Closed,
}
