// Example runner for the `prometheus_vision` library: paints a small
// synthetic scene — a green marker drifting across a dark floor — pushes it
// through the full runtime, and logs the commands that reach the transport.

use anyhow::Result;
use prometheus_vision::core_modules::dispatch::LoggingTransport;
use prometheus_vision::core_modules::frame::Frame;
use prometheus_vision::pipeline::PipelineConfig;
use prometheus_vision::runtime::PerceptionRuntime;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// Paints a flat dark scene with one colored rectangle.
fn synthetic_frame(rect_x: u32, rect_y: u32, rect_w: u32, rect_h: u32, rgba: [u8; 4]) -> Frame {
    let mut data = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&[12, 12, 12, 255]);
    }
    for y in rect_y..(rect_y + rect_h).min(HEIGHT) {
        for x in rect_x..(rect_x + rect_w).min(WIDTH) {
            let idx = ((y * WIDTH + x) * 4) as usize;
            data[idx..idx + 4].copy_from_slice(&rgba);
        }
    }
    Frame::from_rgba(WIDTH, HEIGHT, data).expect("buffer matches dimensions")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = PipelineConfig::new(WIDTH, HEIGHT);
    config.roi_fraction = 1.0;
    let runtime = PerceptionRuntime::spawn(config, LoggingTransport);

    // A green marker sliding slowly to the right: the stabilizer should let
    // one command through per stable pose, and the monitor should close the
    // session with the sentinel once frames stop.
    let green = [0u8, 255, 0, 255];
    for step in 0..30u32 {
        let frame = synthetic_frame(40 + step, 90, 56, 54, green);
        runtime.submit_frame(frame);
        tokio::time::sleep(Duration::from_millis(33)).await;
    }

    tokio::time::sleep(Duration::from_millis(400)).await;
    if let Some(token) = runtime.last_dispatched_token() {
        tracing::info!(%token, "final dispatched token");
    }
    runtime.shutdown().await;
    Ok(())
}
