// THEORY:
// The `runtime` module gives the pure pipeline its temporal behavior. Three
// tasks cooperate around shared, mutex-guarded state:
//
// 1.  **Worker**: owns the `PerceptionPipeline` and processes one frame at a
//     time to completion from a single-slot, newest-wins inbox. A frame
//     arriving while one is in flight replaces whatever was waiting — the
//     world state a frame describes is transient, so a stale frame has no
//     value.
// 2.  **Detection monitor**: a low-frequency tick that watches the time
//     since the last detection and injects the no-detection sentinel into
//     the dispatch path once the stream has gone quiet.
// 3.  **Dispatch consumer**: drains the queue in FIFO order, paces sends to
//     the configured minimum interval, and hands tokens to the transport.
//
// The worker and the monitor both dispatch through the one shared
// `CommandStabilizer`, which is what prevents duplicate or contradictory
// injections. Shutdown stops all three tasks without draining in-flight
// state; dropped frames are safe because re-processing the next frame
// recomputes everything they carried.

use crate::core_modules::dispatch::{DispatchQueue, Transport};
use crate::core_modules::frame::Frame;
use crate::core_modules::ranker::DualDetection;
use crate::core_modules::stabilizer::CommandStabilizer;
use crate::pipeline::{PerceptionPipeline, PipelineConfig, Report};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Cadence of the detection monitor.
pub const MONITOR_TICK: Duration = Duration::from_millis(50);

/// Single-slot, newest-wins frame inbox shared with the frame source.
struct FrameSlot {
    slot: Mutex<Option<Frame>>,
    notify: Notify,
}

/// The running perception core: worker, monitor and dispatch consumer.
pub struct PerceptionRuntime {
    frames: Arc<FrameSlot>,
    queue: DispatchQueue,
    stabilizer: Arc<Mutex<CommandStabilizer>>,
    latest: Arc<Mutex<DualDetection>>,
    shutdown: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PerceptionRuntime {
    /// Spawns the three runtime tasks on the current tokio runtime.
    pub fn spawn<T: Transport + 'static>(config: PipelineConfig, transport: T) -> Self {
        let frames = Arc::new(FrameSlot {
            slot: Mutex::new(None),
            notify: Notify::new(),
        });
        let queue = DispatchQueue::new(config.dispatch_queue_depth);
        let stabilizer = Arc::new(Mutex::new(CommandStabilizer::new(config.stability_window)));
        let latest = Arc::new(Mutex::new(DualDetection::default()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let last_detection = Arc::new(Mutex::new(Instant::now()));

        let mut tasks = Vec::with_capacity(3);
        tasks.push(spawn_worker(
            config.clone(),
            frames.clone(),
            queue.clone(),
            stabilizer.clone(),
            latest.clone(),
            last_detection.clone(),
            shutdown.clone(),
        ));
        tasks.push(spawn_monitor(
            config.clone(),
            queue.clone(),
            stabilizer.clone(),
            last_detection,
            shutdown.clone(),
        ));
        tasks.push(spawn_consumer(config, queue.clone(), transport));

        Self {
            frames,
            queue,
            stabilizer,
            latest,
            shutdown,
            tasks,
        }
    }

    /// Hands a frame to the worker. Newest-wins: returns true when a stale
    /// frame was displaced to make room.
    pub fn submit_frame(&self, frame: Frame) -> bool {
        let displaced = {
            let mut slot = self.frames.slot.lock().unwrap();
            slot.replace(frame).is_some()
        };
        self.frames.notify.notify_one();
        displaced
    }

    /// The ranked detection state of the most recently analyzed frame.
    /// Replaced wholesale each frame; both slots empty means the last frame
    /// saw nothing.
    pub fn latest_detection(&self) -> DualDetection {
        self.latest.lock().unwrap().clone()
    }

    /// The command most recently handed to the dispatch path, if any.
    pub fn last_dispatched_token(&self) -> Option<String> {
        self.stabilizer
            .lock()
            .unwrap()
            .last_dispatched()
            .map(|c| c.token())
    }

    /// Stops accepting work and waits for the tasks to wind down. In-flight
    /// frames are dropped, not drained.
    pub async fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.frames.notify.notify_waiters();
        self.queue.close();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("perception runtime stopped");
    }
}

impl Drop for PerceptionRuntime {
    fn drop(&mut self) {
        // Best effort stop if shutdown() was never awaited.
        self.shutdown.store(true, Ordering::Release);
        self.frames.notify.notify_waiters();
        self.queue.close();
    }
}

fn spawn_worker(
    config: PipelineConfig,
    frames: Arc<FrameSlot>,
    queue: DispatchQueue,
    stabilizer: Arc<Mutex<CommandStabilizer>>,
    latest: Arc<Mutex<DualDetection>>,
    last_detection: Arc<Mutex<Instant>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let pipeline = PerceptionPipeline::new(config);
        loop {
            let notified = frames.notify.notified();
            let frame = frames.slot.lock().unwrap().take();
            match frame {
                Some(frame) => {
                    match pipeline.process_frame(&frame) {
                        Ok(Report::Detection(data)) => {
                            *latest.lock().unwrap() = data.dual.clone();
                            *last_detection.lock().unwrap() = Instant::now();
                            let dispatch = stabilizer
                                .lock()
                                .unwrap()
                                .observe(data.command, Instant::now());
                            if let Some(command) = dispatch {
                                debug!(token = %command.token(), note = %data.note, "command stabilized");
                                queue.enqueue(command);
                            }
                        }
                        Ok(Report::NoDetection) => {
                            *latest.lock().unwrap() = DualDetection::default();
                        }
                        Err(e) => warn!("skipping frame: {e}"),
                    }
                }
                None => {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }
                    notified.await;
                }
            }
            if shutdown.load(Ordering::Acquire) {
                break;
            }
        }
    })
}

fn spawn_monitor(
    config: PipelineConfig,
    queue: DispatchQueue,
    stabilizer: Arc<Mutex<CommandStabilizer>>,
    last_detection: Arc<Mutex<Instant>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MONITOR_TICK);
        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            let quiet_for = last_detection.lock().unwrap().elapsed();
            if quiet_for > config.detection_timeout {
                let injected = stabilizer.lock().unwrap().inject_no_detection();
                if let Some(command) = injected {
                    debug!(quiet_ms = quiet_for.as_millis() as u64, "detection timeout, injecting sentinel");
                    queue.enqueue(command);
                }
            }
        }
    })
}

fn spawn_consumer<T: Transport + 'static>(
    config: PipelineConfig,
    queue: DispatchQueue,
    mut transport: T,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_send: Option<Instant> = None;
        while let Some(command) = queue.dequeue().await {
            if let Some(at) = last_send {
                let since = at.elapsed();
                if since < config.min_command_interval {
                    tokio::time::sleep(config.min_command_interval - since).await;
                }
            }

            let mut bytes = command.token().into_bytes();
            bytes.push(b'\n');
            match transport.send(&bytes) {
                Ok(()) => debug!(token = %command.token(), "command sent"),
                // Fire-and-forget: the transport owns retries, the core
                // keeps producing regardless.
                Err(e) => warn!(token = %command.token(), "transport send failed: {e}"),
            }
            last_send = Some(Instant::now());
        }
    })
}
