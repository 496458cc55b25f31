// THEORY:
// This file is the main entry point for the `prometheus_vision` library
// crate. It exposes the two surfaces external consumers need:
//
// - `pipeline`: the pure per-frame API (`PerceptionPipeline`, `Report`) for
//   callers that bring their own scheduling.
// - `runtime`: the batteries-included worker/monitor/dispatch stack for
//   callers that just want to push frames and have commands come out of a
//   transport.
//
// The internal stage modules (`core_modules`) are public for tests and
// power users but are not part of the stable surface.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod runtime;
