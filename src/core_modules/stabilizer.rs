// THEORY:
// The stabilizer is the system's defense against command flicker. A single
// misdetected frame — a shadow crossing a marker, a failed segmentation —
// would otherwise reach the actuator as a spurious command. The stabilizer
// is a debounce state machine that only forwards a resolved command once it
// has been resolved consistently for a minimum dwell time:
//
//   Idle ──observe(c)──▶ Candidating(c, now)
//   Candidating(c, t0) ──observe(c), now-t0 ≥ window──▶ Stable(c) [dispatch]
//   any state ──observe(d ≠ candidate)──▶ Candidating(d, now)
//
// A switch of candidate resets the clock completely — no hysteresis credit
// is carried over. A command is dispatched at most once per stable interval
// and never twice consecutively; the price is a bounded detection-to-action
// latency of one stability window.
//
// The stabilizer is single-writer. Both the pipeline worker and the
// no-detection monitor mutate it through one shared mutex, which is what
// keeps their dispatch decisions from contradicting each other.

use crate::core_modules::command::Command;
use std::time::{Duration, Instant};

/// Default dwell time a command must persist before dispatch. Spans several
/// frames of flicker at 30 fps while keeping reaction latency bounded.
pub const STABILITY_WINDOW: Duration = Duration::from_millis(150);

/// The debounce state. Timestamps are injected by the caller so the machine
/// stays deterministic under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StabilizerState {
    Idle,
    Candidating { command: Command, since: Instant },
    Stable { command: Command },
}

/// Debounces the stream of per-frame resolved commands.
#[derive(Debug)]
pub struct CommandStabilizer {
    state: StabilizerState,
    last_dispatched: Option<Command>,
    window: Duration,
}

impl CommandStabilizer {
    pub fn new(window: Duration) -> Self {
        Self {
            state: StabilizerState::Idle,
            last_dispatched: None,
            window,
        }
    }

    /// Feeds one resolved command into the machine. Returns the command to
    /// dispatch, if this observation completed a stability window.
    pub fn observe(&mut self, command: Command, now: Instant) -> Option<Command> {
        match &self.state {
            StabilizerState::Candidating { command: c, since } if *c == command => {
                if now.duration_since(*since) >= self.window {
                    self.state = StabilizerState::Stable {
                        command: command.clone(),
                    };
                    if self.last_dispatched.as_ref() != Some(&command) {
                        self.last_dispatched = Some(command.clone());
                        return Some(command);
                    }
                }
                None
            }
            StabilizerState::Stable { command: c } if *c == command => None,
            _ => {
                self.state = StabilizerState::Candidating {
                    command,
                    since: now,
                };
                None
            }
        }
    }

    /// Monitor path: requests an immediate no-detection dispatch. Suppressed
    /// while a candidate is being timed, and when the sentinel was already
    /// the last thing sent.
    pub fn inject_no_detection(&mut self) -> Option<Command> {
        if self.is_candidating() {
            return None;
        }
        if self.last_dispatched == Some(Command::NoDetection) {
            return None;
        }
        self.state = StabilizerState::Idle;
        self.last_dispatched = Some(Command::NoDetection);
        Some(Command::NoDetection)
    }

    pub fn is_candidating(&self) -> bool {
        matches!(self.state, StabilizerState::Candidating { .. })
    }

    pub fn last_dispatched(&self) -> Option<&Command> {
        self.last_dispatched.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);
    const TICK: Duration = Duration::from_millis(10);

    fn case(code: &'static str) -> Command {
        Command::Case(code)
    }

    #[test]
    fn a_command_held_for_the_window_dispatches_exactly_once() {
        let mut stabilizer = CommandStabilizer::new(WINDOW);
        let start = Instant::now();

        let mut dispatched = Vec::new();
        for i in 0..20 {
            if let Some(c) = stabilizer.observe(case("C01"), start + TICK * i) {
                dispatched.push(c);
            }
        }
        assert_eq!(dispatched, vec![case("C01")]);
    }

    #[test]
    fn one_tick_short_of_the_window_never_dispatches() {
        let mut stabilizer = CommandStabilizer::new(WINDOW);
        let start = Instant::now();

        // Observations at 0, 10, ..., 90ms: the last is still inside the
        // 100ms window measured from the first.
        for i in 0..10 {
            assert_eq!(stabilizer.observe(case("C01"), start + TICK * i), None);
        }
    }

    #[test]
    fn alternating_commands_never_dispatch() {
        let mut stabilizer = CommandStabilizer::new(WINDOW);
        let start = Instant::now();

        for i in 0..50 {
            let code = if i % 2 == 0 { "C01" } else { "C02" };
            assert_eq!(stabilizer.observe(case(code), start + TICK * i), None);
        }
    }

    #[test]
    fn candidate_switch_resets_the_clock() {
        let mut stabilizer = CommandStabilizer::new(WINDOW);
        let start = Instant::now();

        // 90ms of C01, then a switch: C02 must wait a full window of its own.
        for i in 0..10 {
            stabilizer.observe(case("C01"), start + TICK * i);
        }
        assert_eq!(stabilizer.observe(case("C02"), start + TICK * 10), None);
        assert_eq!(stabilizer.observe(case("C02"), start + TICK * 15), None);
        let dispatch = stabilizer.observe(case("C02"), start + TICK * 20);
        assert_eq!(dispatch, Some(case("C02")));
    }

    #[test]
    fn the_same_command_is_never_dispatched_twice_in_a_row() {
        let mut stabilizer = CommandStabilizer::new(WINDOW);
        let start = Instant::now();

        let mut dispatched = Vec::new();
        // C01 goes stable, the stream flickers to C02 briefly (never
        // stabilizing), then C01 stabilizes again: it must not re-dispatch.
        for i in 0..15 {
            if let Some(c) = stabilizer.observe(case("C01"), start + TICK * i) {
                dispatched.push(c);
            }
        }
        stabilizer.observe(case("C02"), start + TICK * 15);
        for i in 16..40 {
            if let Some(c) = stabilizer.observe(case("C01"), start + TICK * i) {
                dispatched.push(c);
            }
        }
        assert_eq!(dispatched, vec![case("C01")]);
    }

    #[test]
    fn injection_respects_last_dispatched_and_candidating() {
        let mut stabilizer = CommandStabilizer::new(WINDOW);
        let start = Instant::now();

        // While a candidate is being timed, injection is suppressed.
        stabilizer.observe(case("C01"), start);
        assert_eq!(stabilizer.inject_no_detection(), None);

        // Let C01 go stable, then injection fires once.
        for i in 1..15 {
            stabilizer.observe(case("C01"), start + TICK * i);
        }
        assert_eq!(stabilizer.inject_no_detection(), Some(Command::NoDetection));
        // A second injection is a consecutive repeat and is refused.
        assert_eq!(stabilizer.inject_no_detection(), None);
    }
}
