//! Timing clock abstraction.
//!
//! The timing clock is a dummy animation run on a hidden timer element purely to get
//! an elapsed-time and finish-event source. In a browser it is a Web Animations handle;
//! [`VirtualClock`] is a deterministic stand-in advanced by the host loop.

use serde::{Deserialize, Serialize};

use crate::error::PlayerError;

/// Play state of a timing clock, mirroring the Web Animations `playState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

impl PlayState {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

impl From<&str> for PlayState {
    fn from(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "finished" => Self::Finished,
            _ => Self::Idle,
        }
    }
}

/// Master clock of a player. Times are milliseconds.
pub trait TimingClock {
    fn play(&mut self);
    fn pause(&mut self);
    fn play_state(&self) -> PlayState;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, ms: f64);
    fn duration(&self) -> f64;
    fn set_duration(&mut self, ms: f64);
    /// Account for `dt_ms` of host time. Returns `true` exactly once per finish event.
    ///
    /// Host-scheduled clocks ignore `dt_ms` and only report their latched finish.
    fn advance(&mut self, dt_ms: f64) -> bool;
}

/// The element a player's timing clock runs on. Reused across timeline swaps.
pub trait TimerElement {
    /// Create a new timing clock lasting `duration_ms`.
    fn animate(&mut self, duration_ms: f64) -> Result<Box<dyn TimingClock>, PlayerError>;
}

/// Deterministic clock following Web Animations semantics for a forward,
/// single-iteration animation with `fill: forwards`.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualClock {
    duration: f64,
    time: f64,
    state: PlayState,
    finish_pending: bool,
}

impl VirtualClock {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration: duration_ms.max(0.0),
            time: 0.0,
            state: PlayState::Idle,
            finish_pending: false,
        }
    }

    fn at_end(&self) -> bool {
        self.time >= self.duration
    }

    fn finish(&mut self) {
        self.time = self.duration;
        self.state = PlayState::Finished;
        self.finish_pending = true;
    }
}

impl TimingClock for VirtualClock {
    fn play(&mut self) {
        // Playing from the end restarts from zero.
        if self.state == PlayState::Finished || self.at_end() {
            self.time = 0.0;
        }
        self.state = PlayState::Running;
    }

    fn pause(&mut self) {
        self.state = PlayState::Paused;
    }

    fn play_state(&self) -> PlayState {
        self.state
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, ms: f64) {
        self.time = if ms.is_finite() { ms.max(0.0) } else { 0.0 };
        match self.state {
            PlayState::Idle => self.state = PlayState::Paused,
            PlayState::Finished if !self.at_end() => self.state = PlayState::Running,
            _ => {}
        }
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn set_duration(&mut self, ms: f64) {
        self.duration = ms.max(0.0);
        if self.state == PlayState::Finished && !self.at_end() {
            self.state = PlayState::Running;
        }
    }

    fn advance(&mut self, dt_ms: f64) -> bool {
        if self.state == PlayState::Running {
            self.time += dt_ms.max(0.0);
            if self.at_end() {
                self.finish();
            }
        }
        std::mem::take(&mut self.finish_pending)
    }
}

/// Timer element producing [`VirtualClock`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualTimer;

impl TimerElement for VirtualTimer {
    fn animate(&mut self, duration_ms: f64) -> Result<Box<dyn TimingClock>, PlayerError> {
        Ok(Box::new(VirtualClock::new(duration_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_to_finish_once() {
        let mut c = VirtualClock::new(100.0);
        assert_eq!(c.play_state(), PlayState::Idle);
        c.play();
        assert!(!c.advance(60.0));
        assert!(c.advance(60.0));
        assert_eq!(c.play_state(), PlayState::Finished);
        assert_eq!(c.current_time(), 100.0);
        // Latch is consumed.
        assert!(!c.advance(10.0));
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut c = VirtualClock::new(100.0);
        c.play();
        c.advance(30.0);
        c.pause();
        c.advance(30.0);
        assert_eq!(c.current_time(), 30.0);
        assert_eq!(c.play_state(), PlayState::Paused);
    }

    #[test]
    fn play_from_end_restarts() {
        let mut c = VirtualClock::new(50.0);
        c.play();
        c.advance(50.0);
        c.pause();
        c.play();
        assert_eq!(c.current_time(), 0.0);
        assert_eq!(c.play_state(), PlayState::Running);
    }

    #[test]
    fn seeking_idle_pauses_and_seeking_finished_resumes() {
        let mut c = VirtualClock::new(50.0);
        c.set_current_time(10.0);
        assert_eq!(c.play_state(), PlayState::Paused);

        c.play();
        c.advance(100.0);
        c.set_current_time(0.0);
        assert_eq!(c.play_state(), PlayState::Running);
    }

    #[test]
    fn state_names_round_trip() {
        for s in [
            PlayState::Idle,
            PlayState::Running,
            PlayState::Paused,
            PlayState::Finished,
        ] {
            assert_eq!(PlayState::from(s.name()), s);
        }
    }
}
