//! Player and driver configuration.

use serde::{Deserialize, Serialize};

use crate::error::PlayerError;

/// Construction parameters for a [`Player`](crate::Player).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Replay from zero when the timing clock finishes.
    pub loop_playback: bool,
    /// Startup offset (ms) added to the timeline duration for the timing clock.
    pub delay_ms: f64,
    /// Rate applied to the timing clock duration and to every shape animation.
    pub playback_rate: f64,
    /// One-shot auto-play once the timer element becomes visible. `None` disables it.
    pub auto_play: Option<AutoPlayConfig>,
    /// Staggered reveal handed to the host on play and after a finish.
    pub reveal: Option<RevealConfig>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            loop_playback: false,
            delay_ms: 0.0,
            playback_rate: 1.0,
            auto_play: Some(AutoPlayConfig::default()),
            reveal: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPlayConfig {
    /// Visible fraction of the timer element that triggers playback.
    pub threshold: f64,
    /// Extra wait (ms) between the trigger and `play()`.
    pub extra_delay_ms: f64,
}

impl AutoPlayConfig {
    pub const MIN_THRESHOLD: f64 = 0.9;
}

impl Default for AutoPlayConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            extra_delay_ms: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Delay (ms) between consecutive elements fading in.
    pub step_ms: f64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self { step_ms: 250.0 }
    }
}

/// Parameters of the transport [`Driver`](crate::Driver).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Cadence of the UI polling loop.
    pub poll_interval_ms: f64,
    /// Keeps the slider thumb visibly short of 100% after `stop()`.
    pub end_epsilon: f64,
    /// Scrubbing never lands closer than this to the terminal frame.
    pub scrub_margin_ms: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100.0 / 3.0,
            end_epsilon: 0.001,
            scrub_margin_ms: 1.0,
        }
    }
}

fn invalid(reason: impl Into<String>) -> PlayerError {
    PlayerError::InvalidConfig {
        reason: reason.into(),
    }
}

fn non_negative(name: &str, v: f64) -> Result<(), PlayerError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and >= 0, got {v}")))
    }
}

impl PlayerConfig {
    /// Parse a JSON object; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, PlayerError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PlayerError> {
        non_negative("delay_ms", self.delay_ms)?;
        if !(self.playback_rate.is_finite() && self.playback_rate > 0.0) {
            return Err(PlayerError::InvalidRate {
                rate: self.playback_rate,
            });
        }
        if let Some(ap) = &self.auto_play {
            if !(AutoPlayConfig::MIN_THRESHOLD..=1.0).contains(&ap.threshold) {
                return Err(invalid(format!(
                    "auto_play.threshold must be within [{}, 1], got {}",
                    AutoPlayConfig::MIN_THRESHOLD,
                    ap.threshold
                )));
            }
            non_negative("auto_play.extra_delay_ms", ap.extra_delay_ms)?;
        }
        if let Some(rv) = &self.reveal {
            non_negative("reveal.step_ms", rv.step_ms)?;
        }
        Ok(())
    }
}

impl DriverConfig {
    pub fn from_json_str(s: &str) -> Result<Self, PlayerError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PlayerError> {
        if !(self.poll_interval_ms.is_finite() && self.poll_interval_ms > 0.0) {
            return Err(invalid(format!(
                "poll_interval_ms must be > 0, got {}",
                self.poll_interval_ms
            )));
        }
        non_negative("end_epsilon", self.end_epsilon)?;
        non_negative("scrub_margin_ms", self.scrub_margin_ms)
    }
}
