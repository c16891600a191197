//! Driver: transport UI state layered over a [`Player`].
//!
//! The driver owns the values shown by the controls (slider fraction, time label,
//! play/pause and loop toggles). Widget glue reads [`TransportControls`] and forwards
//! user input to the driver methods.
//!
//! While playback is or may be running, a polling interval is live; the host calls
//! [`Driver::refresh`] on every period. Pausing cancels it, and at most one interval
//! exists at any time.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::clock::PlayState;
use crate::config::DriverConfig;
use crate::error::PlayerError;
use crate::host::{IntervalHandle, IntervalScheduler};
use crate::player::{Player, TickReport};

/// Values displayed by the transport controls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportControls {
    /// Slider position in `[0, 1]`.
    pub slider: f64,
    /// Elapsed time label, see [`format_time_label`].
    pub label: String,
    /// Play/pause toggle; `true` shows "playing".
    pub play_toggle: bool,
    pub loop_toggle: bool,
}

/// Elapsed milliseconds as `"<seconds>[.<hundredths>] s"`.
///
/// Hundredths are truncated, zero padded to two digits, and omitted when zero.
pub fn format_time_label(ms: f64) -> String {
    let ms = if ms.is_finite() { ms.max(0.0) } else { 0.0 };
    let hundredths = ((ms % 1000.0).floor() / 10.0).floor() as u64;
    let seconds = (ms / 1000.0).floor() as u64;
    if hundredths == 0 {
        format!("{seconds} s")
    } else {
        format!("{seconds}.{hundredths:02} s")
    }
}

pub struct Driver {
    cfg: DriverConfig,
    player: Player,
    controls: TransportControls,
    should_play: bool,
    scheduler: Box<dyn IntervalScheduler>,
    interval: Option<IntervalHandle>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("cfg", &self.cfg)
            .field("player", &self.player)
            .field("controls", &self.controls)
            .field("should_play", &self.should_play)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Driver {
    /// Wrap `player` and start the polling loop.
    pub fn new(
        cfg: DriverConfig,
        player: Player,
        scheduler: Box<dyn IntervalScheduler>,
    ) -> Result<Self, PlayerError> {
        cfg.validate()?;
        let controls = TransportControls {
            slider: 0.0,
            label: format_time_label(player.current_time()),
            play_toggle: player.is_playing(),
            loop_toggle: player.loop_playback(),
        };
        let mut driver = Self {
            cfg,
            player,
            controls,
            should_play: false,
            scheduler,
            interval: None,
        };
        driver.start_polling();
        Ok(driver)
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn controls(&self) -> &TransportControls {
        &self.controls
    }

    pub fn should_play(&self) -> bool {
        self.should_play
    }

    pub fn is_polling(&self) -> bool {
        self.interval.is_some()
    }

    fn start_polling(&mut self) {
        if self.interval.is_none() {
            let handle = self.scheduler.start(self.cfg.poll_interval_ms);
            debug!("polling started ({handle:?})");
            self.interval = Some(handle);
        }
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.interval.take() {
            self.scheduler.cancel(handle);
            debug!("polling cancelled ({handle:?})");
        }
    }

    // ------------------------------------------------------------------
    // Player passthrough
    // ------------------------------------------------------------------

    /// Timeline duration; zero without a timeline.
    pub fn timeline_duration_ms(&self) -> f64 {
        self.player.timeline_duration_ms().unwrap_or(0.0)
    }

    /// Timing clock duration.
    pub fn duration_ms(&self) -> f64 {
        self.player.duration_ms()
    }

    pub fn current_time(&self) -> f64 {
        self.player.current_time()
    }

    /// Seek the player and move the slider with it.
    pub fn set_current_time(&mut self, ms: f64) -> Result<(), PlayerError> {
        let duration = self.duration_ms();
        if duration > 0.0 {
            self.controls.slider = ms / duration;
        }
        self.player.set_current_time(ms)
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.start_polling();
        self.player.play()
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        self.stop_polling();
        self.player.pause()
    }

    // ------------------------------------------------------------------
    // Control actions
    // ------------------------------------------------------------------

    /// Interval callback: copy elapsed time into the slider and label unless paused.
    pub fn refresh(&mut self) {
        let span = self.timeline_duration_ms();
        match self.player.clock_state() {
            None | Some(PlayState::Paused) => {}
            Some(_) if span > 0.0 => {
                let now = self.current_time();
                self.controls.slider = now / span;
                self.controls.label = format_time_label(now);
            }
            Some(_) => {}
        }
    }

    /// Play/pause button changed to `on`.
    pub fn toggle_playback(&mut self, on: bool) -> Result<(), PlayerError> {
        self.controls.play_toggle = on;
        if on {
            self.should_play = true;
            let at_end = self.player.clock_state() == Some(PlayState::Finished)
                || self.current_time() >= self.timeline_duration_ms();
            if at_end {
                self.set_current_time(0.0)?;
            }
            self.play()
        } else {
            self.should_play = false;
            self.pause()
        }
    }

    /// Slider dragged to `fraction`: pause and seek, never onto the terminal frame.
    pub fn slider_input(&mut self, fraction: f64) -> Result<(), PlayerError> {
        let _ = self.pause();
        let duration = self.duration_ms();
        let target = fraction.clamp(0.0, 1.0) * duration;
        self.controls.label = format_time_label(target);
        let target = target.min(duration - self.cfg.scrub_margin_ms).max(0.0);
        self.set_current_time(target)
    }

    /// Slider released: resume if the user had playback on.
    pub fn slider_change(&mut self) -> Result<(), PlayerError> {
        if self.should_play {
            self.play()
        } else {
            Ok(())
        }
    }

    /// Loop button changed to `on`.
    pub fn set_loop(&mut self, on: bool) {
        self.controls.loop_toggle = on;
        self.player.set_loop(on);
    }

    /// End playback and park the controls at the terminal position.
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        let paused = if self.player.is_playing() {
            self.player.pause()
        } else {
            Ok(())
        };
        self.park_at_end();
        paused
    }

    /// Toggle off, polling off, slider and label at the terminal position.
    fn park_at_end(&mut self) {
        self.controls.play_toggle = false;
        self.should_play = false;
        self.stop_polling();

        let d = self.duration_ms();
        let span = self.timeline_duration_ms();
        self.controls.label = format_time_label(d);
        if span > 0.0 {
            self.controls.slider = d / span - self.cfg.end_epsilon;
        }
    }

    /// Advance host time. A finish without looping stops the driver.
    pub fn advance(&mut self, dt_ms: f64) -> TickReport {
        let report = self.player.tick(dt_ms);
        // The player has already paused and reported the stop.
        if report.finished && !report.looped {
            self.park_at_end();
        }
        if report.auto_played {
            self.controls.play_toggle = true;
            self.should_play = true;
            self.start_polling();
        }
        report
    }

    /// Feed the visible fraction of the timer element to the player's auto-play.
    pub fn observe_visibility(&mut self, ratio: f64) -> bool {
        let started = self.player.observe_visibility(ratio);
        if started {
            self.controls.play_toggle = true;
            self.should_play = true;
            self.start_polling();
        }
        started
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
