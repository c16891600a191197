//! Player: drives a timeline's shape animations in lockstep with one timing clock.
//!
//! State machine: `NoTimeline → Idle → Running ⇄ Paused → Finished → (Idle, or Running
//! again when looping)`.
//!
//! The timeline and everything derived from it live in a `Session`. The timing clock
//! and the shape animation list form a `Rig` that is built in one step and dropped in
//! one step, so a half-initialised player is not representable beyond "rig missing",
//! which `play()` repairs.

use std::fmt;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::clock::{PlayState, TimerElement, TimingClock};
use crate::config::{AutoPlayConfig, PlayerConfig};
use crate::error::PlayerError;
use crate::host::{ElementResolver, PlaybackEvent, PlaybackHost};
use crate::reveal::RevealPlan;
use crate::timeline::{ShapeAnimation, Timeline};
use crate::visibility::{TriggerAction, VisibilityTrigger};

/// Invoked with no arguments once per finish event.
pub type FinishCallback = Box<dyn FnMut()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    NoTimeline,
    Idle,
    Running,
    Paused,
    Finished,
}

/// What happened during one [`Player::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The timing clock reported a finish event.
    pub finished: bool,
    /// The finish was handled by replaying from zero.
    pub looped: bool,
    /// A pending visibility trigger started playback.
    pub auto_played: bool,
}

/// Timing clock duration for a timeline: `(timeline + delay) / rate`.
#[inline]
pub fn clock_duration_ms(timeline_ms: f64, delay_ms: f64, playback_rate: f64) -> f64 {
    (timeline_ms + delay_ms) / playback_rate
}

/// Euclidean remainder; zero span maps everything to zero.
fn wrap(t: f64, span: f64) -> f64 {
    if span <= 0.0 || !t.is_finite() {
        return 0.0;
    }
    t.rem_euclid(span)
}

struct Rig {
    clock: Box<dyn TimingClock>,
    animations: Vec<Box<dyn ShapeAnimation>>,
}

struct Session {
    timeline: Box<dyn Timeline>,
    rig: Option<Rig>,
}

pub struct Player {
    cfg: PlayerConfig,
    timer: Box<dyn TimerElement>,
    session: Option<Session>,
    should_play: bool,
    callback: Option<FinishCallback>,
    host: Option<Box<dyn PlaybackHost>>,
    auto_play: VisibilityTrigger,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("cfg", &self.cfg)
            .field("state", &self.state())
            .field("current_time", &self.current_time())
            .field("should_play", &self.should_play)
            .field("animations", &self.animation_count())
            .field("auto_play", &self.auto_play)
            .finish()
    }
}

impl Player {
    /// Create a player on `timer`. The timeline is installed separately with
    /// [`Player::set_timeline`].
    pub fn new(cfg: PlayerConfig, timer: Box<dyn TimerElement>) -> Result<Self, PlayerError> {
        cfg.validate().inspect_err(|e| warn!("player config rejected: {e}"))?;
        let auto_play = match &cfg.auto_play {
            Some(ap) => VisibilityTrigger::armed(ap),
            None => VisibilityTrigger::inert(),
        };
        Ok(Self {
            cfg,
            timer,
            session: None,
            should_play: false,
            callback: None,
            host: None,
            auto_play,
        })
    }

    /// Create a player on the timer element registered under `timer_id`.
    pub fn from_timer_id(
        cfg: PlayerConfig,
        timer_id: &str,
        resolver: &mut dyn ElementResolver,
    ) -> Result<Self, PlayerError> {
        let timer = resolver.resolve_timer(timer_id).ok_or_else(|| {
            let err = PlayerError::missing(format!("timer element '{timer_id}'"));
            error!("{err}");
            err
        })?;
        Self::new(cfg, timer)
    }

    pub fn with_callback(mut self, callback: impl FnMut() + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn with_host(mut self, host: Box<dyn PlaybackHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn set_callback(&mut self, callback: Option<FinishCallback>) {
        self.callback = callback;
    }

    pub fn set_host(&mut self, host: Option<Box<dyn PlaybackHost>>) {
        self.host = host;
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.cfg
    }

    // ------------------------------------------------------------------
    // Timeline
    // ------------------------------------------------------------------

    pub fn timeline(&self) -> Option<&dyn Timeline> {
        self.session.as_ref().map(|s| s.timeline.as_ref())
    }

    pub fn timeline_duration_ms(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.timeline.duration_ms())
    }

    /// Replace the timeline.
    ///
    /// Prior shape animations are cancelled with their targets detached, and playback
    /// is paused. With a new timeline the rig is rebuilt paused at zero. An `Err`
    /// means the timeline is installed but the rig could not be built; `play()`
    /// retries the build.
    pub fn set_timeline(&mut self, timeline: Option<Box<dyn Timeline>>) -> Result<(), PlayerError> {
        if let Some(rig) = self.session.as_mut().and_then(|s| s.rig.as_mut()) {
            for mut anim in rig.animations.drain(..) {
                anim.detach_target();
                anim.cancel();
            }
        }
        let _ = self.pause();

        match timeline {
            None => {
                self.session = None;
                self.should_play = false;
                debug!("timeline cleared");
                Ok(())
            }
            Some(timeline) => {
                debug!("timeline installed ({} ms)", timeline.duration_ms());
                self.session = Some(Session {
                    timeline,
                    rig: None,
                });
                let built = self.build_rig();
                self.should_play = true;
                let _ = self.pause();
                built
            }
        }
    }

    fn build_rig(&mut self) -> Result<(), PlayerError> {
        let Self {
            cfg, timer, session, ..
        } = self;
        let session = session
            .as_mut()
            .ok_or_else(|| PlayerError::uninitialized("timeline"))?;

        let duration = clock_duration_ms(
            session.timeline.duration_ms(),
            cfg.delay_ms,
            cfg.playback_rate,
        );
        let mut clock = timer
            .animate(duration)
            .inspect_err(|e| warn!("timing clock not created: {e}"))?;
        clock.pause();
        clock.set_current_time(0.0);

        session.timeline.load_fill_images();
        session.timeline.load_svg_animations();
        let mut animations = session.timeline.create_all_animations();
        for anim in animations.iter_mut() {
            anim.set_playback_rate(cfg.playback_rate);
        }
        debug!(
            "rig built: clock {duration} ms, {} shape animations",
            animations.len()
        );
        session.rig = Some(Rig { clock, animations });
        Ok(())
    }

    fn rig_mut(&mut self, op: &str) -> Result<Option<&mut Rig>, PlayerError> {
        match self.session.as_mut() {
            None => Ok(None),
            Some(session) => match session.rig.as_mut() {
                Some(rig) => Ok(Some(rig)),
                None => {
                    let err = PlayerError::uninitialized("timing clock");
                    error!("{op}: [{}] {err}", err.category());
                    Err(err)
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start or resume playback. No-op without a timeline or while running.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        if self.session.is_none() || self.is_playing() {
            return Ok(());
        }
        if self.session.as_ref().is_some_and(|s| s.rig.is_none()) {
            self.build_rig()?;
        }
        self.resume()
    }

    fn resume(&mut self) -> Result<(), PlayerError> {
        let rate = self.cfg.playback_rate;
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let Session { timeline, rig } = session;
        let Some(rig) = rig.as_mut() else {
            let err = PlayerError::uninitialized("timing clock");
            error!("play: [{}] {err}", err.category());
            return Err(err);
        };

        rig.clock.play();
        for anim in rig.animations.iter_mut() {
            anim.set_playback_rate(rate);
            anim.play();
        }
        let span_s = timeline.duration_ms() / 1000.0;
        for (i, shape) in timeline.shapes_mut().iter_mut().enumerate() {
            let t = wrap(shape.current_time(), span_s);
            shape.set_current_time(t);
            if let Err(e) = shape.unpause_animations() {
                debug!("shape {i}: unpause skipped: {e}");
            }
        }
        debug!("playing from {} ms", rig.clock.current_time());

        self.notify(PlaybackEvent::Started);
        self.reveal();
        Ok(())
    }

    /// Pause the clock, every shape animation and every shape. No-op without a timeline.
    pub fn pause(&mut self) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let Session { timeline, rig } = session;
        let Some(rig) = rig.as_mut() else {
            let err = PlayerError::uninitialized("timing clock");
            warn!("pause: [{}] {err}", err.category());
            return Err(err);
        };

        rig.clock.pause();
        for anim in rig.animations.iter_mut() {
            anim.pause();
        }
        for (i, shape) in timeline.shapes_mut().iter_mut().enumerate() {
            if let Err(e) = shape.pause_animations() {
                debug!("shape {i}: pause skipped: {e}");
            }
        }
        self.notify(PlaybackEvent::Paused);
        Ok(())
    }

    /// Pause and rewind to zero; auto-play will no longer start this player.
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        self.should_play = false;
        self.pause()?;
        self.set_current_time(0.0)?;
        self.notify(PlaybackEvent::Stopped);
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.clock()
            .is_some_and(|c| c.play_state() == PlayState::Running)
    }

    pub fn state(&self) -> PlayerState {
        match &self.session {
            None => PlayerState::NoTimeline,
            Some(Session { rig: None, .. }) => PlayerState::Idle,
            Some(Session { rig: Some(rig), .. }) => match rig.clock.play_state() {
                PlayState::Idle => PlayerState::Idle,
                PlayState::Running => PlayerState::Running,
                PlayState::Paused => PlayerState::Paused,
                PlayState::Finished => PlayerState::Finished,
            },
        }
    }

    /// Whether the player is allowed to start on its own (cleared by `stop()`).
    pub fn should_play(&self) -> bool {
        self.should_play
    }

    // ------------------------------------------------------------------
    // Time and rate
    // ------------------------------------------------------------------

    fn clock(&self) -> Option<&dyn TimingClock> {
        self.session
            .as_ref()
            .and_then(|s| s.rig.as_ref())
            .map(|r| r.clock.as_ref())
    }

    pub fn clock_state(&self) -> Option<PlayState> {
        self.clock().map(|c| c.play_state())
    }

    /// Duration of the timing clock (timeline plus delay, scaled by the rate).
    pub fn duration_ms(&self) -> f64 {
        self.clock().map_or(0.0, |c| c.duration())
    }

    /// Elapsed time of the timing clock; zero without one.
    pub fn current_time(&self) -> f64 {
        self.clock().map_or(0.0, |c| c.current_time())
    }

    /// Seek: every shape animation gets `ms`, every shape gets `ms / 1000` seconds,
    /// then the clock gets `ms`.
    pub fn set_current_time(&mut self, ms: f64) -> Result<(), PlayerError> {
        if self.rig_mut("seek")?.is_none() {
            return Ok(());
        }
        let Some(Session {
            timeline,
            rig: Some(rig),
        }) = self.session.as_mut()
        else {
            return Ok(());
        };
        for anim in rig.animations.iter_mut() {
            anim.set_current_time(ms);
        }
        for shape in timeline.shapes_mut().iter_mut() {
            shape.set_current_time(ms / 1000.0);
        }
        rig.clock.set_current_time(ms);
        Ok(())
    }

    pub fn playback_rate(&self) -> f64 {
        self.cfg.playback_rate
    }

    /// Store the rate, re-apply the clock duration and propagate to every animation.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<(), PlayerError> {
        if !(rate.is_finite() && rate > 0.0) {
            let err = PlayerError::InvalidRate { rate };
            warn!("{err}");
            return Err(err);
        }
        self.cfg.playback_rate = rate;
        let delay = self.cfg.delay_ms;
        if let Some(Session {
            timeline,
            rig: Some(rig),
        }) = self.session.as_mut()
        {
            rig.clock
                .set_duration(clock_duration_ms(timeline.duration_ms(), delay, rate));
            for anim in rig.animations.iter_mut() {
                anim.set_playback_rate(rate);
            }
        }
        Ok(())
    }

    pub fn loop_playback(&self) -> bool {
        self.cfg.loop_playback
    }

    pub fn set_loop(&mut self, on: bool) {
        self.cfg.loop_playback = on;
    }

    pub fn delay_ms(&self) -> f64 {
        self.cfg.delay_ms
    }

    pub fn animation_count(&self) -> usize {
        self.session
            .as_ref()
            .and_then(|s| s.rig.as_ref())
            .map_or(0, |r| r.animations.len())
    }

    // ------------------------------------------------------------------
    // Host loop
    // ------------------------------------------------------------------

    /// Advance host time: runs finish handling and any pending auto-play.
    pub fn tick(&mut self, dt_ms: f64) -> TickReport {
        let mut report = TickReport::default();

        let finished = self
            .session
            .as_mut()
            .and_then(|s| s.rig.as_mut())
            .is_some_and(|rig| rig.clock.advance(dt_ms));
        if finished {
            report.finished = true;
            report.looped = self.handle_finish();
        }

        if self.auto_play.advance(dt_ms) {
            report.auto_played = self.fire_auto_play();
        }
        report
    }

    fn handle_finish(&mut self) -> bool {
        let looped = self.cfg.loop_playback;
        if looped {
            debug!("finished; looping");
            let rewound = self.set_current_time(0.0);
            if let Err(e) = rewound.and_then(|_| self.resume()) {
                warn!("loop restart failed: {e}");
            }
        } else {
            debug!("finished");
            let _ = self.pause();
            self.notify(PlaybackEvent::Stopped);
        }
        if let Some(callback) = self.callback.as_mut() {
            callback();
        }
        self.reveal();
        looped
    }

    /// Arm the one-shot visibility auto-play. Returns `false` once it has fired.
    pub fn arm_auto_play(&mut self, cfg: AutoPlayConfig) -> bool {
        self.auto_play.arm(&cfg)
    }

    pub fn auto_play(&self) -> &VisibilityTrigger {
        &self.auto_play
    }

    /// Feed the visible fraction of the timer element. Returns `true` if this call
    /// started playback.
    pub fn observe_visibility(&mut self, ratio: f64) -> bool {
        match self.auto_play.observe(ratio) {
            TriggerAction::PlayNow => self.fire_auto_play(),
            TriggerAction::Scheduled => {
                debug!("auto-play scheduled");
                false
            }
            TriggerAction::Ignored => false,
        }
    }

    fn fire_auto_play(&mut self) -> bool {
        if !self.should_play {
            debug!("auto-play suppressed");
            return false;
        }
        self.play().is_ok() && self.is_playing()
    }

    // ------------------------------------------------------------------
    // Host notifications
    // ------------------------------------------------------------------

    fn notify(&mut self, event: PlaybackEvent) {
        // No host registered: nothing to notify.
        let Some(host) = self.host.as_mut() else {
            return;
        };
        if let Err(e) = host.notify(event) {
            warn!("{} not delivered: [{}] {e}", event.name(), e.category());
        }
    }

    fn reveal(&mut self) {
        if let (Some(rv), Some(host)) = (self.cfg.reveal, self.host.as_mut()) {
            host.reveal(&RevealPlan::new(rv.step_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualTimer;
    use crate::timeline::Shape;

    struct Bare {
        duration: f64,
        shapes: Vec<Box<dyn Shape>>,
    }

    impl Timeline for Bare {
        fn duration_ms(&self) -> f64 {
            self.duration
        }
        fn shapes_mut(&mut self) -> &mut [Box<dyn Shape>] {
            &mut self.shapes
        }
        fn create_all_animations(&mut self) -> Vec<Box<dyn ShapeAnimation>> {
            Vec::new()
        }
    }

    fn bare(duration: f64) -> Box<dyn Timeline> {
        Box::new(Bare {
            duration,
            shapes: Vec::new(),
        })
    }

    #[test]
    fn wrap_is_euclidean() {
        assert_eq!(wrap(12.5, 10.0), 2.5);
        assert_eq!(wrap(-1.0, 10.0), 9.0);
        assert_eq!(wrap(3.0, 0.0), 0.0);
        assert_eq!(wrap(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn clock_duration_formula() {
        assert_eq!(clock_duration_ms(10_000.0, 0.0, 1.0), 10_000.0);
        assert_eq!(clock_duration_ms(10_000.0, 2_500.0, 1.25), 10_000.0);
    }

    #[test]
    fn no_timeline_is_inert() {
        let mut p = Player::new(PlayerConfig::default(), Box::new(VirtualTimer)).unwrap();
        assert_eq!(p.state(), PlayerState::NoTimeline);
        p.play().unwrap();
        p.pause().unwrap();
        p.set_current_time(100.0).unwrap();
        assert!(!p.is_playing());
        assert_eq!(p.current_time(), 0.0);
    }

    #[test]
    fn install_leaves_player_paused_at_zero() {
        let mut p = Player::new(PlayerConfig::default(), Box::new(VirtualTimer)).unwrap();
        p.set_timeline(Some(bare(1000.0))).unwrap();
        assert_eq!(p.state(), PlayerState::Paused);
        assert!(p.should_play());
        assert_eq!(p.current_time(), 0.0);
        assert_eq!(p.duration_ms(), 1000.0);
    }

    #[test]
    fn clearing_timeline_resets() {
        let mut p = Player::new(PlayerConfig::default(), Box::new(VirtualTimer)).unwrap();
        p.set_timeline(Some(bare(1000.0))).unwrap();
        p.play().unwrap();
        p.tick(400.0);
        p.set_timeline(None).unwrap();
        assert_eq!(p.state(), PlayerState::NoTimeline);
        assert_eq!(p.current_time(), 0.0);
        assert!(!p.should_play());
    }

    #[test]
    fn rejects_invalid_rate() {
        let mut p = Player::new(PlayerConfig::default(), Box::new(VirtualTimer)).unwrap();
        assert!(matches!(
            p.set_playback_rate(0.0),
            Err(PlayerError::InvalidRate { .. })
        ));
        assert_eq!(p.playback_rate(), 1.0);
    }
}
