//! Shared fixtures and recording doubles for flow-player tests.
//!
//! Every double writes its observable state into an `Rc<RefCell<_>>` that the test
//! keeps a handle to, since the player takes ownership of the double itself.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use flow_player_core::{
    ElementResolver, IntervalHandle, IntervalScheduler, PlaybackEvent, PlaybackHost,
    PlayerError, RevealPlan, Shape, ShapeAnimation, TimerElement, Timeline, TimingClock,
    VirtualClock, VirtualTimer,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    timelines: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = fixtures_root().join(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

// ----------------------------------------------------------------------
// Timeline description
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TrackSpec {
    pub element: String,
    pub property: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineSpec {
    pub name: String,
    pub duration_ms: f64,
    pub shapes: Vec<String>,
    pub tracks: Vec<TrackSpec>,
}

impl TimelineSpec {
    /// Anonymous timeline with `shapes` shapes and `tracks` animations.
    pub fn synthetic(duration_ms: f64, shapes: usize, tracks: usize) -> Self {
        Self {
            name: "synthetic".into(),
            duration_ms,
            shapes: (0..shapes).map(|i| format!("shape_{i}-svg")).collect(),
            tracks: (0..tracks)
                .map(|i| TrackSpec {
                    element: format!("shape_{i}"),
                    property: "left".into(),
                })
                .collect(),
        }
    }
}

pub mod timelines {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.timelines.keys().cloned().collect()
    }

    pub fn spec(name: &str) -> Result<TimelineSpec> {
        let rel = MANIFEST
            .timelines
            .get(name)
            .ok_or_else(|| anyhow!("unknown timeline fixture '{name}'"))?;
        load_json(rel)
    }

    /// Build a recording timeline from a named fixture.
    pub fn load(name: &str) -> Result<(FakeTimeline, TimelineView)> {
        Ok(FakeTimeline::from_spec(spec(name)?))
    }
}

// ----------------------------------------------------------------------
// Shape animations
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimState {
    pub name: String,
    pub playing: bool,
    pub cancelled: bool,
    pub detached: bool,
    pub current_time: f64,
    pub rate: f64,
    pub play_calls: usize,
    pub pause_calls: usize,
}

pub struct FakeAnimation(Rc<RefCell<AnimState>>);

impl ShapeAnimation for FakeAnimation {
    fn play(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = true;
        s.play_calls += 1;
    }
    fn pause(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = false;
        s.pause_calls += 1;
    }
    fn cancel(&mut self) {
        let mut s = self.0.borrow_mut();
        s.playing = false;
        s.cancelled = true;
    }
    fn detach_target(&mut self) {
        self.0.borrow_mut().detached = true;
    }
    fn current_time(&self) -> f64 {
        self.0.borrow().current_time
    }
    fn set_current_time(&mut self, ms: f64) {
        self.0.borrow_mut().current_time = ms;
    }
    fn set_playback_rate(&mut self, rate: f64) {
        self.0.borrow_mut().rate = rate;
    }
}

// ----------------------------------------------------------------------
// Shapes
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeState {
    pub name: String,
    pub time_s: f64,
    pub paused: bool,
    pub pause_calls: usize,
    pub unpause_calls: usize,
    /// Simulates a shape whose animation API throws.
    pub broken: bool,
}

pub struct FakeShape(Rc<RefCell<ShapeState>>);

impl Shape for FakeShape {
    fn current_time(&self) -> f64 {
        self.0.borrow().time_s
    }
    fn set_current_time(&mut self, seconds: f64) {
        self.0.borrow_mut().time_s = seconds;
    }
    fn pause_animations(&mut self) -> Result<(), PlayerError> {
        let mut s = self.0.borrow_mut();
        if s.broken {
            return Err(PlayerError::host(format!("{}: pauseAnimations threw", s.name)));
        }
        s.paused = true;
        s.pause_calls += 1;
        Ok(())
    }
    fn unpause_animations(&mut self) -> Result<(), PlayerError> {
        let mut s = self.0.borrow_mut();
        if s.broken {
            return Err(PlayerError::host(format!("{}: unpauseAnimations threw", s.name)));
        }
        s.paused = false;
        s.unpause_calls += 1;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Timeline
// ----------------------------------------------------------------------

#[derive(Debug, Default)]
struct ViewState {
    batches: Vec<Vec<Rc<RefCell<AnimState>>>>,
    shapes: Vec<Rc<RefCell<ShapeState>>>,
    fill_image_loads: usize,
    svg_loads: usize,
}

/// Read side of a [`FakeTimeline`].
#[derive(Debug, Clone, Default)]
pub struct TimelineView(Rc<RefCell<ViewState>>);

impl TimelineView {
    /// Number of `create_all_animations` calls so far.
    pub fn batches(&self) -> usize {
        self.0.borrow().batches.len()
    }

    pub fn batch(&self, i: usize) -> Vec<AnimState> {
        self.0.borrow().batches[i]
            .iter()
            .map(|a| a.borrow().clone())
            .collect()
    }

    /// Animations of the most recent batch.
    pub fn animations(&self) -> Vec<AnimState> {
        let n = self.batches();
        if n == 0 {
            Vec::new()
        } else {
            self.batch(n - 1)
        }
    }

    pub fn shapes(&self) -> Vec<ShapeState> {
        self.0
            .borrow()
            .shapes
            .iter()
            .map(|s| s.borrow().clone())
            .collect()
    }

    pub fn set_shape_time(&self, i: usize, seconds: f64) {
        self.0.borrow().shapes[i].borrow_mut().time_s = seconds;
    }

    pub fn break_shape(&self, i: usize) {
        self.0.borrow().shapes[i].borrow_mut().broken = true;
    }

    pub fn fill_image_loads(&self) -> usize {
        self.0.borrow().fill_image_loads
    }

    pub fn svg_loads(&self) -> usize {
        self.0.borrow().svg_loads
    }
}

pub struct FakeTimeline {
    spec: TimelineSpec,
    shapes: Vec<Box<dyn Shape>>,
    view: TimelineView,
}

impl FakeTimeline {
    pub fn from_spec(spec: TimelineSpec) -> (Self, TimelineView) {
        let view = TimelineView::default();
        let mut shapes: Vec<Box<dyn Shape>> = Vec::with_capacity(spec.shapes.len());
        for name in &spec.shapes {
            let state = Rc::new(RefCell::new(ShapeState {
                name: name.clone(),
                ..Default::default()
            }));
            view.0.borrow_mut().shapes.push(state.clone());
            shapes.push(Box::new(FakeShape(state)));
        }
        (
            Self {
                spec,
                shapes,
                view: view.clone(),
            },
            view,
        )
    }

    pub fn synthetic(duration_ms: f64, shapes: usize, tracks: usize) -> (Self, TimelineView) {
        Self::from_spec(TimelineSpec::synthetic(duration_ms, shapes, tracks))
    }

    pub fn boxed(self) -> Box<dyn Timeline> {
        Box::new(self)
    }
}

impl Timeline for FakeTimeline {
    fn duration_ms(&self) -> f64 {
        self.spec.duration_ms
    }

    fn shapes_mut(&mut self) -> &mut [Box<dyn Shape>] {
        &mut self.shapes
    }

    fn load_fill_images(&mut self) {
        self.view.0.borrow_mut().fill_image_loads += 1;
    }

    fn load_svg_animations(&mut self) {
        self.view.0.borrow_mut().svg_loads += 1;
    }

    fn create_all_animations(&mut self) -> Vec<Box<dyn ShapeAnimation>> {
        let batch: Vec<Rc<RefCell<AnimState>>> = self
            .spec
            .tracks
            .iter()
            .map(|t| {
                Rc::new(RefCell::new(AnimState {
                    name: format!("{}_{}Track", t.element, t.property),
                    // Web animations start running as soon as they are created.
                    playing: true,
                    rate: 1.0,
                    ..Default::default()
                }))
            })
            .collect();
        let out = batch
            .iter()
            .map(|s| Box::new(FakeAnimation(s.clone())) as Box<dyn ShapeAnimation>)
            .collect();
        self.view.0.borrow_mut().batches.push(batch);
        out
    }
}

// ----------------------------------------------------------------------
// Host
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct HostLog {
    events: Rc<RefCell<Vec<PlaybackEvent>>>,
    reveals: Rc<RefCell<Vec<RevealPlan>>>,
}

impl HostLog {
    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.borrow().clone()
    }

    pub fn count(&self, event: PlaybackEvent) -> usize {
        self.events.borrow().iter().filter(|e| **e == event).count()
    }

    pub fn reveals(&self) -> Vec<RevealPlan> {
        self.reveals.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
        self.reveals.borrow_mut().clear();
    }
}

pub struct RecordingHost {
    log: HostLog,
    fail: bool,
}

impl RecordingHost {
    pub fn new() -> (Self, HostLog) {
        let log = HostLog::default();
        (
            Self {
                log: log.clone(),
                fail: false,
            },
            log,
        )
    }

    /// A host that records nothing and refuses every notification.
    pub fn failing() -> Self {
        Self {
            log: HostLog::default(),
            fail: true,
        }
    }
}

impl PlaybackHost for RecordingHost {
    fn notify(&mut self, event: PlaybackEvent) -> Result<(), PlayerError> {
        if self.fail {
            return Err(PlayerError::HostUnavailable);
        }
        self.log.events.borrow_mut().push(event);
        Ok(())
    }

    fn reveal(&mut self, plan: &RevealPlan) {
        self.log.reveals.borrow_mut().push(*plan);
    }
}

// ----------------------------------------------------------------------
// Interval scheduler
// ----------------------------------------------------------------------

#[derive(Debug, Default)]
struct SchedulerState {
    next: u32,
    live: Vec<IntervalHandle>,
    started: Vec<(IntervalHandle, f64)>,
    cancelled: Vec<IntervalHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerLog(Rc<RefCell<SchedulerState>>);

impl SchedulerLog {
    pub fn live(&self) -> Vec<IntervalHandle> {
        self.0.borrow().live.clone()
    }

    pub fn started(&self) -> Vec<(IntervalHandle, f64)> {
        self.0.borrow().started.clone()
    }

    pub fn cancelled(&self) -> Vec<IntervalHandle> {
        self.0.borrow().cancelled.clone()
    }
}

pub struct ManualScheduler(SchedulerLog);

impl ManualScheduler {
    pub fn new() -> (Self, SchedulerLog) {
        let log = SchedulerLog::default();
        (Self(log.clone()), log)
    }
}

impl IntervalScheduler for ManualScheduler {
    fn start(&mut self, period_ms: f64) -> IntervalHandle {
        let mut s = (self.0).0.borrow_mut();
        let handle = IntervalHandle(s.next);
        s.next += 1;
        s.live.push(handle);
        s.started.push((handle, period_ms));
        handle
    }

    fn cancel(&mut self, handle: IntervalHandle) {
        let mut s = (self.0).0.borrow_mut();
        s.live.retain(|h| *h != handle);
        s.cancelled.push(handle);
    }
}

// ----------------------------------------------------------------------
// Timers and lookup
// ----------------------------------------------------------------------

/// Refuses the first `failures` clock requests, then behaves like [`VirtualTimer`].
pub struct FlakyTimer {
    failures: usize,
    calls: Rc<Cell<usize>>,
}

impl FlakyTimer {
    pub fn new(failures: usize) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                failures,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl TimerElement for FlakyTimer {
    fn animate(&mut self, duration_ms: f64) -> Result<Box<dyn TimingClock>, PlayerError> {
        self.calls.set(self.calls.get() + 1);
        if self.failures > 0 {
            self.failures -= 1;
            return Err(PlayerError::missing("timer element detached"));
        }
        Ok(Box::new(VirtualClock::new(duration_ms)))
    }
}

/// Resolves a fixed set of timer ids to [`VirtualTimer`]s.
pub struct TimerDirectory(pub Vec<String>);

impl ElementResolver for TimerDirectory {
    fn resolve_timer(&mut self, id: &str) -> Option<Box<dyn TimerElement>> {
        self.0
            .iter()
            .any(|known| known == id)
            .then(|| Box::new(VirtualTimer) as Box<dyn TimerElement>)
    }
}

/// A finish callback and the counter it bumps.
pub fn counting_callback() -> (impl FnMut() + 'static, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    (move || c.set(c.get() + 1), count)
}

pub fn approx(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}
