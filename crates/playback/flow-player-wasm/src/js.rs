//! Adapters from browser objects to the core collaborator traits.
//!
//! Everything is reached dynamically through `Reflect`, so any object with the
//! right members works (real DOM nodes, Web Animations handles, or test doubles).

use std::cell::Cell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use log::{debug, warn};
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use flow_player_core::{
    ElementResolver, IntervalHandle, IntervalScheduler, PlayState, PlaybackEvent, PlaybackHost,
    PlayerError, RevealPlan, Shape, ShapeAnimation, Timeline, TimerElement, TimingClock,
};

pub(crate) fn is_nullish(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn describe(e: &JsValue) -> String {
    if let Some(err) = e.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

fn get(obj: &JsValue, key: &str) -> Result<JsValue, PlayerError> {
    Reflect::get(obj, &JsValue::from_str(key)).map_err(|e| PlayerError::host(describe(&e)))
}

fn set(obj: &JsValue, key: &str, value: &JsValue) -> Result<(), PlayerError> {
    Reflect::set(obj, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| PlayerError::host(describe(&e)))
}

fn method(obj: &JsValue, name: &str) -> Result<Function, PlayerError> {
    get(obj, name)?
        .dyn_into::<Function>()
        .map_err(|_| PlayerError::missing(format!("method '{name}'")))
}

/// `obj[name](...args)`.
fn call(obj: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, PlayerError> {
    let f = method(obj, name)?;
    let args: Array = args.iter().collect();
    f.apply(obj, &args)
        .map_err(|e| PlayerError::host(format!("{name}: {}", describe(&e))))
}

/// Fire-and-forget variant for trait methods that cannot fail.
fn call_quiet(obj: &JsValue, name: &str, args: &[JsValue]) {
    if let Err(e) = call(obj, name, args) {
        debug!("{name} skipped: {e}");
    }
}

fn number(obj: &JsValue, key: &str) -> f64 {
    get(obj, key).ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
}

// ----------------------------------------------------------------------
// Timer element and timing clock
// ----------------------------------------------------------------------

pub(crate) struct JsTimer {
    element: JsValue,
}

impl JsTimer {
    pub(crate) fn new(element: JsValue) -> Result<Self, PlayerError> {
        if is_nullish(&element) {
            return Err(PlayerError::missing("timer element"));
        }
        Ok(Self { element })
    }
}

impl TimerElement for JsTimer {
    fn animate(&mut self, duration_ms: f64) -> Result<Box<dyn TimingClock>, PlayerError> {
        let options = Object::new();
        set(&options, "duration", &JsValue::from_f64(duration_ms))?;
        set(&options, "fill", &JsValue::from_str("forwards"))?;
        let anim = call(&self.element, "animate", &[Array::new().into(), options.into()])?;
        if is_nullish(&anim) {
            return Err(PlayerError::missing("timing animation"));
        }
        Ok(Box::new(JsClock::attach(anim, duration_ms)?))
    }
}

/// A Web Animations handle used as the timing clock. `onfinish` sets a latch that
/// [`TimingClock::advance`] drains.
struct JsClock {
    anim: JsValue,
    duration: f64,
    finished: Rc<Cell<bool>>,
    _onfinish: Closure<dyn FnMut()>,
}

impl JsClock {
    fn attach(anim: JsValue, duration: f64) -> Result<Self, PlayerError> {
        let finished = Rc::new(Cell::new(false));
        let latch = finished.clone();
        let onfinish = Closure::<dyn FnMut()>::new(move || latch.set(true));
        set(&anim, "onfinish", onfinish.as_ref().unchecked_ref())?;
        Ok(Self {
            anim,
            duration,
            finished,
            _onfinish: onfinish,
        })
    }
}

impl Drop for JsClock {
    fn drop(&mut self) {
        let _ = set(&self.anim, "onfinish", &JsValue::NULL);
    }
}

impl TimingClock for JsClock {
    fn play(&mut self) {
        call_quiet(&self.anim, "play", &[]);
    }

    fn pause(&mut self) {
        call_quiet(&self.anim, "pause", &[]);
    }

    fn play_state(&self) -> PlayState {
        get(&self.anim, "playState")
            .ok()
            .and_then(|v| v.as_string())
            .map_or(PlayState::Idle, |s| PlayState::from(s.as_str()))
    }

    fn current_time(&self) -> f64 {
        number(&self.anim, "currentTime")
    }

    fn set_current_time(&mut self, ms: f64) {
        if let Err(e) = set(&self.anim, "currentTime", &JsValue::from_f64(ms)) {
            warn!("timing clock seek failed: {e}");
        }
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn set_duration(&mut self, ms: f64) {
        let timing = Object::new();
        let applied = set(&timing, "duration", &JsValue::from_f64(ms))
            .and_then(|_| get(&self.anim, "effect"))
            .and_then(|effect| call(&effect, "updateTiming", &[timing.into()]));
        match applied {
            Ok(_) => self.duration = ms,
            Err(e) => warn!("timing clock duration not updated: {e}"),
        }
    }

    fn advance(&mut self, _dt_ms: f64) -> bool {
        self.finished.replace(false)
    }
}

// ----------------------------------------------------------------------
// Timeline, shapes, shape animations
// ----------------------------------------------------------------------

pub(crate) struct JsTimeline {
    obj: JsValue,
    shapes: Vec<Box<dyn Shape>>,
}

impl JsTimeline {
    /// Wrap a timeline object; `allShapes` is read once, skipping unresolved entries.
    pub(crate) fn new(obj: JsValue) -> Result<Self, PlayerError> {
        if is_nullish(&obj) {
            return Err(PlayerError::missing("timeline"));
        }
        let all = get(&obj, "allShapes")?;
        let shapes = if Array::is_array(&all) {
            Array::from(&all)
                .iter()
                .filter(|s| !is_nullish(s))
                .map(|s| Box::new(JsShape(s)) as Box<dyn Shape>)
                .collect()
        } else {
            warn!("timeline has no allShapes array");
            Vec::new()
        };
        Ok(Self { obj, shapes })
    }
}

impl Timeline for JsTimeline {
    fn duration_ms(&self) -> f64 {
        number(&self.obj, "duration")
    }

    fn shapes_mut(&mut self) -> &mut [Box<dyn Shape>] {
        &mut self.shapes
    }

    fn load_fill_images(&mut self) {
        call_quiet(&self.obj, "loadFillImages", &[]);
    }

    fn load_svg_animations(&mut self) {
        call_quiet(&self.obj, "loadSVGAnimations", &[]);
    }

    fn create_all_animations(&mut self) -> Vec<Box<dyn ShapeAnimation>> {
        match call(&self.obj, "createAllAnimations", &[]) {
            Ok(list) if Array::is_array(&list) => Array::from(&list)
                .iter()
                .filter(|a| !is_nullish(a))
                .map(|a| Box::new(JsAnimation(a)) as Box<dyn ShapeAnimation>)
                .collect(),
            Ok(_) => {
                warn!("createAllAnimations did not return an array");
                Vec::new()
            }
            Err(e) => {
                warn!("{e}");
                Vec::new()
            }
        }
    }
}

/// SVG root; its clock is in seconds.
struct JsShape(JsValue);

impl Shape for JsShape {
    fn current_time(&self) -> f64 {
        call(&self.0, "getCurrentTime", &[])
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    fn set_current_time(&mut self, seconds: f64) {
        call_quiet(&self.0, "setCurrentTime", &[JsValue::from_f64(seconds)]);
    }

    fn pause_animations(&mut self) -> Result<(), PlayerError> {
        call(&self.0, "pauseAnimations", &[]).map(|_| ())
    }

    fn unpause_animations(&mut self) -> Result<(), PlayerError> {
        call(&self.0, "unpauseAnimations", &[]).map(|_| ())
    }
}

struct JsAnimation(JsValue);

impl ShapeAnimation for JsAnimation {
    fn play(&mut self) {
        call_quiet(&self.0, "play", &[]);
    }

    fn pause(&mut self) {
        call_quiet(&self.0, "pause", &[]);
    }

    fn cancel(&mut self) {
        call_quiet(&self.0, "cancel", &[]);
    }

    fn detach_target(&mut self) {
        match get(&self.0, "effect") {
            Ok(effect) if !is_nullish(&effect) => {
                let _ = set(&effect, "target", &JsValue::NULL);
            }
            _ => {}
        }
    }

    fn current_time(&self) -> f64 {
        number(&self.0, "currentTime")
    }

    fn set_current_time(&mut self, ms: f64) {
        let _ = set(&self.0, "currentTime", &JsValue::from_f64(ms));
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let _ = set(&self.0, "playbackRate", &JsValue::from_f64(rate));
    }
}

// ----------------------------------------------------------------------
// Host services
// ----------------------------------------------------------------------

/// Forwards notifications to `listener(name, detail)`.
///
/// Delivery is queued as a microtask: the listener runs after the current player
/// call has returned, so it may call back into the player.
pub(crate) struct JsHost {
    listener: Function,
}

impl JsHost {
    pub(crate) fn new(listener: Function) -> Self {
        Self { listener }
    }

    fn deliver(&self, name: &str, detail: &JsValue) -> Result<(), PlayerError> {
        let task = self
            .listener
            .bind2(&JsValue::NULL, &JsValue::from_str(name), detail);
        call(&js_sys::global(), "queueMicrotask", &[task.into()]).map(|_| ())
    }
}

impl PlaybackHost for JsHost {
    fn notify(&mut self, event: PlaybackEvent) -> Result<(), PlayerError> {
        self.deliver(event.name(), &JsValue::UNDEFINED)
    }

    fn reveal(&mut self, plan: &RevealPlan) {
        let detail = match swb::to_value(plan) {
            Ok(v) => v,
            Err(e) => {
                warn!("reveal plan not serialised: {e}");
                return;
            }
        };
        if let Err(e) = self.deliver("reveal", &detail) {
            warn!("reveal not delivered: {e}");
        }
    }
}

/// Delegates to a JS object exposing `start(periodMs) -> handle` and `cancel(handle)`.
pub(crate) struct JsScheduler {
    obj: JsValue,
}

impl JsScheduler {
    pub(crate) fn new(obj: JsValue) -> Result<Self, PlayerError> {
        method(&obj, "start")?;
        method(&obj, "cancel")?;
        Ok(Self { obj })
    }
}

impl IntervalScheduler for JsScheduler {
    fn start(&mut self, period_ms: f64) -> IntervalHandle {
        match call(&self.obj, "start", &[JsValue::from_f64(period_ms)]) {
            Ok(v) => IntervalHandle(v.as_f64().unwrap_or(0.0) as u32),
            Err(e) => {
                warn!("interval not started: {e}");
                IntervalHandle(0)
            }
        }
    }

    fn cancel(&mut self, handle: IntervalHandle) {
        call_quiet(&self.obj, "cancel", &[JsValue::from(handle.0)]);
    }
}

/// Resolves timer ids through `resolver(id) -> element | null`.
pub(crate) struct JsResolver {
    f: Function,
}

impl JsResolver {
    pub(crate) fn new(f: Function) -> Self {
        Self { f }
    }
}

impl ElementResolver for JsResolver {
    fn resolve_timer(&mut self, id: &str) -> Option<Box<dyn TimerElement>> {
        let element = self.f.call1(&JsValue::UNDEFINED, &JsValue::from_str(id)).ok()?;
        JsTimer::new(element)
            .ok()
            .map(|t| Box::new(t) as Box<dyn TimerElement>)
    }
}
