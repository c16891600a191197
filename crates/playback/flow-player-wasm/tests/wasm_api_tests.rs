#![cfg(target_arch = "wasm32")]
use flow_player_wasm::{abi_version, format_time_label, FlowDriver, FlowPlayer};
use js_sys::{Function, Promise, Reflect};
use serde_json::{json, Value};
use serde_wasm_bindgen as swb;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

// Minimal stand-ins for a timer element, a Web Animations handle and a timeline.
const DOUBLES: &str = r#"
function anim() {
  return {
    playState: "idle", currentTime: 0, playbackRate: 1, onfinish: null,
    effect: { target: {}, duration: 0, updateTiming(t) { this.duration = t.duration; } },
    play() { this.playState = "running"; },
    pause() { this.playState = "paused"; },
    cancel() { this.playState = "idle"; this.cancelled = true; },
    finish() { this.currentTime = this.effect.duration; this.playState = "finished";
               if (this.onfinish) this.onfinish(); },
  };
}
const timer = {
  clocks: [],
  animate(_keys, opts) { const a = anim(); a.effect.duration = opts.duration;
                         a.fill = opts.fill; this.clocks.push(a); return a; },
};
function shape() {
  return { t: 0, paused: false,
    getCurrentTime() { return this.t; }, setCurrentTime(t) { this.t = t; },
    pauseAnimations() { this.paused = true; }, unpauseAnimations() { this.paused = false; } };
}
const timeline = {
  duration: 10000, loads: 0, anims: [],
  allShapes: [shape(), null, shape()],
  loadFillImages() { this.loads += 1; },
  loadSVGAnimations() { this.loads += 1; },
  createAllAnimations() { const a = [anim(), anim()]; this.anims.push(a); return a; },
};
const intervals = { next: 1, live: [],
  start(p) { this.period = p; const h = this.next++; this.live.push(h); return h; },
  cancel(h) { this.live = this.live.filter((x) => x !== h); } };
const events = [];
const listener = (name) => events.push(name);
return { timer, timeline, intervals, events, listener };
"#;

fn doubles() -> JsValue {
    Function::new_no_args(DOUBLES).call0(&JsValue::NULL).unwrap()
}

fn get(obj: &JsValue, path: &[&str]) -> JsValue {
    path.iter().fold(obj.clone(), |o, k| {
        Reflect::get(&o, &JsValue::from_str(k)).unwrap()
    })
}

fn last_clock(d: &JsValue) -> JsValue {
    let clocks = js_sys::Array::from(&get(d, &["timer", "clocks"]));
    clocks.get(clocks.length() - 1)
}

fn finish(clock: &JsValue) {
    let f: Function = get(clock, &["finish"]).into();
    f.call0(clock).unwrap();
}

#[wasm_bindgen_test]
fn abi_is_1() {
    assert_eq!(abi_version(), 1);
}

#[wasm_bindgen_test]
fn label_export() {
    assert_eq!(format_time_label(1_500.0), "1.50 s");
}

#[wasm_bindgen_test]
fn missing_timer_is_an_error() {
    assert!(FlowPlayer::new(JsValue::NULL, JsValue::UNDEFINED).is_err());
}

#[wasm_bindgen_test]
fn bad_config_is_an_error() {
    let d = doubles();
    let cfg = swb::to_value(&json!({ "playback_rate": "fast" })).unwrap();
    assert!(FlowPlayer::new(get(&d, &["timer"]), cfg).is_err());
}

#[wasm_bindgen_test]
fn install_and_play_drives_js_objects() {
    let d = doubles();
    let cfg = swb::to_value(&json!({ "delay_ms": 2000.0 })).unwrap();
    let mut p = FlowPlayer::new(get(&d, &["timer"]), cfg).unwrap();
    p.set_timeline(get(&d, &["timeline"])).unwrap();

    let clock = last_clock(&d);
    assert_eq!(get(&clock, &["effect", "duration"]).as_f64(), Some(12_000.0));
    assert_eq!(get(&clock, &["fill"]).as_string().as_deref(), Some("forwards"));
    assert_eq!(get(&d, &["timeline", "loads"]).as_f64(), Some(2.0));
    assert!(!p.is_playing());

    p.play().unwrap();
    assert!(p.is_playing());
    let shape = js_sys::Array::from(&get(&d, &["timeline", "allShapes"])).get(0);
    assert_eq!(get(&shape, &["paused"]).as_bool(), Some(false));

    p.set_playback_rate(2.0).unwrap();
    assert_eq!(get(&clock, &["effect", "duration"]).as_f64(), Some(6_000.0));
}

/// Let queued microtasks (listener deliveries) run.
async fn settle() {
    JsFuture::from(Promise::resolve(&JsValue::UNDEFINED))
        .await
        .unwrap();
}

#[wasm_bindgen_test]
async fn onfinish_reaches_tick() {
    let d = doubles();
    let mut p = FlowPlayer::new(get(&d, &["timer"]), JsValue::UNDEFINED).unwrap();
    p.set_timeline(get(&d, &["timeline"])).unwrap();
    p.set_listener(Some(get(&d, &["listener"]).into()));
    p.play().unwrap();

    finish(&last_clock(&d));
    let report: Value = swb::from_value(p.tick(0.0).unwrap()).unwrap();
    assert_eq!(report["finished"], json!(true));
    assert_eq!(report["looped"], json!(false));

    // listeners run after the call that raised the event has returned
    let pending: Vec<String> = swb::from_value(get(&d, &["events"])).unwrap();
    assert!(pending.is_empty());
    settle().await;
    let events: Vec<String> = swb::from_value(get(&d, &["events"])).unwrap();
    assert!(events.contains(&"playbackStarted".to_string()));
    assert!(events.contains(&"playbackStopped".to_string()));
}

#[wasm_bindgen_test]
fn swap_cancels_and_detaches() {
    let d = doubles();
    let mut p = FlowPlayer::new(get(&d, &["timer"]), JsValue::UNDEFINED).unwrap();
    p.set_timeline(get(&d, &["timeline"])).unwrap();
    p.set_timeline(JsValue::NULL).unwrap();

    let first = js_sys::Array::from(&get(&d, &["timeline", "anims"])).get(0);
    let a0 = js_sys::Array::from(&first).get(0);
    assert_eq!(get(&a0, &["cancelled"]).as_bool(), Some(true));
    assert!(get(&a0, &["effect", "target"]).is_null());
}

#[wasm_bindgen_test]
fn driver_scrub_and_controls() {
    let d = doubles();
    let mut drv = FlowDriver::new(
        get(&d, &["timer"]),
        get(&d, &["timeline"]),
        get(&d, &["intervals"]),
        JsValue::UNDEFINED,
        JsValue::UNDEFINED,
    )
    .unwrap();
    assert_eq!(
        js_sys::Array::from(&get(&d, &["intervals", "live"])).length(),
        1
    );

    drv.slider_input(0.5).unwrap();
    let controls: Value = swb::from_value(drv.controls().unwrap()).unwrap();
    assert_eq!(controls["label"], json!("5 s"));
    assert_eq!(
        get(&last_clock(&d), &["currentTime"]).as_f64(),
        Some(5_000.0)
    );
    assert_eq!(
        js_sys::Array::from(&get(&d, &["intervals", "live"])).length(),
        0
    );
}
