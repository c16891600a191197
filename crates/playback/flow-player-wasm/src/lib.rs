use js_sys::Function;
use log::warn;
use serde::de::DeserializeOwned;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use flow_player_core::{
    Driver, DriverConfig, FinishCallback, PlaybackHost, Player, PlayerConfig, PlayerError, Timeline,
};

mod js;

use js::{is_nullish, JsHost, JsResolver, JsScheduler, JsTimeline, JsTimer};

fn to_js(e: PlayerError) -> JsError {
    JsError::new(&e.to_string())
}

/// Parse an optional config object; `undefined`/`null` yields the defaults.
fn config_from<T: DeserializeOwned + Default>(value: JsValue, what: &str) -> Result<T, JsError> {
    if is_nullish(&value) {
        Ok(T::default())
    } else {
        swb::from_value(value).map_err(|e| JsError::new(&format!("{what} config error: {e}")))
    }
}

fn timeline_from(value: JsValue) -> Result<Option<Box<dyn Timeline>>, JsError> {
    if is_nullish(&value) {
        return Ok(None);
    }
    let timeline = JsTimeline::new(value).map_err(to_js)?;
    Ok(Some(Box::new(timeline)))
}

fn finish_callback(callback: Function) -> impl FnMut() + 'static {
    move || {
        if let Err(e) = callback.call0(&JsValue::NULL) {
            warn!("finish callback threw: {e:?}");
        }
    }
}

fn build_player(timer: JsValue, config: JsValue) -> Result<Player, JsError> {
    console_error_panic_hook::set_once();
    let cfg: PlayerConfig = config_from(config, "player")?;
    let timer = JsTimer::new(timer).map_err(to_js)?;
    Player::new(cfg, Box::new(timer)).map_err(to_js)
}

#[wasm_bindgen]
pub struct FlowPlayer {
    core: Player,
}

#[wasm_bindgen]
impl FlowPlayer {
    /// Create a player on a timer element. Pass a config object or undefined/null
    /// for defaults.
    /// Example:
    ///   new FlowPlayer(timerEl, { loop_playback: true, delay_ms: 500 })
    #[wasm_bindgen(constructor)]
    pub fn new(timer: JsValue, config: JsValue) -> Result<FlowPlayer, JsError> {
        Ok(FlowPlayer {
            core: build_player(timer, config)?,
        })
    }

    /// Create a player on the element returned by `resolver(timerId)`.
    #[wasm_bindgen(js_name = fromTimerId)]
    pub fn from_timer_id(
        timer_id: String,
        resolver: Function,
        config: JsValue,
    ) -> Result<FlowPlayer, JsError> {
        console_error_panic_hook::set_once();
        let cfg: PlayerConfig = config_from(config, "player")?;
        let mut resolver = JsResolver::new(resolver);
        let core = Player::from_timer_id(cfg, &timer_id, &mut resolver).map_err(to_js)?;
        Ok(FlowPlayer { core })
    }

    /// Install a timeline object, or clear it with null/undefined.
    #[wasm_bindgen(js_name = setTimeline)]
    pub fn set_timeline(&mut self, timeline: JsValue) -> Result<(), JsError> {
        let timeline = timeline_from(timeline)?;
        self.core.set_timeline(timeline).map_err(to_js)
    }

    pub fn play(&mut self) -> Result<(), JsError> {
        self.core.play().map_err(to_js)
    }

    pub fn pause(&mut self) -> Result<(), JsError> {
        self.core.pause().map_err(to_js)
    }

    pub fn stop(&mut self) -> Result<(), JsError> {
        self.core.stop().map_err(to_js)
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.core.is_playing()
    }

    /// One of "NoTimeline", "Idle", "Running", "Paused", "Finished".
    pub fn state(&self) -> Result<JsValue, JsError> {
        swb::to_value(&self.core.state()).map_err(|e| JsError::new(&format!("state error: {e}")))
    }

    #[wasm_bindgen(getter)]
    pub fn duration(&self) -> f64 {
        self.core.duration_ms()
    }

    #[wasm_bindgen(getter, js_name = currentTime)]
    pub fn current_time(&self) -> f64 {
        self.core.current_time()
    }

    #[wasm_bindgen(js_name = setCurrentTime)]
    pub fn set_current_time(&mut self, ms: f64) -> Result<(), JsError> {
        self.core.set_current_time(ms).map_err(to_js)
    }

    #[wasm_bindgen(getter, js_name = playbackRate)]
    pub fn playback_rate(&self) -> f64 {
        self.core.playback_rate()
    }

    #[wasm_bindgen(js_name = setPlaybackRate)]
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<(), JsError> {
        self.core.set_playback_rate(rate).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setLoop)]
    pub fn set_loop(&mut self, on: bool) {
        self.core.set_loop(on);
    }

    /// Register (or clear) the callback invoked once per finish event.
    #[wasm_bindgen(js_name = setOnFinish)]
    pub fn set_on_finish(&mut self, callback: Option<Function>) {
        self.core
            .set_callback(callback.map(|f| Box::new(finish_callback(f)) as FinishCallback));
    }

    /// Register (or clear) `listener(name, detail)` for playback notifications.
    #[wasm_bindgen(js_name = setListener)]
    pub fn set_listener(&mut self, listener: Option<Function>) {
        self.core
            .set_host(listener.map(|f| Box::new(JsHost::new(f)) as Box<dyn PlaybackHost>));
    }

    /// Drain the timing clock's finish latch and any pending auto-play.
    /// Returns `{ finished, looped, auto_played }`.
    pub fn tick(&mut self, dt_ms: f64) -> Result<JsValue, JsError> {
        let report = self.core.tick(dt_ms);
        swb::to_value(&report).map_err(|e| JsError::new(&format!("tick error: {e}")))
    }

    /// Feed an IntersectionObserver ratio. Returns true if playback started.
    #[wasm_bindgen(js_name = observeVisibility)]
    pub fn observe_visibility(&mut self, ratio: f64) -> bool {
        self.core.observe_visibility(ratio)
    }
}

#[wasm_bindgen]
pub struct FlowDriver {
    core: Driver,
}

#[wasm_bindgen]
impl FlowDriver {
    /// Create a player on `timer`, install `timeline`, and wrap it with transport
    /// state. `scheduler` must expose `start(periodMs)` and `cancel(handle)`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        timer: JsValue,
        timeline: JsValue,
        scheduler: JsValue,
        player_config: JsValue,
        driver_config: JsValue,
    ) -> Result<FlowDriver, JsError> {
        let mut player = build_player(timer, player_config)?;
        let cfg: DriverConfig = config_from(driver_config, "driver")?;
        let scheduler = JsScheduler::new(scheduler).map_err(to_js)?;
        if let Err(e) = player.set_timeline(timeline_from(timeline)?) {
            warn!("timeline installed without a timing clock: {e}");
        }
        let core = Driver::new(cfg, player, Box::new(scheduler)).map_err(to_js)?;
        Ok(FlowDriver { core })
    }

    /// Interval callback.
    pub fn refresh(&mut self) {
        self.core.refresh();
    }

    /// Host loop step; see `FlowPlayer.tick`.
    pub fn advance(&mut self, dt_ms: f64) -> Result<JsValue, JsError> {
        let report = self.core.advance(dt_ms);
        swb::to_value(&report).map_err(|e| JsError::new(&format!("advance error: {e}")))
    }

    #[wasm_bindgen(js_name = togglePlayback)]
    pub fn toggle_playback(&mut self, on: bool) -> Result<(), JsError> {
        self.core.toggle_playback(on).map_err(to_js)
    }

    #[wasm_bindgen(js_name = sliderInput)]
    pub fn slider_input(&mut self, fraction: f64) -> Result<(), JsError> {
        self.core.slider_input(fraction).map_err(to_js)
    }

    #[wasm_bindgen(js_name = sliderChange)]
    pub fn slider_change(&mut self) -> Result<(), JsError> {
        self.core.slider_change().map_err(to_js)
    }

    #[wasm_bindgen(js_name = setLoop)]
    pub fn set_loop(&mut self, on: bool) {
        self.core.set_loop(on);
    }

    pub fn stop(&mut self) -> Result<(), JsError> {
        self.core.stop().map_err(to_js)
    }

    pub fn play(&mut self) -> Result<(), JsError> {
        self.core.play().map_err(to_js)
    }

    pub fn pause(&mut self) -> Result<(), JsError> {
        self.core.pause().map_err(to_js)
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.core.is_playing()
    }

    #[wasm_bindgen(js_name = setCurrentTime)]
    pub fn set_current_time(&mut self, ms: f64) -> Result<(), JsError> {
        self.core.set_current_time(ms).map_err(to_js)
    }

    #[wasm_bindgen(js_name = observeVisibility)]
    pub fn observe_visibility(&mut self, ratio: f64) -> bool {
        self.core.observe_visibility(ratio)
    }

    /// `{ slider, label, play_toggle, loop_toggle }`.
    pub fn controls(&self) -> Result<JsValue, JsError> {
        swb::to_value(self.core.controls())
            .map_err(|e| JsError::new(&format!("controls error: {e}")))
    }

    #[wasm_bindgen(js_name = setOnFinish)]
    pub fn set_on_finish(&mut self, callback: Option<Function>) {
        self.core
            .player_mut()
            .set_callback(callback.map(|f| Box::new(finish_callback(f)) as FinishCallback));
    }

    #[wasm_bindgen(js_name = setListener)]
    pub fn set_listener(&mut self, listener: Option<Function>) {
        self.core
            .player_mut()
            .set_host(listener.map(|f| Box::new(JsHost::new(f)) as Box<dyn PlaybackHost>));
    }
}

/// Format elapsed milliseconds the way the transport label shows them.
#[wasm_bindgen(js_name = formatTimeLabel)]
pub fn format_time_label(ms: f64) -> String {
    flow_player_core::format_time_label(ms)
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
