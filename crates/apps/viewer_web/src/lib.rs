use console_error_panic_hook::set_once;
use gloo_net::http::Request;
use std::cell::{Cell, RefCell};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, MouseEvent, PointerEvent, WheelEvent};

use formats::{BoundaryLoadError, BoundarySource, load_boundaries};
use foundation::math::Vec2;
use foundation::time::Time;
use globe::{BoundaryOutcome, GlobeConfig, GlobeScene, ListenerKind, Marker, PointerButton};

mod paint;
mod viewport;
use viewport::WebViewport;

thread_local! {
    static STATE: RefCell<Option<GlobeScene<WebViewport>>> = const { RefCell::new(None) };
    static CLICK_CALLBACK: RefCell<Option<js_sys::Function>> = const { RefCell::new(None) };
    // Bumped per mount_globe so loads started for a replaced scene are dropped.
    static EPOCH: Cell<u64> = const { Cell::new(0) };
    static BOUNDARY_IN_FLIGHT: Cell<Option<(u64, u64)>> = const { Cell::new(None) };
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

/// Runs `f` against the mounted scene. `None` when there is none or it is
/// already borrowed further up the stack.
fn with_scene<R>(f: impl FnOnce(&mut GlobeScene<WebViewport>) -> R) -> Option<R> {
    STATE.with(|state| {
        let mut guard = state.try_borrow_mut().ok()?;
        guard.as_mut().map(f)
    })
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

struct HttpBoundarySource {
    url: String,
}

impl BoundarySource for HttpBoundarySource {
    async fn fetch(&self) -> Result<String, BoundaryLoadError> {
        let resp = Request::get(&self.url)
            .send()
            .await
            .map_err(|e| BoundaryLoadError::Fetch(e.to_string()))?;
        if !resp.ok() {
            return Err(BoundaryLoadError::Fetch(format!("HTTP {}", resp.status())));
        }
        resp.text()
            .await
            .map_err(|e| BoundaryLoadError::Fetch(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Start a continent fetch for the current mount unless one is already running.
fn request_boundaries() {
    let Some((ticket, url)) = with_scene(|scene| {
        scene
            .boundary_ticket()
            .map(|ticket| (ticket, scene.config().boundary_url.clone()))
    })
    .flatten() else {
        return;
    };
    let epoch = EPOCH.with(Cell::get);
    let key = (epoch, ticket.generation());
    if BOUNDARY_IN_FLIGHT.with(|f| f.replace(Some(key))) == Some(key) {
        return;
    }

    spawn_local(async move {
        let source = HttpBoundarySource { url };
        let result = load_boundaries(&source).await;
        BOUNDARY_IN_FLIGHT.with(|f| {
            if f.get() == Some(key) {
                f.set(None);
            }
        });
        if EPOCH.with(Cell::get) != epoch {
            return;
        }
        if let Err(err) = &result {
            log(&format!("Failed to load {}: {err}", source.describe()));
        }
        if let Some(BoundaryOutcome::Applied { outlines, fills }) =
            with_scene(|scene| scene.apply_boundaries(ticket, result))
        {
            log(&format!("continents drawn: {outlines} outlines, {fills} fills"));
        }
    });
}

fn notify_click(marker: &Marker) {
    let Some(callback) = CLICK_CALLBACK.with(|cb| cb.borrow().clone()) else {
        return;
    };
    let payload = serde_json::to_string(marker)
        .map_err(|e| JsValue::from_str(&e.to_string()))
        .and_then(|json| js_sys::JSON::parse(&json));
    match payload {
        Ok(value) => {
            if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                log(&format!("click callback threw: {err:?}"));
            }
        }
        Err(err) => log(&format!("could not encode marker: {err:?}")),
    }
}

pub(crate) fn dispatch_input(kind: ListenerKind, event: &Event) {
    if kind == ListenerKind::Wheel {
        if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
            with_scene(|scene| scene.wheel(wheel.delta_y()));
        }
        return;
    }
    let now = Time::from_millis(now_ms());
    if matches!(kind, ListenerKind::PointerCancel | ListenerKind::LostPointerCapture) {
        with_scene(|scene| scene.pointer_cancel(now));
        return;
    }
    let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
        return;
    };
    let pos = Vec2::new(f64::from(mouse.offset_x()), f64::from(mouse.offset_y()));
    match kind {
        ListenerKind::PointerDown => {
            let button = PointerButton::from_dom(mouse.button());
            if button == PointerButton::Primary {
                capture_pointer(event);
            }
            with_scene(|scene| scene.pointer_down(pos, button, now));
        }
        ListenerKind::PointerMove => {
            with_scene(|scene| scene.pointer_move(pos, now));
        }
        ListenerKind::PointerUp => {
            with_scene(|scene| scene.pointer_up(pos, now));
        }
        ListenerKind::Click => {
            // The callback runs after the scene borrow is released so it may
            // call back into this module.
            if let Some(marker) = with_scene(|scene| scene.click(pos)).flatten() {
                notify_click(&marker);
            }
        }
        ListenerKind::Wheel | ListenerKind::PointerCancel | ListenerKind::LostPointerCapture => {}
    }
}

/// Keep receiving move/up events for a drag that leaves the canvas.
fn capture_pointer(event: &Event) {
    let Some(pointer) = event.dyn_ref::<PointerEvent>() else {
        return;
    };
    let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
        return;
    };
    if let Err(err) = target.set_pointer_capture(pointer.pointer_id()) {
        log(&format!("setPointerCapture failed: {err:?}"));
    }
}

pub(crate) fn on_animation_frame(timestamp_ms: f64) {
    with_scene(|scene| {
        let Some(frame) = scene.frame(Time::from_millis(timestamp_ms)) else {
            return;
        };
        if let Some(camera) = scene.camera().copied() {
            scene.viewport().paint(&frame, &camera);
        }
    });
}

#[wasm_bindgen(start)]
pub fn start() {
    set_once();
}

/// Mount a globe into the element with id `element_id`, replacing any globe
/// mounted earlier. `config_json` holds any subset of the config fields.
#[wasm_bindgen]
pub fn mount_globe(element_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json {
        Some(json) => {
            GlobeConfig::from_json_str(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => GlobeConfig::default(),
    };
    let viewport = WebViewport::from_element_id(element_id)?;

    let previous = STATE.with(|state| state.borrow_mut().take());
    drop(previous);
    EPOCH.with(|e| e.set(e.get() + 1));

    let mut scene = GlobeScene::new(viewport, config);
    scene.mount();
    STATE.with(|state| *state.borrow_mut() = Some(scene));
    request_boundaries();
    Ok(())
}

#[wasm_bindgen]
pub fn unmount_globe() {
    let scene = STATE.with(|state| state.borrow_mut().take());
    drop(scene);
    EPOCH.with(|e| e.set(e.get() + 1));
}

#[wasm_bindgen]
pub fn set_size(size: u32) {
    with_scene(|scene| scene.resize(size));
    request_boundaries();
}

#[wasm_bindgen]
pub fn set_color(color: String) {
    with_scene(|scene| scene.recolor(color));
    request_boundaries();
}

#[wasm_bindgen]
pub fn set_speed(speed: f64) {
    with_scene(|scene| scene.set_speed(speed));
    request_boundaries();
}

/// Replace the markers with a JSON array of
/// `{id, lat, lon, color, size, opacity?, info?}`. Returns how many were drawn.
#[wasm_bindgen]
pub fn set_markers(markers_json: &str) -> Result<usize, JsValue> {
    let markers: Vec<Marker> =
        serde_json::from_str(markers_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(with_scene(|scene| {
        scene.sync_markers(markers);
        scene.marker_nodes().len()
    })
    .unwrap_or(0))
}

#[wasm_bindgen]
pub fn set_dot_size_multiplier(multiplier: f64) {
    with_scene(|scene| scene.set_dot_size_multiplier(multiplier));
}

/// `callback(marker)` runs for clicks on markers that carry info text.
#[wasm_bindgen]
pub fn set_click_callback(callback: Option<js_sys::Function>) {
    CLICK_CALLBACK.with(|cb| *cb.borrow_mut() = callback);
}

/// Engine events since the last call, as a JSON array.
#[wasm_bindgen]
pub fn take_events() -> Result<String, JsValue> {
    let events = with_scene(|scene| scene.drain_events()).unwrap_or_default();
    serde_json::to_string(&events).map_err(|e| JsValue::from_str(&e.to_string()))
}
