use std::collections::HashMap;

use globe::{Cursor, FrameRequestId, ListenerId, ListenerKind, Viewport};
use gpu::{Camera3D, RenderFrame, SurfaceId};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlCanvasElement, Window,
};

use crate::paint::paint;

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

struct Surface {
    id: SurfaceId,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

struct Listener {
    kind: ListenerKind,
    target: EventTarget,
    callback: Closure<dyn FnMut(Event)>,
}

struct PendingFrame {
    handle: i32,
    callback: Closure<dyn FnMut(f64)>,
}

/// A DOM element the globe mounts a `<canvas>` into.
///
/// Input listeners and animation frames call back into the crate's
/// thread-local scene, so this type never holds a reference to it.
pub struct WebViewport {
    window: Window,
    document: Document,
    mount: Element,
    surface: Option<Surface>,
    listeners: HashMap<ListenerId, Listener>,
    frames: HashMap<FrameRequestId, PendingFrame>,
    // A cancelled callback may still be on the stack; dropped on the next cancel.
    retired: Vec<Closure<dyn FnMut(f64)>>,
    next_id: u32,
}

impl WebViewport {
    pub fn from_element_id(element_id: &str) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let mount = document
            .get_element_by_id(element_id)
            .ok_or_else(|| JsValue::from_str(&format!("missing mount element {element_id:?}")))?;
        Ok(Self {
            window,
            document,
            mount,
            surface: None,
            listeners: HashMap::new(),
            frames: HashMap::new(),
            retired: Vec::new(),
            next_id: 0,
        })
    }

    fn next_id(&mut self) -> u32 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }

    fn create_surface(&self, id: SurfaceId, width: u32, height: u32) -> Result<Surface, JsValue> {
        let canvas = self
            .document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        canvas.set_width(width);
        canvas.set_height(height);
        let style = canvas.style();
        style.set_property("width", &format!("{width}px"))?;
        style.set_property("height", &format!("{height}px"))?;
        style.set_property("touch-action", "none")?;
        self.mount.append_child(&canvas)?;
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Surface { id, canvas, ctx })
    }

    fn listener_target(&self) -> EventTarget {
        match &self.surface {
            Some(surface) => surface.canvas.clone().into(),
            None => self.mount.clone().into(),
        }
    }

    /// Draw a frame the scene produced, seen through `camera`.
    pub fn paint(&self, frame: &RenderFrame, camera: &Camera3D) {
        if let Some(surface) = &self.surface {
            paint(&surface.ctx, frame, camera);
        }
    }
}

impl Viewport for WebViewport {
    fn clear_children(&mut self) -> usize {
        let mut removed = 0;
        while let Some(child) = self.mount.first_child() {
            if self.mount.remove_child(&child).is_err() {
                break;
            }
            removed += 1;
        }
        removed
    }

    fn attach_surface(&mut self, surface: SurfaceId, width: u32, height: u32) {
        match self.create_surface(surface, width, height) {
            Ok(created) => self.surface = Some(created),
            Err(err) => log(&format!("canvas setup failed: {err:?}")),
        }
    }

    fn detach_surface(&mut self, surface: SurfaceId) -> bool {
        match self.surface.take() {
            Some(attached) if attached.id == surface => {
                attached.canvas.remove();
                true
            }
            other => {
                self.surface = other;
                false
            }
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        if let Some(surface) = &self.surface {
            let _ = surface.canvas.style().set_property("cursor", cursor.css());
        }
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.next_id());
        let target = self.listener_target();
        let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            crate::dispatch_input(kind, &event);
        });
        if let Err(err) = target
            .add_event_listener_with_callback(kind.dom_event(), callback.as_ref().unchecked_ref())
        {
            log(&format!("addEventListener({}) failed: {err:?}", kind.dom_event()));
        }
        self.listeners.insert(id, Listener { kind, target, callback });
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if let Some(listener) = self.listeners.remove(&id) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.kind.dom_event(),
                listener.callback.as_ref().unchecked_ref(),
            );
        }
    }

    fn request_animation_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id());
        let callback = Closure::<dyn FnMut(f64)>::new(move |timestamp_ms: f64| {
            crate::on_animation_frame(timestamp_ms);
        });
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(handle) => {
                self.frames.insert(id, PendingFrame { handle, callback });
            }
            Err(err) => log(&format!("requestAnimationFrame failed: {err:?}")),
        }
        id
    }

    fn cancel_animation_frame(&mut self, id: FrameRequestId) {
        self.retired.clear();
        if let Some(pending) = self.frames.remove(&id) {
            let _ = self.window.cancel_animation_frame(pending.handle);
            self.retired.push(pending.callback);
        }
    }

    fn present(&mut self, frame: &RenderFrame) {
        let Some(surface) = &self.surface else {
            return;
        };
        let (w, h) = frame.buffer_size;
        if surface.canvas.width() != w {
            surface.canvas.set_width(w);
        }
        if surface.canvas.height() != h {
            surface.canvas.set_height(h);
        }
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }
}
