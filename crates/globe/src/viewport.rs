use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use gpu::{RenderFrame, SurfaceId};

/// Pointer affordance shown over the globe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Grab,
    Grabbing,
}

impl Cursor {
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Grab => "grab",
            Cursor::Grabbing => "grabbing",
        }
    }
}

/// Input streams the scene subscribes to while mounted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    PointerDown,
    PointerMove,
    PointerUp,
    /// The platform took the pointer away mid-drag.
    PointerCancel,
    LostPointerCapture,
    Click,
    Wheel,
}

impl ListenerKind {
    pub const ALL: [ListenerKind; 7] = [
        ListenerKind::PointerDown,
        ListenerKind::PointerMove,
        ListenerKind::PointerUp,
        ListenerKind::PointerCancel,
        ListenerKind::LostPointerCapture,
        ListenerKind::Click,
        ListenerKind::Wheel,
    ];

    pub fn dom_event(self) -> &'static str {
        match self {
            ListenerKind::PointerDown => "pointerdown",
            ListenerKind::PointerMove => "pointermove",
            ListenerKind::PointerUp => "pointerup",
            ListenerKind::PointerCancel => "pointercancel",
            ListenerKind::LostPointerCapture => "lostpointercapture",
            ListenerKind::Click => "click",
            ListenerKind::Wheel => "wheel",
        }
    }
}

/// Which button pressed the pointer. Only the primary button orbits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
    Other(i16),
}

impl PointerButton {
    /// From a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            0 => PointerButton::Primary,
            1 => PointerButton::Auxiliary,
            2 => PointerButton::Secondary,
            other => PointerButton::Other(other),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u32);

/// The mount point a [`crate::GlobeScene`] draws into.
///
/// Implementations route registered input back into the scene and call
/// [`crate::GlobeScene::frame`] when a requested animation frame fires.
pub trait Viewport {
    /// Remove whatever the mount point currently holds. Returns how many nodes went.
    fn clear_children(&mut self) -> usize;

    fn attach_surface(&mut self, surface: SurfaceId, width: u32, height: u32);

    /// `false` if `surface` was not attached.
    fn detach_surface(&mut self, surface: SurfaceId) -> bool;

    fn set_cursor(&mut self, cursor: Cursor);

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);

    fn request_animation_frame(&mut self) -> FrameRequestId;

    fn cancel_animation_frame(&mut self, id: FrameRequestId);

    fn present(&mut self, frame: &RenderFrame);

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// Everything a [`HeadlessViewport`] has been asked to do, for inspection.
#[derive(Debug, Default)]
pub struct HeadlessState {
    pub children: usize,
    pub surface: Option<(SurfaceId, u32, u32)>,
    pub cursor: Cursor,
    pub listeners: BTreeSet<ListenerId>,
    pub pending_frames: BTreeSet<FrameRequestId>,
    pub frames_presented: u64,
    pub last_frame: Option<RenderFrame>,
    next_id: u32,
}

impl HeadlessState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Off-screen viewport for the CLI and tests. Clones share state, so a probe
/// kept by the caller keeps working after the viewport moves into a scene.
#[derive(Debug, Clone)]
pub struct HeadlessViewport {
    state: Rc<RefCell<HeadlessState>>,
    pixel_ratio: f64,
}

impl Default for HeadlessViewport {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl HeadlessViewport {
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            state: Rc::default(),
            pixel_ratio: device_pixel_ratio,
        }
    }

    /// A mount point that already holds `n` leftover nodes.
    pub fn with_stale_children(self, n: usize) -> Self {
        self.state.borrow_mut().children = n;
        self
    }

    pub fn probe(&self) -> HeadlessViewport {
        self.clone()
    }

    pub fn state(&self) -> std::cell::Ref<'_, HeadlessState> {
        self.state.borrow()
    }
}

impl Viewport for HeadlessViewport {
    fn clear_children(&mut self) -> usize {
        let mut state = self.state.borrow_mut();
        let removed = state.children;
        state.children = 0;
        state.surface = None;
        removed
    }

    fn attach_surface(&mut self, surface: SurfaceId, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        state.surface = Some((surface, width, height));
        state.children += 1;
    }

    fn detach_surface(&mut self, surface: SurfaceId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.surface {
            Some((attached, ..)) if attached == surface => {
                state.surface = None;
                state.children = state.children.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.state.borrow_mut().cursor = cursor;
    }

    fn add_listener(&mut self, _kind: ListenerKind) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_id());
        state.listeners.insert(id);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(&id);
    }

    fn request_animation_frame(&mut self) -> FrameRequestId {
        let mut state = self.state.borrow_mut();
        let id = FrameRequestId(state.next_id());
        state.pending_frames.insert(id);
        id
    }

    fn cancel_animation_frame(&mut self, id: FrameRequestId) {
        self.state.borrow_mut().pending_frames.remove(&id);
    }

    fn present(&mut self, frame: &RenderFrame) {
        let mut state = self.state.borrow_mut();
        state.frames_presented += 1;
        state.last_frame = Some(frame.clone());
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}
