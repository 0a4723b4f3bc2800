//! Scene lifecycle: one [`GlobeScene`] per mount point.
//!
//! `mount` builds the world, camera, renderer, controls, listeners and
//! animation loop exactly once; `unmount` undoes all of it. Size, colour and
//! speed changes rebuild the scene. Marker, multiplier and click-handler
//! changes never do.

use formats::{BoundaryCollection, BoundaryLoadError};
use foundation::color::Rgb;
use foundation::math::{Vec2, Vec3};
use foundation::time::Time;
use gpu::{Camera3D, RenderFrame, Renderer, RendererOptions};
use layers::{Layer, Marker, MarkerLayer, OutlineLayer};
use runtime::{Event, EventBus, Frame};
use scene::components::{Euler, NodeKind, Transform};
use scene::prefabs::globe::{spawn_ambient_light, spawn_globe_shell, spawn_graticule};
use scene::{NodeId, World};
use serde::Serialize;

use crate::config::GlobeConfig;
use crate::controls::{ControlEvent, ControlsOptions, OrbitControls};
use crate::interaction::{
    InteractionController, RotationState, Transition, pick_marker, pixel_to_ndc,
};
use crate::viewport::{
    Cursor, FrameRequestId, ListenerId, ListenerKind, PointerButton, Viewport,
};

pub const CAMERA_DISTANCE: f64 = 3.5;
pub const CAMERA_FOV_DEG: f64 = 50.0;
pub const CAMERA_NEAR: f64 = 0.1;
pub const CAMERA_FAR: f64 = 1000.0;
/// Earth's obliquity, applied once to the globe group.
pub const AXIAL_TILT_DEG: f64 = 23.5;
pub const MAX_PIXEL_RATIO: f64 = 2.0;
const AMBIENT_INTENSITY: f64 = 0.1;

const OUTLINE_LAYER_ID: u64 = 1;
const MARKER_LAYER_ID: u64 = 2;
/// Undrained events beyond this are dropped oldest first.
pub const EVENT_LOG_CAPACITY: usize = 256;

/// Something the host may want to observe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GlobeEvent {
    Mounted { generation: u64 },
    Unmounted { generation: u64 },
    MarkersSynced { count: usize },
    BoundariesApplied { outlines: usize, fills: usize },
    BoundaryLoadFailed { reason: String },
    BoundaryLoadDiscarded { ticket_generation: u64 },
    MarkerClicked { id: i64 },
    RotationSuspended,
    RotationResumed,
}

/// Permission to draw boundary data into the scene generation it was issued for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoundaryTicket {
    generation: u64,
}

impl BoundaryTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoundaryOutcome {
    Applied { outlines: usize, fills: usize },
    /// The load failed; the globe stays without continents.
    Failed,
    /// The scene the ticket was issued for is gone.
    Stale,
    AlreadyLoaded,
}

type ClickHandler = Box<dyn FnMut(&Marker)>;

/// Mutable rendering state that exists only while mounted.
struct SceneState {
    world: World,
    camera: Camera3D,
    renderer: Renderer,
    globe: NodeId,
    controls: OrbitControls,
    interaction: InteractionController,
    markers: MarkerLayer,
    outlines: OutlineLayer,
    outlines_loaded: bool,
    listeners: Vec<ListenerId>,
    animation: Option<FrameRequestId>,
    last_frame: Option<Frame>,
}

pub struct GlobeScene<V: Viewport> {
    viewport: V,
    config: GlobeConfig,
    markers: Vec<Marker>,
    click_handler: Option<ClickHandler>,
    state: Option<SceneState>,
    generation: u64,
    frames: u64,
    events: EventBus<GlobeEvent>,
}

impl<V: Viewport> std::fmt::Debug for GlobeScene<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobeScene")
            .field("config", &self.config)
            .field("markers", &self.markers.len())
            .field("mounted", &self.state.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

impl<V: Viewport> GlobeScene<V> {
    /// An unmounted scene. Call [`GlobeScene::mount`] to start rendering.
    pub fn new(viewport: V, config: GlobeConfig) -> Self {
        Self {
            viewport,
            config,
            markers: Vec::new(),
            click_handler: None,
            state: None,
            generation: 0,
            frames: 0,
            events: EventBus::bounded(EVENT_LOG_CAPACITY),
        }
    }

    pub fn config(&self) -> &GlobeConfig {
        &self.config
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    /// Incremented by every mount.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Build the scene. A no-op while already mounted.
    pub fn mount(&mut self) {
        if self.state.is_some() {
            tracing::debug!(generation = self.generation, "already mounted");
            return;
        }

        let stale = self.viewport.clear_children();
        if stale > 0 {
            tracing::debug!(stale, "cleared stale mount point children");
        }

        let mut world = World::new();
        let camera = Camera3D::look_at(
            Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            Vec3::ZERO,
            CAMERA_FOV_DEG.to_radians(),
            CAMERA_NEAR,
            CAMERA_FAR,
        );

        let size = self.config.size;
        let mut renderer = Renderer::new(RendererOptions {
            antialias: true,
            alpha: true,
        });
        renderer.set_size(size, size);
        renderer.set_pixel_ratio(self.viewport.device_pixel_ratio().min(MAX_PIXEL_RATIO));
        renderer.set_clear_color(Rgb::BLACK, 0.0);
        self.viewport.attach_surface(renderer.surface(), size, size);

        let globe = world.spawn_root(
            NodeKind::Group,
            Transform::rotate(Euler::new(AXIAL_TILT_DEG.to_radians(), 0.0, 0.0)),
        );
        let color = self.config.base_color();
        spawn_globe_shell(&mut world, globe, color);
        if self.config.graticule {
            spawn_graticule(&mut world, globe, color);
        }
        spawn_ambient_light(&mut world, Rgb::WHITE, AMBIENT_INTENSITY);

        let mut controls = OrbitControls::new(CAMERA_DISTANCE, ControlsOptions::default());
        controls.set_canvas_size(f64::from(size), f64::from(size));

        let listeners = ListenerKind::ALL
            .iter()
            .map(|kind| self.viewport.add_listener(*kind))
            .collect();
        self.viewport.set_cursor(Cursor::Grab);
        let animation = Some(self.viewport.request_animation_frame());

        self.generation += 1;
        self.state = Some(SceneState {
            world,
            camera,
            renderer,
            globe,
            controls,
            interaction: InteractionController::new(self.config.speed),
            markers: MarkerLayer::new(MARKER_LAYER_ID),
            outlines: OutlineLayer::new(OUTLINE_LAYER_ID),
            outlines_loaded: false,
            listeners,
            animation,
            last_frame: None,
        });

        tracing::info!(
            generation = self.generation,
            size,
            color = %color,
            speed = self.config.speed,
            "globe mounted"
        );
        self.emit(GlobeEvent::Mounted {
            generation: self.generation,
        });

        if !self.markers.is_empty() {
            self.resync_markers();
        }
    }

    /// Tear everything down so a later [`GlobeScene::mount`] starts fresh.
    pub fn unmount(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };

        if let Some(id) = state.animation.take() {
            self.viewport.cancel_animation_frame(id);
        }
        for id in state.listeners.drain(..) {
            self.viewport.remove_listener(id);
        }
        state.controls.dispose();
        if !self.viewport.detach_surface(state.renderer.surface()) {
            tracing::debug!("surface was already detached");
        }
        let markers = state.markers.clear(&mut state.world);
        state.outlines.clear(&mut state.world);
        state.renderer.dispose();

        tracing::info!(
            generation = self.generation,
            markers,
            frames = state.renderer.frames_rendered(),
            "globe unmounted"
        );
        self.emit(GlobeEvent::Unmounted {
            generation: self.generation,
        });
    }

    pub fn resize(&mut self, size: u32) {
        if self.config.size != size {
            self.config.size = size;
            self.remount();
        }
    }

    pub fn recolor(&mut self, color: impl Into<String>) {
        let color = color.into();
        if self.config.color != color {
            self.config.color = color;
            self.remount();
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        if self.config.speed != speed {
            self.config.speed = speed;
            self.remount();
        }
    }

    fn remount(&mut self) {
        if self.state.is_some() {
            self.unmount();
            self.mount();
        }
    }

    /// Replace the marker set. Camera, rotation and outlines are untouched.
    pub fn sync_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
        self.resync_markers();
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn set_dot_size_multiplier(&mut self, multiplier: f64) {
        if self.config.dot_size_multiplier != multiplier {
            self.config.dot_size_multiplier = multiplier;
            self.resync_markers();
        }
    }

    pub fn set_click_handler(&mut self, handler: impl FnMut(&Marker) + 'static) {
        self.click_handler = Some(Box::new(handler));
    }

    pub fn clear_click_handler(&mut self) {
        self.click_handler = None;
    }

    fn resync_markers(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let count = state.markers.sync(
            &mut state.world,
            state.globe,
            &self.markers,
            self.config.dot_size_multiplier,
        );
        self.emit(GlobeEvent::MarkersSynced { count });
    }

    /// A ticket for the current scene, while it still lacks outlines.
    pub fn boundary_ticket(&self) -> Option<BoundaryTicket> {
        let state = self.state.as_ref()?;
        (!state.outlines_loaded).then_some(BoundaryTicket {
            generation: self.generation,
        })
    }

    /// Draw loaded boundary data, if the ticket still refers to this scene.
    pub fn apply_boundaries(
        &mut self,
        ticket: BoundaryTicket,
        result: Result<BoundaryCollection, BoundaryLoadError>,
    ) -> BoundaryOutcome {
        if self.state.is_none() || ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale boundary load"
            );
            self.emit(GlobeEvent::BoundaryLoadDiscarded {
                ticket_generation: ticket.generation,
            });
            return BoundaryOutcome::Stale;
        }
        let Some(state) = self.state.as_mut() else {
            return BoundaryOutcome::Stale;
        };
        if state.outlines_loaded {
            return BoundaryOutcome::AlreadyLoaded;
        }

        match result {
            Ok(collection) => {
                let stats = state.outlines.draw(&mut state.world, state.globe, &collection);
                state.outlines_loaded = true;
                self.emit(GlobeEvent::BoundariesApplied {
                    outlines: stats.outlines,
                    fills: stats.fills,
                });
                BoundaryOutcome::Applied {
                    outlines: stats.outlines,
                    fills: stats.fills,
                }
            }
            Err(err) => {
                tracing::warn!(%err, "boundary data unavailable; rendering without continents");
                self.emit(GlobeEvent::BoundaryLoadFailed {
                    reason: err.to_string(),
                });
                BoundaryOutcome::Failed
            }
        }
    }

    /// One animation-loop iteration at host time `now`. `None` when unmounted.
    pub fn frame(&mut self, now: Time) -> Option<RenderFrame> {
        let state = self.state.as_mut()?;

        let frame = match state.last_frame {
            Some(prev) => prev.next_at(now),
            None => Frame::first(now),
        };
        state.last_frame = Some(frame);

        if state.controls.update(frame.dt_s) {
            state.controls.apply_to(&mut state.camera);
        }

        let resumed = state.interaction.tick(now) == Some(Transition::Resumed);
        let step = state.interaction.rotation_step();
        if step != 0.0 {
            if let Some(transform) = state.world.transform_mut(state.globe) {
                transform.rotation.y += step;
            }
        }

        let output = state.renderer.render(&state.world, &state.camera);
        self.viewport.present(&output);

        // The request that fired this frame is spent; cancelling it is harmless.
        if let Some(id) = state.animation.take() {
            self.viewport.cancel_animation_frame(id);
        }
        state.animation = Some(self.viewport.request_animation_frame());

        self.frames += 1;
        if resumed {
            self.emit(GlobeEvent::RotationResumed);
        }
        Some(output)
    }

    /// Start orbiting. Buttons other than the primary one are ignored.
    pub fn pointer_down(&mut self, pos_px: Vec2, button: PointerButton, now: Time) {
        if button != PointerButton::Primary {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.controls.pointer_down(pos_px, now) != Some(ControlEvent::Start) {
            return;
        }
        let suspended = state.interaction.drag_start() == Some(Transition::Suspended);
        self.viewport.set_cursor(Cursor::Grabbing);
        if suspended {
            self.emit(GlobeEvent::RotationSuspended);
        }
    }

    pub fn pointer_move(&mut self, pos_px: Vec2, now: Time) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.controls.pointer_move(pos_px, now) {
            state.controls.apply_to(&mut state.camera);
        }
        let cursor = state.interaction.hover_cursor();
        self.viewport.set_cursor(cursor);
    }

    pub fn pointer_up(&mut self, _pos_px: Vec2, now: Time) {
        self.release(now);
    }

    /// The host lost the pointer mid-drag (cancel or lost capture); ends the
    /// drag exactly like a release.
    pub fn pointer_cancel(&mut self, now: Time) {
        self.release(now);
    }

    fn release(&mut self, now: Time) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.controls.pointer_up(now) == Some(ControlEvent::End) {
            state.interaction.drag_end(now);
            self.viewport.set_cursor(Cursor::Grab);
        }
    }

    /// Zoom is disabled on the globe; wheel input only reaches the controls.
    pub fn wheel(&mut self, delta: f64) {
        if let Some(state) = self.state.as_mut() {
            state.controls.wheel(delta);
        }
    }

    /// Hit-test a click at `pos_px` and notify the click handler on a
    /// clickable marker.
    pub fn click(&mut self, pos_px: Vec2) -> Option<Marker> {
        let state = self.state.as_ref()?;
        let (w, h) = state.renderer.size();
        let ndc = pixel_to_ndc(pos_px, f64::from(w), f64::from(h));
        let marker = pick_marker(&state.world, &state.camera, &state.markers, ndc)?.clone();

        tracing::debug!(marker = marker.id, "marker clicked");
        self.emit(GlobeEvent::MarkerClicked { id: marker.id });
        if let Some(handler) = self.click_handler.as_mut() {
            handler(&marker);
        }
        Some(marker)
    }

    pub fn drain_events(&mut self) -> Vec<Event<GlobeEvent>> {
        self.events.drain()
    }

    fn emit(&mut self, event: GlobeEvent) {
        self.events.emit(self.frames, event);
    }

    pub fn rotation_state(&self) -> Option<RotationState> {
        self.state.as_ref().map(|s| s.interaction.state())
    }

    /// Accumulated auto-rotation of the globe group about its Y axis.
    pub fn globe_spin(&self) -> Option<f64> {
        let state = self.state.as_ref()?;
        Some(state.world.node(state.globe)?.transform.rotation.y)
    }

    pub fn world(&self) -> Option<&World> {
        self.state.as_ref().map(|s| &s.world)
    }

    pub fn camera(&self) -> Option<&Camera3D> {
        self.state.as_ref().map(|s| &s.camera)
    }

    pub fn marker_nodes(&self) -> &[NodeId] {
        self.state.as_ref().map(|s| s.markers.nodes()).unwrap_or(&[])
    }

    /// Pixel position of a world-space point, if it lies in front of the camera.
    pub fn project_to_screen(&self, point: Vec3) -> Option<Vec2> {
        let state = self.state.as_ref()?;
        let ndc = state.camera.project_to_ndc(point)?;
        let (w, h) = state.renderer.size();
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * f64::from(w),
            (1.0 - ndc.y) * 0.5 * f64::from(h),
        ))
    }
}

impl<V: Viewport> Drop for GlobeScene<V> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundaryOutcome, EVENT_LOG_CAPACITY, GlobeEvent, GlobeScene};
    use crate::config::GlobeConfig;
    use crate::interaction::RotationState;
    use crate::viewport::{Cursor, HeadlessViewport, ListenerKind, PointerButton};
    use approx::assert_abs_diff_eq;
    use formats::{BoundaryCollection, BoundaryLoadError, StaticBoundarySource, load_boundaries};
    use foundation::math::{Vec2, Vec3};
    use foundation::time::Time;
    use layers::Marker;
    use pretty_assertions::assert_eq;
    use scene::components::{Geometry, NodeKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    const TRIANGLE: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "Tri"},
         "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [20, 0], [0, 20]]]}}
    ]}"#;

    fn mounted() -> (GlobeScene<HeadlessViewport>, HeadlessViewport) {
        let viewport = HeadlessViewport::new(3.0);
        let probe = viewport.probe();
        let mut scene = GlobeScene::new(viewport, GlobeConfig::default());
        scene.mount();
        (scene, probe)
    }

    fn payloads(scene: &mut GlobeScene<HeadlessViewport>) -> Vec<GlobeEvent> {
        scene.drain_events().into_iter().map(|e| e.payload).collect()
    }

    fn front_markers() -> Vec<Marker> {
        vec![
            Marker::new(1, 0.0, 90.0, "#ff0000").with_info("Front"),
            Marker::new(2, 10.0, 60.0, "#00ff00"),
        ]
    }

    fn triangle() -> BoundaryCollection {
        BoundaryCollection::from_geojson_str(TRIANGLE).expect("parse")
    }

    /// Pixel position of the first marker mesh's centre.
    fn marker_px(scene: &GlobeScene<HeadlessViewport>, index: usize) -> Vec2 {
        let world = scene.world().expect("mounted");
        let node = scene.marker_nodes()[index];
        let centre = world.local_to_world(node, Vec3::ZERO).expect("node");
        scene.project_to_screen(centre).expect("visible")
    }

    #[test]
    fn mount_is_idempotent() {
        let (mut scene, probe) = mounted();
        let surface = probe.state().surface;
        scene.mount();
        assert_eq!(scene.generation(), 1);
        assert_eq!(probe.state().surface, surface);
        assert_eq!(probe.state().listeners.len(), ListenerKind::ALL.len());
        assert_eq!(probe.state().pending_frames.len(), 1);
        assert_eq!(probe.state().cursor, Cursor::Grab);
        assert_eq!(payloads(&mut scene), vec![GlobeEvent::Mounted { generation: 1 }]);
    }

    #[test]
    fn mount_clears_stale_children_and_sizes_the_surface() {
        let viewport = HeadlessViewport::new(3.0).with_stale_children(2);
        let probe = viewport.probe();
        let config = GlobeConfig {
            size: 400,
            ..GlobeConfig::default()
        };
        let mut scene = GlobeScene::new(viewport, config);
        scene.mount();
        assert_eq!(probe.state().children, 1);
        let (_, w, h) = probe.state().surface.expect("attached");
        assert_eq!((w, h), (400, 400));

        let frame = scene.frame(Time(0.0)).expect("frame");
        assert_eq!(frame.buffer_size, (800, 800));
        assert_eq!(frame.clear_color[3], 0.0);
    }

    #[test]
    fn builds_tilted_globe_with_shell_and_light() {
        let (mut scene, _probe) = mounted();
        let frame = scene.frame(Time(0.0)).expect("frame");
        assert_eq!(frame.stats().spheres, 1);
        assert_abs_diff_eq!(frame.ambient[0], 0.1, epsilon = 1e-6);
        let world = scene.world().expect("mounted");
        let globe = world.roots()[0];
        assert_abs_diff_eq!(
            world.node(globe).expect("globe").transform.rotation.x,
            23.5f64.to_radians(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn graticule_is_opt_in() {
        let viewport = HeadlessViewport::default();
        let config = GlobeConfig {
            graticule: true,
            ..GlobeConfig::default()
        };
        let mut scene = GlobeScene::new(viewport, config);
        scene.mount();
        let frame = scene.frame(Time(0.0)).expect("frame");
        assert!(frame.stats().line_segments > 0);

        let (mut plain, _probe) = mounted();
        let frame = plain.frame(Time(0.0)).expect("frame");
        assert_eq!(frame.stats().line_segments, 0);
    }

    #[test]
    fn unmount_releases_everything() {
        let (mut scene, probe) = mounted();
        scene.sync_markers(front_markers());
        scene.frame(Time(0.0));
        scene.unmount();

        let state = probe.state();
        assert!(state.surface.is_none());
        assert_eq!(state.children, 0);
        assert!(state.listeners.is_empty());
        assert!(state.pending_frames.is_empty());
        drop(state);
        assert!(!scene.is_mounted());
        assert!(scene.frame(Time(1.0)).is_none());
        assert!(scene.boundary_ticket().is_none());
    }

    #[test]
    fn drop_tears_down() {
        let (scene, probe) = mounted();
        drop(scene);
        assert!(probe.state().surface.is_none());
        assert!(probe.state().listeners.is_empty());
    }

    #[test]
    fn remount_after_unmount_starts_a_new_generation() {
        let (mut scene, _probe) = mounted();
        scene.unmount();
        scene.mount();
        assert_eq!(scene.generation(), 2);
    }

    #[test]
    fn marker_sync_keeps_the_scene() {
        let (mut scene, probe) = mounted();
        scene.frame(Time(0.0));
        let surface = probe.state().surface;
        let spin = scene.globe_spin();

        scene.sync_markers(front_markers());
        scene.sync_markers(front_markers());
        assert_eq!(scene.generation(), 1);
        assert_eq!(probe.state().surface, surface);
        assert_eq!(scene.globe_spin(), spin);
        assert_eq!(scene.marker_nodes().len(), 2);

        let world = scene.world().expect("mounted");
        // shell + two markers
        assert_eq!(world.live_geometries(), 3);
    }

    #[test]
    fn multiplier_change_resizes_markers_without_remount() {
        let (mut scene, _probe) = mounted();
        scene.sync_markers(front_markers());
        scene.set_dot_size_multiplier(2.0);
        assert_eq!(scene.generation(), 1);
        let world = scene.world().expect("mounted");
        let node = scene.marker_nodes()[0];
        let NodeKind::Mesh { geometry, .. } = world.node(node).expect("node").kind else {
            panic!("marker mesh");
        };
        let Some(Geometry::Sphere { radius, .. }) = world.geometry(geometry) else {
            panic!("sphere");
        };
        assert_abs_diff_eq!(*radius, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn markers_synced_before_mount_appear_on_mount() {
        let mut scene = GlobeScene::new(HeadlessViewport::default(), GlobeConfig::default());
        scene.sync_markers(front_markers());
        assert!(scene.marker_nodes().is_empty());
        scene.mount();
        assert_eq!(scene.marker_nodes().len(), 2);
    }

    #[test]
    fn changed_settings_remount_and_keep_markers() {
        let (mut scene, probe) = mounted();
        scene.sync_markers(front_markers());
        let first_surface = probe.state().surface.map(|s| s.0);

        scene.resize(800);
        scene.recolor("#333333");
        scene.set_speed(0.003);
        assert_eq!(scene.generation(), 1);

        scene.resize(600);
        assert_eq!(scene.generation(), 2);
        assert_ne!(probe.state().surface.map(|s| s.0), first_surface);
        assert_eq!(probe.state().listeners.len(), ListenerKind::ALL.len());
        assert_eq!(scene.marker_nodes().len(), 2);

        scene.recolor("red");
        scene.set_speed(0.01);
        assert_eq!(scene.generation(), 4);
        assert_eq!(scene.marker_nodes().len(), 2);
    }

    #[test]
    fn auto_rotation_advances_by_speed_per_frame() {
        let (mut scene, _probe) = mounted();
        for i in 0..10 {
            scene.frame(Time(i as f64 / 60.0));
        }
        assert_abs_diff_eq!(scene.globe_spin().expect("spin"), 0.03, epsilon = 1e-12);
    }

    #[test]
    fn drag_suspends_then_resumes_after_three_seconds() {
        let (mut scene, probe) = mounted();
        scene.frame(Time(0.0));
        scene.pointer_down(Vec2::new(400.0, 400.0), PointerButton::Primary, Time(1.0));
        assert_eq!(probe.state().cursor, Cursor::Grabbing);
        scene.pointer_move(Vec2::new(450.0, 400.0), Time(1.1));
        assert_eq!(probe.state().cursor, Cursor::Grabbing);
        scene.pointer_up(Vec2::new(450.0, 400.0), Time(1.2));
        assert_eq!(probe.state().cursor, Cursor::Grab);

        let spin = scene.globe_spin().expect("spin");
        scene.frame(Time(4.19));
        assert_eq!(scene.globe_spin(), Some(spin));
        assert!(matches!(scene.rotation_state(), Some(RotationState::Settling { .. })));

        scene.pointer_move(Vec2::new(10.0, 10.0), Time(4.195));
        assert_eq!(probe.state().cursor, Cursor::Grabbing);

        scene.frame(Time(4.25));
        assert_eq!(scene.rotation_state(), Some(RotationState::AutoRotating));
        assert_abs_diff_eq!(scene.globe_spin().expect("spin"), spin + 0.003, epsilon = 1e-12);

        scene.pointer_move(Vec2::new(10.0, 10.0), Time(4.3));
        assert_eq!(probe.state().cursor, Cursor::Grab);

        let events = payloads(&mut scene);
        assert!(events.contains(&GlobeEvent::RotationSuspended));
        assert!(events.contains(&GlobeEvent::RotationResumed));
    }

    #[test]
    fn redrag_while_settling_cancels_resume() {
        let (mut scene, _probe) = mounted();
        scene.pointer_down(Vec2::new(400.0, 400.0), PointerButton::Primary, Time(0.0));
        scene.pointer_up(Vec2::new(400.0, 400.0), Time(0.5));
        scene.pointer_down(Vec2::new(400.0, 400.0), PointerButton::Primary, Time(2.0));
        scene.frame(Time(3.6));
        scene.frame(Time(10.0));
        assert_eq!(scene.rotation_state(), Some(RotationState::UserDragging));
        assert_eq!(scene.globe_spin(), Some(0.0));
    }

    #[test]
    fn cancelled_drag_settles_and_frees_the_controls() {
        let (mut scene, probe) = mounted();
        scene.pointer_down(Vec2::new(400.0, 400.0), PointerButton::Primary, Time(0.0));
        scene.pointer_move(Vec2::new(450.0, 400.0), Time(0.1));
        scene.pointer_cancel(Time(0.2));
        assert!(matches!(scene.rotation_state(), Some(RotationState::Settling { .. })));
        assert_eq!(probe.state().cursor, Cursor::Grab);

        scene.frame(Time(3.25));
        assert_eq!(scene.rotation_state(), Some(RotationState::AutoRotating));

        // The next press starts a fresh drag instead of being swallowed.
        scene.pointer_down(Vec2::new(400.0, 400.0), PointerButton::Primary, Time(4.0));
        assert_eq!(scene.rotation_state(), Some(RotationState::UserDragging));
    }

    #[test]
    fn undrained_events_are_capped() {
        let (mut scene, _probe) = mounted();
        for _ in 0..EVENT_LOG_CAPACITY + 50 {
            scene.sync_markers(front_markers());
        }
        let events = payloads(&mut scene);
        assert_eq!(events.len(), EVENT_LOG_CAPACITY);
        assert!(!events.contains(&GlobeEvent::Mounted { generation: 1 }));
        assert_eq!(events.last(), Some(&GlobeEvent::MarkersSynced { count: 2 }));
    }

    #[test]
    fn non_primary_buttons_do_not_suspend_rotation() {
        let (mut scene, probe) = mounted();
        let buttons = [
            PointerButton::Secondary,
            PointerButton::Auxiliary,
            PointerButton::from_dom(3),
        ];
        for button in buttons {
            scene.pointer_down(Vec2::new(400.0, 400.0), button, Time(0.0));
            assert_eq!(scene.rotation_state(), Some(RotationState::AutoRotating));
        }
        assert_eq!(probe.state().cursor, Cursor::Grab);
        assert!(!payloads(&mut scene).contains(&GlobeEvent::RotationSuspended));
    }

    #[test]
    fn click_on_marker_invokes_handler() {
        let (mut scene, _probe) = mounted();
        let clicked = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&clicked);
        scene.set_click_handler(move |m: &Marker| sink.borrow_mut().push(m.id));
        scene.sync_markers(front_markers());

        let px = marker_px(&scene, 0);
        let hit = scene.click(px).expect("hit");
        assert_eq!(hit.descriptive_text.as_deref(), Some("Front"));
        assert_eq!(*clicked.borrow(), vec![1]);
        assert!(payloads(&mut scene).contains(&GlobeEvent::MarkerClicked { id: 1 }));
    }

    #[test]
    fn textless_marker_and_empty_space_do_not_fire() {
        let (mut scene, _probe) = mounted();
        let clicked = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&clicked);
        scene.set_click_handler(move |_m: &Marker| *sink.borrow_mut() += 1);
        scene.sync_markers(front_markers());

        let textless = marker_px(&scene, 1);
        assert!(scene.click(textless).is_none());
        assert!(scene.click(Vec2::new(5.0, 5.0)).is_none());
        assert_eq!(*clicked.borrow(), 0);
    }

    #[test]
    fn click_tracks_the_rotating_globe() {
        let (mut scene, _probe) = mounted();
        scene.sync_markers(front_markers());
        let before = marker_px(&scene, 0);
        for i in 0..100 {
            scene.frame(Time(i as f64 / 60.0));
        }
        let after = marker_px(&scene, 0);
        assert!((after.x - before.x).abs() > 1.0);
        assert_eq!(scene.click(after).map(|m| m.id), Some(1));
    }

    #[test]
    fn boundaries_apply_once() {
        let (mut scene, _probe) = mounted();
        let ticket = scene.boundary_ticket().expect("ticket");
        let source = StaticBoundarySource(TRIANGLE.to_string());
        let loaded = pollster::block_on(load_boundaries(&source));
        assert_eq!(
            scene.apply_boundaries(ticket, loaded),
            BoundaryOutcome::Applied { outlines: 1, fills: 1 }
        );
        assert!(scene.boundary_ticket().is_none());
        assert_eq!(scene.apply_boundaries(ticket, Ok(triangle())), BoundaryOutcome::AlreadyLoaded);

        let frame = scene.frame(Time(0.0)).expect("frame");
        assert_eq!(frame.stats().line_segments, 3);
        assert_eq!(frame.stats().triangles, 1);
    }

    #[test]
    fn failed_load_degrades_silently() {
        let (mut scene, _probe) = mounted();
        let ticket = scene.boundary_ticket().expect("ticket");
        let failure = BoundaryLoadError::Fetch("404".to_string());
        let outcome = scene.apply_boundaries(ticket, Err(failure));
        assert_eq!(outcome, BoundaryOutcome::Failed);
        assert!(scene.is_mounted());
        let frame = scene.frame(Time(0.0)).expect("frame");
        assert_eq!(frame.stats().triangles, 0);
        assert!(
            payloads(&mut scene)
                .iter()
                .any(|e| matches!(e, GlobeEvent::BoundaryLoadFailed { .. }))
        );
    }

    #[test]
    fn stale_tickets_are_discarded() {
        let (mut scene, _probe) = mounted();
        let ticket = scene.boundary_ticket().expect("ticket");
        scene.resize(500);
        assert_eq!(scene.apply_boundaries(ticket, Ok(triangle())), BoundaryOutcome::Stale);
        assert_eq!(scene.world().expect("mounted").live_geometries(), 1);

        let fresh = scene.boundary_ticket().expect("fresh ticket");
        scene.unmount();
        assert_eq!(scene.apply_boundaries(fresh, Ok(triangle())), BoundaryOutcome::Stale);
    }

    #[test]
    fn events_serialize_with_frame_index() {
        let (mut scene, _probe) = mounted();
        scene.frame(Time(0.0));
        scene.sync_markers(Vec::new());
        let events = scene.drain_events();
        let json = serde_json::to_string(&events[1]).expect("json");
        assert_eq!(json, r#"{"frame_index":1,"payload":{"MarkersSynced":{"count":0}}}"#);
    }
}
