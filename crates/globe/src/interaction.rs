use foundation::math::Vec2;
use foundation::time::Time;
use gpu::Camera3D;
use layers::{Layer, Marker, MarkerLayer};
use scene::World;
use scene::picking::{PickOptions, intersect_nodes};

use crate::viewport::Cursor;

/// Delay between drag release and auto-rotation resuming.
pub const SETTLE_DELAY_S: f64 = 3.0;

/// Who drives the globe's spin.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum RotationState {
    #[default]
    AutoRotating,
    UserDragging,
    /// Released; auto-rotation resumes at `resume_at` unless a new drag starts first.
    Settling { resume_at: Time },
}

/// What a state change means for the host.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Suspended,
    Settling,
    Resumed,
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    state: RotationState,
    speed: f64,
}

impl InteractionController {
    pub fn new(speed: f64) -> Self {
        Self {
            state: RotationState::AutoRotating,
            speed,
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.state == RotationState::AutoRotating
    }

    /// Enter `UserDragging` from any state, dropping a pending resume.
    pub fn drag_start(&mut self) -> Option<Transition> {
        let was = std::mem::replace(&mut self.state, RotationState::UserDragging);
        match was {
            RotationState::UserDragging => None,
            RotationState::AutoRotating | RotationState::Settling { .. } => {
                Some(Transition::Suspended)
            }
        }
    }

    pub fn drag_end(&mut self, now: Time) -> Option<Transition> {
        if self.state != RotationState::UserDragging {
            return None;
        }
        self.state = RotationState::Settling {
            resume_at: now.after(SETTLE_DELAY_S),
        };
        Some(Transition::Settling)
    }

    /// Resume auto-rotation once the settle delay has elapsed.
    pub fn tick(&mut self, now: Time) -> Option<Transition> {
        match self.state {
            RotationState::Settling { resume_at } if now >= resume_at => {
                self.state = RotationState::AutoRotating;
                Some(Transition::Resumed)
            }
            _ => None,
        }
    }

    /// Rotation to apply this frame, in radians.
    pub fn rotation_step(&self) -> f64 {
        if self.is_auto_rotating() { self.speed } else { 0.0 }
    }

    /// Cursor to show while the pointer hovers without a button change.
    pub fn hover_cursor(&self) -> Cursor {
        if self.is_auto_rotating() {
            Cursor::Grab
        } else {
            Cursor::Grabbing
        }
    }
}

/// Convert a pixel position inside a `width` × `height` surface to NDC.
pub fn pixel_to_ndc(pos_px: Vec2, width: f64, height: f64) -> Vec2 {
    Vec2::new(
        pos_px.x / width.max(1.0) * 2.0 - 1.0,
        -(pos_px.y / height.max(1.0)) * 2.0 + 1.0,
    )
}

/// Nearest clickable marker under `ndc`. Hits on markers without descriptive
/// text are passed over in distance order.
pub fn pick_marker<'w>(
    world: &'w World,
    camera: &Camera3D,
    markers: &MarkerLayer,
    ndc: Vec2,
) -> Option<&'w Marker> {
    let ray = camera.ray_through_ndc(ndc)?;
    intersect_nodes(world, ray, markers.nodes(), PickOptions::default())
        .into_iter()
        .filter_map(|hit| markers.marker(world, hit.node))
        .find(|marker| marker.is_clickable())
}

#[cfg(test)]
mod tests {
    use super::{InteractionController, RotationState, Transition, pick_marker, pixel_to_ndc};
    use crate::viewport::Cursor;
    use approx::assert_abs_diff_eq;
    use foundation::math::{MARKER_RADIUS, Vec2, Vec3, project};
    use foundation::time::Time;
    use gpu::Camera3D;
    use layers::{Marker, MarkerLayer};
    use scene::World;
    use scene::components::{NodeKind, Transform};

    #[test]
    fn resumes_exactly_after_settle_delay() {
        let mut ctl = InteractionController::new(0.01);
        assert_eq!(ctl.rotation_step(), 0.01);
        assert_eq!(ctl.drag_start(), Some(Transition::Suspended));
        assert_eq!(ctl.hover_cursor(), Cursor::Grabbing);
        assert_eq!(ctl.rotation_step(), 0.0);
        assert_eq!(ctl.drag_end(Time(10.0)), Some(Transition::Settling));
        assert_eq!(ctl.tick(Time(12.999)), None);
        assert_eq!(ctl.rotation_step(), 0.0);
        assert_eq!(ctl.tick(Time(13.0)), Some(Transition::Resumed));
        assert_eq!(ctl.state(), RotationState::AutoRotating);
        assert_eq!(ctl.hover_cursor(), Cursor::Grab);
    }

    #[test]
    fn new_drag_cancels_pending_resume() {
        let mut ctl = InteractionController::new(0.01);
        ctl.drag_start();
        ctl.drag_end(Time(0.0));
        assert_eq!(ctl.drag_start(), Some(Transition::Suspended));
        assert_eq!(ctl.tick(Time(100.0)), None);
        assert_eq!(ctl.state(), RotationState::UserDragging);
        ctl.drag_end(Time(100.0));
        assert_eq!(ctl.tick(Time(102.0)), None);
        assert_eq!(ctl.tick(Time(103.0)), Some(Transition::Resumed));
    }

    #[test]
    fn release_without_drag_is_ignored() {
        let mut ctl = InteractionController::new(0.01);
        assert_eq!(ctl.drag_end(Time(1.0)), None);
        assert!(ctl.is_auto_rotating());
    }

    #[test]
    fn pixel_centre_maps_to_ndc_origin() {
        let ndc = pixel_to_ndc(Vec2::new(400.0, 400.0), 800.0, 800.0);
        assert_eq!(ndc, Vec2::new(0.0, 0.0));
        let corner = pixel_to_ndc(Vec2::new(0.0, 0.0), 800.0, 800.0);
        assert_eq!(corner, Vec2::new(-1.0, 1.0));
    }

    fn scene_with(markers: &[Marker]) -> (World, MarkerLayer, Camera3D) {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        let mut layer = MarkerLayer::new(1);
        layer.sync(&mut world, root, markers, 1.0);
        let camera = Camera3D::look_at(
            Vec3::new(0.0, 0.0, 3.5),
            Vec3::ZERO,
            50f64.to_radians(),
            0.1,
            1000.0,
        );
        (world, layer, camera)
    }

    fn ndc_of(camera: &Camera3D, lat: f64, lon: f64) -> Vec2 {
        camera.project_to_ndc(project(lat, lon, MARKER_RADIUS)).expect("in front")
    }

    #[test]
    fn ray_at_marker_returns_it() {
        let markers = vec![
            Marker::new(1, 0.0, 90.0, "#f00").with_info("front"),
            Marker::new(2, 30.0, 60.0, "#0f0").with_info("other"),
        ];
        let (world, layer, camera) = scene_with(&markers);
        let hit = pick_marker(&world, &camera, &layer, ndc_of(&camera, 30.0, 60.0)).expect("hit");
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn empty_space_between_markers_misses() {
        let markers = vec![
            Marker::new(1, 0.0, 80.0, "#f00").with_info("a"),
            Marker::new(2, 0.0, 100.0, "#0f0").with_info("b"),
        ];
        let (world, layer, camera) = scene_with(&markers);
        let ndc = ndc_of(&camera, 0.0, 90.0);
        assert_abs_diff_eq!(ndc.x, 0.0, epsilon = 1e-9);
        assert!(pick_marker(&world, &camera, &layer, ndc).is_none());
    }

    #[test]
    fn textless_markers_are_passed_over() {
        let markers = vec![
            Marker::new(1, 0.0, 90.0, "#f00").with_size(3.0),
            Marker::new(2, 0.0, 90.0, "#0f0").with_info("behind"),
        ];
        let (world, layer, camera) = scene_with(&markers);
        let hit = pick_marker(&world, &camera, &layer, Vec2::new(0.0, 0.0)).expect("hit");
        assert_eq!(hit.id, 2);

        let (world, layer, camera) = scene_with(&markers[..1]);
        assert!(pick_marker(&world, &camera, &layer, Vec2::new(0.0, 0.0)).is_none());
    }
}
