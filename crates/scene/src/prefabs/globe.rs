use foundation::color::Rgb;
use foundation::math::{GLOBE_RADIUS, Vec3, project};

use crate::World;
use crate::components::{Geometry, Material, NodeKind, Transform};
use crate::node::NodeId;

const SHELL_SEGMENTS: u32 = 32;
const SHELL_OPACITY: f64 = 0.4;
const GRATICULE_OPACITY: f64 = 0.1;
const GRATICULE_STEP_DEG: i32 = 20;
const GRATICULE_SEGMENTS: usize = 64;

/// Wireframe sphere shell at the globe radius, tinted with the base colour.
pub fn spawn_globe_shell(world: &mut World, parent: NodeId, color: Rgb) -> Option<NodeId> {
    world.spawn_mesh(
        parent,
        Geometry::sphere(GLOBE_RADIUS, SHELL_SEGMENTS, SHELL_SEGMENTS),
        Material::basic(color).wireframe().with_opacity(SHELL_OPACITY),
        Transform::identity(),
    )
}

/// Latitude circles every 20° (±80°) and meridian great circles every 20°.
pub fn spawn_graticule(world: &mut World, parent: NodeId, color: Rgb) -> Vec<NodeId> {
    let mut lines = Vec::new();
    let material = Material::basic(color).with_opacity(GRATICULE_OPACITY);

    for lat in (-80..=80).step_by(GRATICULE_STEP_DEG as usize) {
        let ring = (0..GRATICULE_SEGMENTS)
            .map(|i| {
                let lon = 360.0 * i as f64 / GRATICULE_SEGMENTS as f64 - 180.0;
                project(f64::from(lat), lon, GLOBE_RADIUS)
            })
            .collect();
        lines.extend(world.spawn_line(parent, Geometry::line_loop(ring), material));
    }

    for lon in (0..180).step_by(GRATICULE_STEP_DEG as usize) {
        let opposite = f64::from(lon) + 180.0;
        // Pole to pole down `lon`, then back up the opposite meridian.
        let half = GRATICULE_SEGMENTS / 2;
        let down = (0..=half).map(|i| {
            let lat = 90.0 - 180.0 * i as f64 / half as f64;
            project(lat, f64::from(lon), GLOBE_RADIUS)
        });
        let up = (1..half).map(|i| {
            let lat = -90.0 + 180.0 * i as f64 / half as f64;
            project(lat, opposite, GLOBE_RADIUS)
        });
        let circle: Vec<Vec3> = down.chain(up).collect();
        lines.extend(world.spawn_line(parent, Geometry::line_loop(circle), material));
    }

    lines
}

pub fn spawn_ambient_light(world: &mut World, color: Rgb, intensity: f64) -> NodeId {
    world.spawn_root(
        NodeKind::AmbientLight { color, intensity },
        Transform::identity(),
    )
}
