use std::collections::HashSet;

use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::World;
use crate::components::{Geometry, NodeKind, Side};
use crate::node::NodeId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
    /// Also test descendants of the target nodes.
    pub recursive: bool,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
            recursive: true,
        }
    }
}

/// Deterministic ray intersection against mesh nodes.
///
/// Ordering contract:
/// - Hits are sorted by distance along the (normalized) ray, nearest first.
/// - If multiple nodes are hit at the same distance, the lower `NodeId::index()` wins.
///
/// Notes:
/// - Sphere geometry is intersected analytically; triangle geometry per face,
///   honouring the material's `Side`.
/// - Lines, groups and lights are never hit.
/// - Nodes that are hidden, or have a hidden ancestor, are ignored.
/// - Each node contributes at most one hit: its nearest intersection.
pub fn intersect_nodes(
    world: &World,
    ray: Ray,
    targets: &[NodeId],
    opts: PickOptions,
) -> Vec<PickHit> {
    let Some(dir) = ray.dir.normalized() else {
        return Vec::new();
    };
    let ray = Ray::new(ray.origin, dir);

    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for &target in targets {
        let candidates = if opts.recursive {
            world.descendants(target)
        } else {
            vec![target]
        };
        for node in candidates {
            if !seen.insert(node) || !world.is_visible(node) {
                continue;
            }
            let Some(t) = node_hit_t(world, node, ray) else {
                continue;
            };
            if t <= opts.max_distance {
                hits.push(PickHit {
                    node,
                    distance: t,
                    point: ray.at(t),
                });
            }
        }
    }

    hits.sort_by(|a, b| {
        stable_total_cmp_f64(a.distance, b.distance)
            .then_with(|| a.node.index().cmp(&b.node.index()))
    });
    hits
}

fn node_hit_t(world: &World, node: NodeId, ray: Ray) -> Option<f64> {
    let NodeKind::Mesh { geometry, material } = world.node(node)?.kind else {
        return None;
    };
    let side = world.material(material).map(|m| m.side).unwrap_or_default();

    match world.geometry(geometry)? {
        Geometry::Sphere { radius, .. } => {
            let center = world.local_to_world(node, Vec3::ZERO)?;
            let radius = radius * world.world_scale(node)?.abs();
            ray_sphere_hit_t(ray, center, radius)
        }
        Geometry::Triangles { vertices, indices } => {
            let world_vertices: Vec<Vec3> = vertices
                .iter()
                .map(|v| world.local_to_world(node, *v))
                .collect::<Option<_>>()?;
            indices
                .iter()
                .filter_map(|[a, b, c]| {
                    let a = *world_vertices.get(*a as usize)?;
                    let b = *world_vertices.get(*b as usize)?;
                    let c = *world_vertices.get(*c as usize)?;
                    ray_triangle_hit_t(ray, a, b, c, side)
                })
                .min_by(|x, y| stable_total_cmp_f64(*x, *y))
        }
        Geometry::Polyline { .. } => None,
    }
}

/// Entry distance, or exit distance when the origin is inside the sphere.
fn ray_sphere_hit_t(ray: Ray, center: Vec3, radius: f64) -> Option<f64> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.dir);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let (t0, t1) = (-b - sq, -b + sq);
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Möller–Trumbore. Counter-clockwise winding is the front face.
fn ray_triangle_hit_t(ray: Ray, a: Vec3, b: Vec3, c: Vec3, side: Side) -> Option<f64> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-12 {
        return None;
    }
    match side {
        Side::Front if det < 0.0 => return None,
        Side::Back if det > 0.0 => return None,
        _ => {}
    }

    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::{PickOptions, Ray, intersect_nodes};
    use crate::World;
    use crate::components::{Euler, Geometry, Material, NodeKind, Transform};
    use approx::assert_abs_diff_eq;
    use foundation::color::Rgb;
    use foundation::math::Vec3;
    use std::f64::consts::PI;

    fn ball(world: &mut World, parent: crate::NodeId, at: Vec3, radius: f64) -> crate::NodeId {
        world
            .spawn_mesh(
                parent,
                Geometry::sphere(radius, 8, 8),
                Material::basic(Rgb::WHITE),
                Transform::translate(at),
            )
            .expect("mesh")
    }

    fn x_axis_ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0))
    }

    #[test]
    fn ray_hits_nearest_first() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        let far = ball(&mut world, root, Vec3::new(10.0, 0.0, 0.0), 1.0);
        let near = ball(&mut world, root, Vec3::new(5.0, 0.0, 0.0), 1.0);

        let hits = intersect_nodes(&world, x_axis_ray(), &[root], PickOptions::default());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert_eq!(hits[1].node, far);
        assert_abs_diff_eq!(hits[0].distance, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(hits[0].point.x, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn ray_between_spheres_misses() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        ball(&mut world, root, Vec3::new(5.0, 2.0, 0.0), 0.5);
        ball(&mut world, root, Vec3::new(5.0, -2.0, 0.0), 0.5);

        let hits = intersect_nodes(&world, x_axis_ray(), &[root], PickOptions::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn tie_breaks_by_node_index() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        let first = ball(&mut world, root, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let _second = ball(&mut world, root, Vec3::new(5.0, 0.0, 0.0), 1.0);

        let hits = intersect_nodes(&world, x_axis_ray(), &[root], PickOptions::default());
        assert_eq!(hits[0].node, first);
    }

    #[test]
    fn recursion_reaches_nested_meshes() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        let inner = world
            .spawn_child(root, NodeKind::Group, Transform::identity())
            .expect("group");
        let nested = ball(&mut world, inner, Vec3::new(5.0, 0.0, 0.0), 1.0);

        let flat = PickOptions {
            recursive: false,
            ..PickOptions::default()
        };
        assert!(intersect_nodes(&world, x_axis_ray(), &[inner], flat).is_empty());

        let hits = intersect_nodes(&world, x_axis_ray(), &[inner], PickOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, nested);
    }

    #[test]
    fn parent_rotation_moves_the_target() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        let target = ball(&mut world, root, Vec3::new(5.0, 0.0, 0.0), 0.5);

        // Half turn about Y moves the ball to -X.
        world.transform_mut(root).expect("root").rotation = Euler::new(0.0, PI, 0.0);
        assert!(intersect_nodes(&world, x_axis_ray(), &[root], PickOptions::default()).is_empty());

        let back = Ray::new(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0));
        let hits = intersect_nodes(&world, back, &[root], PickOptions::default());
        assert_eq!(hits[0].node, target);
    }

    #[test]
    fn hidden_nodes_and_lines_are_not_hit() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        let hidden = ball(&mut world, root, Vec3::new(5.0, 0.0, 0.0), 1.0);
        world.node_mut(hidden).expect("node").visible = false;
        world
            .spawn_line(
                root,
                Geometry::line_strip(vec![Vec3::new(3.0, -1.0, 0.0), Vec3::new(3.0, 1.0, 0.0)]),
                Material::basic(Rgb::WHITE),
            )
            .expect("line");

        assert!(intersect_nodes(&world, x_axis_ray(), &[root], PickOptions::default()).is_empty());
    }

    #[test]
    fn triangles_respect_material_side() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        // Counter-clockwise when seen from the origin looking down +X: front faces the ray.
        let tri = Geometry::Triangles {
            vertices: vec![
                Vec3::new(5.0, -1.0, -1.0),
                Vec3::new(5.0, -1.0, 1.0),
                Vec3::new(5.0, 1.0, 0.0),
            ],
            indices: vec![[0, 1, 2]],
        };
        let front = world
            .spawn_mesh(root, tri.clone(), Material::basic(Rgb::WHITE), Transform::identity())
            .expect("mesh");

        let hits = intersect_nodes(&world, x_axis_ray(), &[root], PickOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, front);
        assert_abs_diff_eq!(hits[0].distance, 5.0, epsilon = 1e-12);

        // Seen from behind, a front-only face is culled, a double-sided one is not.
        let behind = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(intersect_nodes(&world, behind, &[root], PickOptions::default()).is_empty());

        let double = world
            .spawn_mesh(
                root,
                tri,
                Material::basic(Rgb::WHITE).double_sided(),
                Transform::translate(Vec3::new(1.0, 0.0, 0.0)),
            )
            .expect("mesh");
        let hits = intersect_nodes(&world, behind, &[root], PickOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, double);
    }

    #[test]
    fn max_distance_limits_hits() {
        let mut world = World::new();
        let root = world.spawn_root(NodeKind::Group, Transform::identity());
        ball(&mut world, root, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let opts = PickOptions {
            max_distance: 3.0,
            ..PickOptions::default()
        };
        assert!(intersect_nodes(&world, x_axis_ray(), &[root], opts).is_empty());
    }
}
