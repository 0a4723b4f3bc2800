//! Landmass outlines and fills built from boundary data.
//!
//! Every ring with at least three vertices becomes a closed polyline at
//! [`OUTLINE_RADIUS`]. The first ring of each polygon (the outer boundary) is
//! also filled: it is flattened into the `(theta, phi)` angular plane,
//! triangulated there, and lifted back onto the sphere at [`FILL_RADIUS`] so
//! the fill sits just beneath its outline. Holes only get outlines.

use earcutr::earcut;
use formats::BoundaryCollection;
use foundation::color::Rgb;
use foundation::math::{FILL_RADIUS, GeographicPoint, OUTLINE_RADIUS, Vec2, angular, from_angular};
use scene::components::{Geometry, Material, Transform};
use scene::{NodeId, World};

use crate::layer::{Layer, LayerId, dispose_nodes};

const OUTLINE_OPACITY: f64 = 0.85;
const FILL_COLOR: Rgb = Rgb::from_hex(0x0a0a0a);
const FILL_OPACITY: f64 = 0.9;

/// What one [`OutlineLayer::draw`] call added to the scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct OutlineStats {
    pub outlines: usize,
    pub fills: usize,
    pub skipped_rings: usize,
}

#[derive(Debug)]
pub struct OutlineLayer {
    id: LayerId,
    nodes: Vec<NodeId>,
}

impl OutlineLayer {
    pub fn new(id: u64) -> Self {
        Self {
            id: LayerId(id),
            nodes: Vec::new(),
        }
    }

    /// Append outline and fill nodes for every feature under `parent`.
    ///
    /// Never removes what an earlier call drew. A missing `parent` draws nothing.
    pub fn draw(
        &mut self,
        world: &mut World,
        parent: NodeId,
        boundaries: &BoundaryCollection,
    ) -> OutlineStats {
        let mut stats = OutlineStats::default();
        if !world.contains(parent) {
            tracing::debug!("outline parent is gone; nothing drawn");
            return stats;
        }

        let outline_material = Material::basic(Rgb::WHITE).with_opacity(OUTLINE_OPACITY);
        let fill_material = Material::basic(FILL_COLOR)
            .with_opacity(FILL_OPACITY)
            .without_depth_write()
            .double_sided();

        for feature in &boundaries.features {
            for polygon in &feature.polygons {
                for (ring_index, ring) in polygon.iter().enumerate() {
                    if ring.len() < 3 {
                        stats.skipped_rings += 1;
                        continue;
                    }

                    let loop_points = open_ring(ring)
                        .iter()
                        .map(|p| p.project(OUTLINE_RADIUS))
                        .collect();
                    if let Some(node) =
                        world.spawn_line(parent, Geometry::line_loop(loop_points), outline_material)
                    {
                        self.nodes.push(node);
                        stats.outlines += 1;
                    }

                    if ring_index != 0 {
                        continue;
                    }
                    let Some(fill) = fill_geometry(ring) else {
                        tracing::debug!(
                            feature = ?feature.name,
                            "outer ring could not be triangulated"
                        );
                        continue;
                    };
                    if let Some(node) =
                        world.spawn_mesh(parent, fill, fill_material, Transform::identity())
                    {
                        self.nodes.push(node);
                        stats.fills += 1;
                    }
                }
            }
        }

        tracing::debug!(
            outlines = stats.outlines,
            fills = stats.fills,
            skipped = stats.skipped_rings,
            "boundary outlines drawn"
        );
        stats
    }
}

impl Layer for OutlineLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn clear(&mut self, world: &mut World) -> usize {
        dispose_nodes(world, &mut self.nodes)
    }
}

/// The ring without its closing vertex, if it repeats the first one.
fn open_ring(ring: &[GeographicPoint]) -> &[GeographicPoint] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() >= 2 && same_point(*first, *last) => {
            &ring[..ring.len() - 1]
        }
        _ => ring,
    }
}

fn same_point(a: GeographicPoint, b: GeographicPoint) -> bool {
    (a.latitude - b.latitude).abs() < 1e-9 && (a.longitude - b.longitude).abs() < 1e-9
}

/// Triangulated surface for an outer ring, or `None` when earcut finds no area.
fn fill_geometry(ring: &[GeographicPoint]) -> Option<Geometry> {
    let flat: Vec<Vec2> = open_ring(ring)
        .iter()
        .map(|p| angular(p.latitude, p.longitude))
        .collect();
    if flat.len() < 3 {
        return None;
    }

    let coords: Vec<f64> = flat.iter().flat_map(|v| [v.x, v.y]).collect();
    let indices = earcut(&coords, &[], 2).ok()?;
    if indices.len() < 3 {
        return None;
    }

    let vertices = flat.iter().map(|v| from_angular(*v, FILL_RADIUS)).collect();
    let triangles = indices
        .chunks_exact(3)
        .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
        .collect();
    Some(Geometry::Triangles {
        vertices,
        indices: triangles,
    })
}
