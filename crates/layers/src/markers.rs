use foundation::color::Rgb;
use foundation::math::{GeographicPoint, MARKER_RADIUS};
use scene::components::{Geometry, Material, Transform};
use scene::{NodeId, World};
use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId, dispose_nodes};

/// Marker sphere radius before the global and per-marker scale factors.
pub const MARKER_BASE_RADIUS: f64 = 0.02;
const MARKER_SEGMENTS: u32 = 8;
const DEFAULT_MARKER_OPACITY: f64 = 0.8;

fn default_opacity() -> f64 {
    DEFAULT_MARKER_OPACITY
}

/// A location dot supplied by the host.
///
/// Serialized with the host's field names:
/// `{id, lat, lon, color, size, opacity?, info?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: i64,
    #[serde(flatten)]
    pub position: GeographicPoint,
    pub color: String,
    #[serde(rename = "size")]
    pub size_scale: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(rename = "info", default, skip_serializing_if = "Option::is_none")]
    pub descriptive_text: Option<String>,
}

impl Marker {
    pub fn new(id: i64, latitude: f64, longitude: f64, color: impl Into<String>) -> Self {
        Self {
            id,
            position: GeographicPoint::new(latitude, longitude),
            color: color.into(),
            size_scale: 1.0,
            opacity: DEFAULT_MARKER_OPACITY,
            descriptive_text: None,
        }
    }

    pub fn with_size(mut self, size_scale: f64) -> Self {
        self.size_scale = size_scale;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_info(mut self, text: impl Into<String>) -> Self {
        self.descriptive_text = Some(text.into());
        self
    }

    /// Only markers with non-empty descriptive text react to clicks.
    pub fn is_clickable(&self) -> bool {
        self.descriptive_text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Parsed colour; unparsable strings fall back to white.
    pub fn rgb(&self) -> Rgb {
        self.color.parse().unwrap_or_else(|err| {
            tracing::warn!(
                marker = self.id,
                color = %self.color,
                %err,
                "invalid marker colour, using white"
            );
            Rgb::WHITE
        })
    }

    pub fn radius(&self, multiplier: f64) -> f64 {
        MARKER_BASE_RADIUS * multiplier * self.size_scale
    }
}

/// Keeps one sphere mesh per marker under a parent group.
///
/// Each sync replaces the whole set; the [`Marker`] record rides on its mesh
/// as user data so picking can recover it.
#[derive(Debug)]
pub struct MarkerLayer {
    id: LayerId,
    nodes: Vec<NodeId>,
}

impl MarkerLayer {
    pub fn new(id: u64) -> Self {
        Self {
            id: LayerId(id),
            nodes: Vec::new(),
        }
    }

    /// Dispose every previous marker mesh, then build one per entry of `markers`.
    /// Returns the number of meshes now live.
    pub fn sync(
        &mut self,
        world: &mut World,
        parent: NodeId,
        markers: &[Marker],
        multiplier: f64,
    ) -> usize {
        let disposed = self.clear(world);

        for marker in markers {
            let geometry =
                Geometry::sphere(marker.radius(multiplier), MARKER_SEGMENTS, MARKER_SEGMENTS);
            let material = Material::basic(marker.rgb()).with_opacity(marker.opacity);
            let transform = Transform::translate(marker.position.project(MARKER_RADIUS));
            let Some(node) = world.spawn_mesh(parent, geometry, material, transform) else {
                tracing::debug!("marker parent is gone; sync stopped");
                break;
            };
            world.set_user_data(node, marker.clone());
            self.nodes.push(node);
        }

        tracing::debug!(disposed, live = self.nodes.len(), "markers synced");
        self.nodes.len()
    }

    /// The marker record attached to `node`, if it is one of ours.
    pub fn marker<'w>(&self, world: &'w World, node: NodeId) -> Option<&'w Marker> {
        world.user_data::<Marker>(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Layer for MarkerLayer {
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
