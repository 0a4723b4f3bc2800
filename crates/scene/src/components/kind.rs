use foundation::color::Rgb;

use super::{GeometryId, MaterialId};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeKind {
    /// Transform-only container.
    Group,
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
    Line {
        geometry: GeometryId,
        material: MaterialId,
    },
    AmbientLight {
        color: Rgb,
        intensity: f64,
    },
}

impl NodeKind {
    /// GPU-side resources referenced by this node, if any.
    pub fn resources(&self) -> Option<(GeometryId, MaterialId)> {
        match *self {
            NodeKind::Mesh { geometry, material } | NodeKind::Line { geometry, material } => {
                Some((geometry, material))
            }
            NodeKind::Group | NodeKind::AmbientLight { .. } => None,
        }
    }
}
