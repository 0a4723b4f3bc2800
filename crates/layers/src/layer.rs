use scene::{NodeId, World};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// A set of scene nodes built and owned by one producer.
pub trait Layer {
    fn id(&self) -> LayerId;

    fn nodes(&self) -> &[NodeId];

    /// Remove every node this layer spawned and release its geometry and material.
    fn clear(&mut self, world: &mut World) -> usize;
}

/// Remove `nodes` from `world`, disposing each one's resources first.
/// Returns the number of nodes removed.
pub(crate) fn dispose_nodes(world: &mut World, nodes: &mut Vec<NodeId>) -> usize {
    let mut removed = 0;
    for node in nodes.drain(..) {
        let Some(kind) = world.node(node).map(|n| n.kind) else {
            continue;
        };
        if let Some((geometry, material)) = kind.resources() {
            world.dispose_geometry(geometry);
            world.dispose_material(material);
        }
        removed += world.remove(node);
    }
    removed
}
