use std::any::Any;

use foundation::math::{Quat, Vec3};

use crate::components::{Geometry, GeometryId, Material, MaterialId, NodeKind, Transform};
use crate::node::{Node, NodeId};
use crate::pool::Pool;

/// Retained scene graph plus the geometry/material resources its nodes use.
///
/// Removing a node does not release the resources it references; owners call
/// [`World::dispose_geometry`] / [`World::dispose_material`] explicitly, and
/// the live counts make leaks observable.
#[derive(Debug, Default)]
pub struct World {
    nodes: Pool<Node>,
    roots: Vec<NodeId>,
    geometries: Pool<Geometry>,
    materials: Pool<Material>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        GeometryId(self.geometries.insert(geometry))
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id.0)
    }

    /// Returns `false` if the geometry was already disposed.
    pub fn dispose_geometry(&mut self, id: GeometryId) -> bool {
        self.geometries.remove(id.0).is_some()
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        MaterialId(self.materials.insert(material))
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn dispose_material(&mut self, id: MaterialId) -> bool {
        self.materials.remove(id.0).is_some()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    /// Spawn a node directly under the scene root.
    pub fn spawn_root(&mut self, kind: NodeKind, transform: Transform) -> NodeId {
        let id = NodeId(self.nodes.insert(Node::new(kind, transform)));
        self.roots.push(id);
        id
    }

    /// Spawn a node under `parent`; `None` if the parent no longer exists.
    pub fn spawn_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        transform: Transform,
    ) -> Option<NodeId> {
        if !self.nodes.contains(parent.0) {
            return None;
        }
        let mut node = Node::new(kind, transform);
        node.parent = Some(parent);
        let id = NodeId(self.nodes.insert(node));
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        Some(id)
    }

    /// Mesh node with freshly registered geometry and material.
    pub fn spawn_mesh(
        &mut self,
        parent: NodeId,
        geometry: Geometry,
        material: Material,
        transform: Transform,
    ) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        let geometry = self.add_geometry(geometry);
        let material = self.add_material(material);
        self.spawn_child(parent, NodeKind::Mesh { geometry, material }, transform)
    }

    pub fn spawn_line(
        &mut self,
        parent: NodeId,
        geometry: Geometry,
        material: Material,
    ) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        let geometry = self.add_geometry(geometry);
        let material = self.add_material(material);
        self.spawn_child(
            parent,
            NodeKind::Line { geometry, material },
            Transform::identity(),
        )
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.nodes.get_mut(id.0).map(|n| &mut n.transform)
    }

    pub fn set_user_data<T: Any>(&mut self, id: NodeId, data: T) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.user_data = Some(Box::new(data));
                true
            }
            None => false,
        }
    }

    pub fn user_data<T: Any>(&self, id: NodeId) -> Option<&T> {
        self.node(id).and_then(|n| n.user_data::<T>())
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children()).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Detach `id` from its parent and delete it with its whole subtree.
    ///
    /// Returns the number of nodes deleted (0 if `id` was already gone).
    pub fn remove(&mut self, id: NodeId) -> usize {
        let Some(parent) = self.nodes.get(id.0).map(|n| n.parent) else {
            return 0;
        };
        match parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent.0) {
                    p.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next.0) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    /// `root` and all of its descendants in depth-first pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Whether `id` and every ancestor is visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            let Some(node) = self.node(c) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Map a point in `id`'s local space to world space.
    pub fn local_to_world(&self, id: NodeId, local: Vec3) -> Option<Vec3> {
        let mut point = local;
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c)?;
            point = node.transform.apply(point);
            current = node.parent;
        }
        Some(point)
    }

    /// Accumulated rotation from `id` up to the scene root.
    pub fn world_rotation(&self, id: NodeId) -> Option<Quat> {
        let mut rotation = Quat::IDENTITY;
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c)?;
            rotation = node.transform.rotation.to_quat().mul(rotation);
            current = node.parent;
        }
        Some(rotation)
    }

    /// Accumulated uniform scale from `id` up to the scene root.
    pub fn world_scale(&self, id: NodeId) -> Option<f64> {
        let mut scale = 1.0;
        let mut current = Some(id);
        while let Some(c) = current {
            let node = self.node(c)?;
            scale *= node.transform.scale;
            current = node.parent;
        }
        Some(scale)
    }
}
