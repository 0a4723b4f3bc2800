use std::any::Any;
use std::fmt;

use foundation::handles::Handle;

use crate::components::{NodeKind, Transform};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub Handle);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

/// A scene-graph node: a group, mesh, line or light with a local transform.
pub struct Node {
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) user_data: Option<Box<dyn Any>>,
}

impl Node {
    pub fn new(kind: NodeKind, transform: Transform) -> Self {
        Self {
            kind,
            transform,
            visible: true,
            parent: None,
            children: Vec::new(),
            user_data: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Metadata attached by the layer that owns this node.
    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("transform", &self.transform)
            .field("visible", &self.visible)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("has_user_data", &self.user_data.is_some())
            .finish()
    }
}
