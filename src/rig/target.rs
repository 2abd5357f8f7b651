//! Scene-graph boundary.
//!
//! The rig never looks inside nodes. Everything it needs from the scene graph
//! goes through [`PropertyTarget`], a small string-keyed capability interface.
//! Keys such as `"transform.t.x"`, `"opacity"` or `"tint.r"` exist only at this
//! boundary; the grid engine works on resolved payloads.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identity of a node in the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node({})", self.0)
    }
}

/// Read/write access to node properties, implemented by the host.
pub trait PropertyTarget {
    /// Whether `node` exposes a property named `key`.
    fn has_property(&self, node: NodeId, key: &str) -> bool;

    /// Neutral offset value for `key` (e.g. 0 for translation, 1 for opacity).
    fn default_value(&self, node: NodeId, key: &str) -> f32;

    /// Current offset of `key`, or `None` if the property does not exist.
    fn offset(&self, node: NodeId, key: &str) -> Option<f32>;

    /// Writes the offset of `key`. Unknown properties are ignored.
    fn set_offset(&mut self, node: NodeId, key: &str, value: f32);

    /// Vertex count of the node's deformable mesh, if it has one.
    fn vertex_count(&self, node: NodeId) -> Option<usize>;

    /// Mutable per-vertex displacement buffer of the node's mesh.
    fn deformation_mut(&mut self, node: NodeId) -> Option<&mut [Vec2]>;

    /// Resets the displacement buffer to zero.
    fn reset_deformation(&mut self, node: NodeId) {
        if let Some(field) = self.deformation_mut(node) {
            field.fill(Vec2::ZERO);
        }
    }
}
