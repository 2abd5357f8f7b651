//! In-memory [`PropertyTarget`] for headless evaluation, tools and tests.

use glam::Vec2;
use rustc_hash::FxHashMap;

use crate::rig::target::{NodeId, PropertyTarget};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    default: f32,
    offset: f32,
}

/// A flat table of node properties and mesh displacement buffers.
///
/// ```rust,ignore
/// let mut sheet = PropertySheet::new();
/// sheet.add_property(head, "transform.t.x", 0.0);
/// sheet.add_property(head, "opacity", 1.0);
/// sheet.add_mesh(head, 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertySheet {
    properties: FxHashMap<NodeId, FxHashMap<String, Slot>>,
    meshes: FxHashMap<NodeId, Vec<Vec2>>,
}

impl PropertySheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a property; its offset starts at `default`.
    pub fn add_property(&mut self, node: NodeId, key: &str, default: f32) {
        self.properties.entry(node).or_default().insert(
            key.to_owned(),
            Slot {
                default,
                offset: default,
            },
        );
    }

    /// Declares a deformable mesh with `vertex_count` vertices.
    pub fn add_mesh(&mut self, node: NodeId, vertex_count: usize) {
        self.meshes.insert(node, vec![Vec2::ZERO; vertex_count]);
    }

    /// Changes the vertex count of an existing mesh (re-topology).
    pub fn resize_mesh(&mut self, node: NodeId, vertex_count: usize) {
        if let Some(mesh) = self.meshes.get_mut(&node) {
            mesh.resize(vertex_count, Vec2::ZERO);
        }
    }

    /// Drops every property and the mesh of `node`.
    pub fn remove_node(&mut self, node: NodeId) {
        self.properties.remove(&node);
        self.meshes.remove(&node);
    }

    /// Current displacement buffer of a mesh.
    #[must_use]
    pub fn deformation(&self, node: NodeId) -> Option<&[Vec2]> {
        self.meshes.get(&node).map(Vec::as_slice)
    }

    fn slot(&self, node: NodeId, key: &str) -> Option<&Slot> {
        self.properties.get(&node)?.get(key)
    }

    fn slot_mut(&mut self, node: NodeId, key: &str) -> Option<&mut Slot> {
        self.properties.get_mut(&node)?.get_mut(key)
    }
}

impl PropertyTarget for PropertySheet {
    fn has_property(&self, node: NodeId, key: &str) -> bool {
        self.slot(node, key).is_some()
    }

    fn default_value(&self, node: NodeId, key: &str) -> f32 {
        self.slot(node, key).map_or(0.0, |s| s.default)
    }

    fn offset(&self, node: NodeId, key: &str) -> Option<f32> {
        self.slot(node, key).map(|s| s.offset)
    }

    fn set_offset(&mut self, node: NodeId, key: &str, value: f32) {
        if let Some(slot) = self.slot_mut(node, key) {
            slot.offset = value;
        }
    }

    fn vertex_count(&self, node: NodeId) -> Option<usize> {
        self.meshes.get(&node).map(Vec::len)
    }

    fn deformation_mut(&mut self, node: NodeId) -> Option<&mut [Vec2]> {
        self.meshes.get_mut(&node).map(Vec::as_mut_slice)
    }
}
