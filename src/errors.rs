//! Error Types
//!
//! This module defines the error types used throughout the rig layer.
//!
//! # Overview
//!
//! The main error type [`RigError`] covers all failure modes including:
//! - Malformed axis spaces rejected at parameter construction
//! - Binding authoring errors (bad cell addresses, payload sizes)
//! - Contract violations detected while evaluating a frame
//! - Malformed keyframe tracks
//! - Persistence (JSON) errors
//!
//! Frame-time errors never abort the whole rig pass: the frame loop logs them,
//! counts them in [`FrameStats`](crate::rig::FrameStats) and moves on to the
//! next binding.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_rig::errors::{RigError, Result};
//!
//! fn build() -> Result<()> {
//!     let axes = AxisSpace::line(vec![0.0, 0.5, 1.0])?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::rig::NodeId;

/// The main error type for the rig layer.
#[derive(Error, Debug)]
pub enum RigError {
    // ========================================================================
    // Axis Errors
    // ========================================================================
    /// Breakpoints are not strictly increasing, or do not span exactly [0, 1].
    #[error("Invalid axis {axis}: {reason}")]
    InvalidAxis {
        /// Axis index (0 = x, 1 = y)
        axis: usize,
        /// What was wrong with the breakpoints
        reason: String,
    },

    /// A parameter must have one or two axes.
    #[error("Unsupported axis count: {0} (expected 1 or 2)")]
    AxisCount(usize),

    /// Axis index outside the parameter's dimensionality.
    #[error("Axis index {axis} out of range for a {dims}-axis parameter")]
    AxisOutOfRange {
        /// Requested axis
        axis: usize,
        /// Number of axes the parameter has
        dims: usize,
    },

    /// Attempted to move or remove a fixed endpoint breakpoint.
    #[error("Breakpoint {index} on axis {axis} is an endpoint and cannot be edited")]
    FixedBreakpoint {
        /// Axis index
        axis: usize,
        /// Breakpoint index
        index: usize,
    },

    // ========================================================================
    // Binding Errors
    // ========================================================================
    /// Cell address outside the binding grid.
    #[error("Cell ({x}, {y}) out of range for a {width}x{height} grid")]
    CellOutOfRange {
        /// Index along axis 0
        x: usize,
        /// Index along axis 1
        y: usize,
        /// Cells along axis 0
        width: usize,
        /// Cells along axis 1
        height: usize,
    },

    /// A deformation payload does not have one entry per target vertex.
    #[error("Deformation payload has {found} vertices, binding expects {expected}")]
    PayloadLength {
        /// Vertex count the binding was sized to
        expected: usize,
        /// Length of the supplied payload
        found: usize,
    },

    /// The scene graph does not expose the requested property on this node.
    #[error("Node {node} has no property `{key}`")]
    UnknownProperty {
        /// Target node
        node: NodeId,
        /// Property key
        key: String,
    },

    /// The parameter key does not refer to a live parameter.
    #[error("Unknown parameter")]
    UnknownParameter,

    /// The binding id does not belong to the parameter.
    #[error("Unknown binding {0}")]
    UnknownBinding(u64),

    /// Binding kinds differ where an operation requires matching kinds.
    #[error("Binding kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Required kind
        expected: &'static str,
        /// Actual kind
        found: &'static str,
    },

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Deformation field and target mesh disagree on vertex count mid-frame.
    #[error("Node {node}: mesh has {mesh} vertices, deformation binding has {binding}")]
    VertexCountMismatch {
        /// Target node
        node: NodeId,
        /// Vertex count reported by the scene graph
        mesh: usize,
        /// Vertex count stored in the binding
        binding: usize,
    },

    /// The target node has no deformable mesh.
    #[error("Node {0} has no deformable mesh")]
    MissingMesh(NodeId),

    // ========================================================================
    // Animation Errors
    // ========================================================================
    /// Keyframe times and values do not form a valid track.
    #[error("Invalid keyframe track: {0}")]
    InvalidTrack(String),

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// JSON parsing or encoding error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, RigError>`.
pub type Result<T> = std::result::Result<T, RigError>;
