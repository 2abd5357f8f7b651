use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Payloads that can live in a binding grid.
///
/// Reconstruction and sampling only ever form affine combinations of cells,
/// so two operations are enough: linear interpolation and parallelogram
/// completion.
pub trait Interpolatable: Clone {
    /// `start * (1 - t) + end * t`. Exact at `t == 0` and `t == 1`.
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self;

    /// `adjacent_a + adjacent_b - shared`: the fourth corner of the
    /// parallelogram spanned from `shared`.
    fn complete_parallelogram(adjacent_a: &Self, adjacent_b: &Self, shared: &Self) -> Self;
}

impl Interpolatable for f32 {
    #[inline]
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        start * (1.0 - t) + end * t
    }

    #[inline]
    fn complete_parallelogram(adjacent_a: &Self, adjacent_b: &Self, shared: &Self) -> Self {
        adjacent_a + adjacent_b - shared
    }
}

impl Interpolatable for Vec2 {
    #[inline]
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        *start * (1.0 - t) + *end * t
    }

    #[inline]
    fn complete_parallelogram(adjacent_a: &Self, adjacent_b: &Self, shared: &Self) -> Self {
        *adjacent_a + *adjacent_b - *shared
    }
}

/// Per-vertex 2D displacement field of a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deformation {
    pub offsets: Vec<Vec2>,
}

impl Deformation {
    /// A zero displacement for `vertex_count` vertices.
    #[must_use]
    pub fn zeroed(vertex_count: usize) -> Self {
        Self {
            offsets: vec![Vec2::ZERO; vertex_count],
        }
    }

    #[must_use]
    pub fn from_offsets(offsets: Vec<Vec2>) -> Self {
        Self { offsets }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.offsets.len()
    }

    /// Truncates or zero-pads to `vertex_count` entries.
    pub fn resize(&mut self, vertex_count: usize) {
        self.offsets.resize(vertex_count, Vec2::ZERO);
    }
}

impl Interpolatable for Deformation {
    fn interpolate_linear(start: &Self, end: &Self, t: f32) -> Self {
        let offsets = start
            .offsets
            .iter()
            .zip(&end.offsets)
            .map(|(a, b)| Vec2::interpolate_linear(a, b, t))
            .collect();
        Self { offsets }
    }

    fn complete_parallelogram(adjacent_a: &Self, adjacent_b: &Self, shared: &Self) -> Self {
        let offsets = adjacent_a
            .offsets
            .iter()
            .zip(&adjacent_b.offsets)
            .zip(&shared.offsets)
            .map(|((a, b), s)| *a + *b - *s)
            .collect();
        Self { offsets }
    }
}
