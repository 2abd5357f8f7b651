//! Parameter Bindings
//!
//! A binding ties one property of one node to a parameter. It owns the
//! authored grid (sized to the parameter's axis space) and a lazily rebuilt
//! dense copy used for sampling.
//!
//! Binding kinds form a closed set, so they are a plain enum:
//!
//! - [`ValueBinding`]: one scalar per cell (transform offsets, opacity, tint…)
//! - [`DeformationBinding`]: one per-vertex displacement field per cell
//!
//! # Cache
//!
//! The dense grid sits behind a `parking_lot::RwLock`. Resolves of a fresh
//! cache share the read lock. A stale cache is taken through the upgradable
//! read lock, then upgraded to the writer and rebuilt in place, so two
//! resolves can never rebuild the same grid concurrently.
//! Authoring goes through `&mut self` and simply drops the cache.

use std::fmt;

use glam::Vec2;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::errors::{Result, RigError};
use crate::param::axis::AxisSpace;
use crate::param::grid::{DenseGrid, Grid};
use crate::param::merge::MergeMode;
use crate::param::reconstruct::GridReconstructor;
use crate::param::values::{Deformation, Interpolatable};
use crate::rig::NodeId;

/// Property key used by deformation bindings.
pub const DEFORM_KEY: &str = "deform";

/// Rig-unique binding identity. Ids grow monotonically, so their order is the
/// order in which bindings were created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(pub(crate) u64);

impl BindingId {
    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The node property a binding drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingTarget {
    pub node: NodeId,
    pub key: String,
}

impl BindingTarget {
    #[must_use]
    pub fn new(node: NodeId, key: impl Into<String>) -> Self {
        Self {
            node,
            key: key.into(),
        }
    }
}

impl fmt::Display for BindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.key)
    }
}

// ============================================================================
// Cell storage shared by both kinds
// ============================================================================

/// Authored grid plus its dense cache.
#[derive(Debug)]
pub struct BindingGrid<T> {
    grid: Grid<T>,
    fill: T,
    dense: RwLock<Option<DenseGrid<T>>>,
}

impl<T: Interpolatable> Clone for BindingGrid<T> {
    fn clone(&self) -> Self {
        Self {
            grid: self.grid.clone(),
            fill: self.fill.clone(),
            dense: RwLock::new(None),
        }
    }
}

impl<T: Interpolatable> BindingGrid<T> {
    fn new(dims: [usize; 2], fill: T) -> Self {
        Self {
            grid: Grid::new(dims, &fill),
            fill,
            dense: RwLock::new(None),
        }
    }

    #[inline]
    fn invalidate(&mut self) {
        *self.dense.get_mut() = None;
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> &Grid<T> {
        &self.grid
    }

    /// Value that unset cells carry and that an empty grid resolves to.
    #[inline]
    #[must_use]
    pub fn fill(&self) -> &T {
        &self.fill
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.dense.read().is_none()
    }

    fn set(&mut self, x: usize, y: usize, value: T) -> Result<()> {
        self.grid.set(x, y, value)?;
        self.invalidate();
        Ok(())
    }

    fn unset(&mut self, x: usize, y: usize) -> Result<()> {
        self.grid.unset(x, y, &self.fill)?;
        self.invalidate();
        Ok(())
    }

    fn clear(&mut self) {
        self.grid.clear(&self.fill);
        self.invalidate();
    }

    fn resize(&mut self, dims: [usize; 2]) {
        if self.grid.dims() != dims {
            self.grid.resize(dims, &self.fill);
            self.invalidate();
        }
    }

    fn insert_slice(&mut self, axis: usize, index: usize) {
        self.grid.insert_slice(axis, index, &self.fill);
        self.invalidate();
    }

    fn remove_slice(&mut self, axis: usize, index: usize) {
        self.grid.remove_slice(axis, index);
        self.invalidate();
    }

    fn reverse(&mut self, axis: usize) {
        self.grid.reverse(axis);
        self.invalidate();
    }

    fn swap(&mut self, a: [usize; 2], b: [usize; 2]) -> Result<()> {
        self.grid.swap(a, b)?;
        self.invalidate();
        Ok(())
    }

    fn copy_cell(&mut self, from: [usize; 2], to: [usize; 2]) -> Result<()> {
        let [width, height] = self.grid.dims();
        if self.grid.get(from[0], from[1]).is_none() {
            return Err(RigError::CellOutOfRange {
                x: from[0],
                y: from[1],
                width,
                height,
            });
        }
        match self.grid.explicit_value(from[0], from[1]).cloned() {
            Some(value) => self.set(to[0], to[1], value),
            None => self.unset(to[0], to[1]),
        }
    }

    /// Runs `f` on the dense grid, rebuilding it first if stale.
    ///
    /// Returns whether a rebuild happened.
    pub(crate) fn with_dense<R>(
        &self,
        axes: &AxisSpace,
        f: impl FnOnce(&DenseGrid<T>) -> R,
    ) -> (R, bool) {
        {
            let reader = self.dense.read();
            if let Some(dense) = reader.as_ref() {
                return (f(dense), false);
            }
        }

        // Only one upgradable guard exists at a time, so a racing resolve
        // finds the cache already built here.
        let guard = self.dense.upgradable_read();
        if let Some(dense) = guard.as_ref() {
            return (f(dense), false);
        }

        let mut writer = RwLockUpgradableReadGuard::upgrade(guard);
        let rebuilt = GridReconstructor::reconstruct(&self.grid, axes, &self.fill);
        log::debug!(
            "Rebuilt dense grid {:?} ({} explicit cells)",
            rebuilt.dims(),
            self.grid.explicit_count()
        );
        let dense = writer.insert(rebuilt);
        (f(dense), true)
    }

    /// A copy of the dense grid.
    #[must_use]
    pub fn dense(&self, axes: &AxisSpace) -> DenseGrid<T> {
        self.with_dense(axes, Clone::clone).0
    }

    /// Samples the dense grid at a continuous position.
    #[must_use]
    pub fn sample(&self, axes: &AxisSpace, position: Vec2) -> T {
        self.with_dense(axes, |dense| dense.sample(axes, position)).0
    }
}

// ============================================================================
// Binding kinds
// ============================================================================

/// Scalar binding: one `f32` per cell.
#[derive(Debug, Clone)]
pub struct ValueBinding {
    id: BindingId,
    target: BindingTarget,
    mode: MergeMode,
    cells: BindingGrid<f32>,
}

impl ValueBinding {
    #[must_use]
    pub fn new(id: BindingId, target: BindingTarget, mode: MergeMode, dims: [usize; 2]) -> Self {
        Self {
            id,
            target,
            mode,
            cells: BindingGrid::new(dims, 0.0),
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &BindingTarget {
        &self.target
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &BindingGrid<f32> {
        &self.cells
    }

    /// Authors the value of cell `(x, y)`.
    pub fn set_value(&mut self, x: usize, y: usize, value: f32) -> Result<()> {
        self.cells.set(x, y, value)
    }

    /// Authored value of cell `(x, y)`, if any.
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> Option<f32> {
        self.cells.grid.explicit_value(x, y).copied()
    }

    /// Interpolated value at a continuous position.
    #[must_use]
    pub fn resolve(&self, axes: &AxisSpace, position: Vec2) -> f32 {
        self.cells.sample(axes, position)
    }
}

/// Mesh deformation binding: one displacement field per cell.
#[derive(Debug, Clone)]
pub struct DeformationBinding {
    id: BindingId,
    target: BindingTarget,
    mode: MergeMode,
    vertex_count: usize,
    cells: BindingGrid<Deformation>,
}

impl DeformationBinding {
    #[must_use]
    pub fn new(
        id: BindingId,
        node: NodeId,
        mode: MergeMode,
        dims: [usize; 2],
        vertex_count: usize,
    ) -> Self {
        Self {
            id,
            target: BindingTarget::new(node, DEFORM_KEY),
            mode,
            vertex_count,
            cells: BindingGrid::new(dims, Deformation::zeroed(vertex_count)),
        }
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &BindingTarget {
        &self.target
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &BindingGrid<Deformation> {
        &self.cells
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Authors the displacement field of cell `(x, y)`.
    ///
    /// The field must have exactly one entry per vertex.
    pub fn set_value(&mut self, x: usize, y: usize, value: Deformation) -> Result<()> {
        if value.vertex_count() != self.vertex_count {
            return Err(RigError::PayloadLength {
                expected: self.vertex_count,
                found: value.vertex_count(),
            });
        }
        self.cells.set(x, y, value)
    }

    /// Authored field of cell `(x, y)`, if any.
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> Option<&Deformation> {
        self.cells.grid.explicit_value(x, y)
    }

    /// Adapts every stored field to a new vertex count (truncate or
    /// zero-pad). Used when the target mesh changed at bind time.
    pub fn resize_vertices(&mut self, vertex_count: usize) {
        if vertex_count == self.vertex_count {
            return;
        }
        log::warn!(
            "Resizing deformation binding {} from {} to {} vertices",
            self.target,
            self.vertex_count,
            vertex_count
        );
        self.vertex_count = vertex_count;
        self.cells.fill.resize(vertex_count);
        self.cells.grid.for_each_value_mut(|d| d.resize(vertex_count));
        self.cells.invalidate();
    }

    /// Interpolated displacement field at a continuous position.
    #[must_use]
    pub fn resolve(&self, axes: &AxisSpace, position: Vec2) -> Deformation {
        self.cells.sample(axes, position)
    }
}

/// A parameter binding of either kind.
#[derive(Debug, Clone)]
pub enum Binding {
    Value(ValueBinding),
    Deformation(DeformationBinding),
}

macro_rules! dispatch {
    ($self:expr, $b:ident => $body:expr) => {
        match $self {
            Binding::Value($b) => $body,
            Binding::Deformation($b) => $body,
        }
    };
}

impl Binding {
    #[inline]
    #[must_use]
    pub fn id(&self) -> BindingId {
        dispatch!(self, b => b.id)
    }

    pub(crate) fn set_id(&mut self, id: BindingId) {
        dispatch!(self, b => b.id = id);
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> &BindingTarget {
        dispatch!(self, b => &b.target)
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> MergeMode {
        dispatch!(self, b => b.mode)
    }

    pub fn set_mode(&mut self, mode: MergeMode) {
        dispatch!(self, b => b.mode = mode);
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Deformation(_) => "deformation",
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&ValueBinding> {
        match self {
            Self::Value(b) => Some(b),
            Self::Deformation(_) => None,
        }
    }

    pub fn as_value_mut(&mut self) -> Option<&mut ValueBinding> {
        match self {
            Self::Value(b) => Some(b),
            Self::Deformation(_) => None,
        }
    }

    #[must_use]
    pub fn as_deformation(&self) -> Option<&DeformationBinding> {
        match self {
            Self::Deformation(b) => Some(b),
            Self::Value(_) => None,
        }
    }

    pub fn as_deformation_mut(&mut self) -> Option<&mut DeformationBinding> {
        match self {
            Self::Deformation(b) => Some(b),
            Self::Value(_) => None,
        }
    }

    #[must_use]
    pub fn dims(&self) -> [usize; 2] {
        dispatch!(self, b => b.cells.grid.dims())
    }

    #[must_use]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        dispatch!(self, b => b.cells.grid.is_set(x, y))
    }

    #[must_use]
    pub fn explicit_count(&self) -> usize {
        dispatch!(self, b => b.cells.grid.explicit_count())
    }

    /// Whether the dense cache must be rebuilt before the next resolve.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        dispatch!(self, b => b.cells.is_stale())
    }

    pub fn unset(&mut self, x: usize, y: usize) -> Result<()> {
        dispatch!(self, b => b.cells.unset(x, y))
    }

    /// Unsets every cell.
    pub fn clear(&mut self) {
        dispatch!(self, b => b.cells.clear());
    }

    /// Mirrors the authored data along `axis` (0 = x, 1 = y).
    pub fn reverse_axis(&mut self, axis: usize) -> Result<()> {
        let dims = if self.dims()[1] > 1 { 2 } else { 1 };
        if axis >= dims {
            return Err(RigError::AxisOutOfRange { axis, dims });
        }
        dispatch!(self, b => b.cells.reverse(axis));
        Ok(())
    }

    /// Copies cell `from` onto cell `to`, including an unset state.
    pub fn copy_cell(&mut self, from: [usize; 2], to: [usize; 2]) -> Result<()> {
        dispatch!(self, b => b.cells.copy_cell(from, to))
    }

    pub fn swap_cells(&mut self, a: [usize; 2], b: [usize; 2]) -> Result<()> {
        dispatch!(self, binding => binding.cells.swap(a, b))
    }

    pub(crate) fn resize_grid(&mut self, dims: [usize; 2]) {
        dispatch!(self, b => b.cells.resize(dims));
    }

    pub(crate) fn insert_slice(&mut self, axis: usize, index: usize) {
        dispatch!(self, b => b.cells.insert_slice(axis, index));
    }

    pub(crate) fn remove_slice(&mut self, axis: usize, index: usize) {
        dispatch!(self, b => b.cells.remove_slice(axis, index));
    }

    /// Drops the dense cache so the next resolve rebuilds it.
    pub fn invalidate(&mut self) {
        dispatch!(self, b => b.cells.invalidate());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_grid() -> (AxisSpace, BindingGrid<f32>) {
        let axes = AxisSpace::line(vec![0.0, 0.5, 1.0]).unwrap();
        let mut cells = BindingGrid::new(axes.grid_dims(), 0.0);
        cells.set(0, 0, 2.0).unwrap();
        (axes, cells)
    }

    #[test]
    fn test_fresh_cache_resolves_next_to_upgradable_guard() {
        let (axes, cells) = constant_grid();
        assert_eq!(cells.with_dense(&axes, |d| d.values().len()), (3, true));

        // A pending rebuilder elsewhere must not block readers of a fresh cache.
        let _rebuilder = cells.dense.upgradable_read();
        let (value, rebuilt) = cells.with_dense(&axes, |d| d.sample(&axes, Vec2::new(0.75, 0.0)));
        assert_eq!(value, 2.0);
        assert!(!rebuilt);
    }

    #[test]
    fn test_stale_cache_rebuilds_once() {
        let (axes, mut cells) = constant_grid();
        assert!(cells.is_stale());
        assert!(cells.with_dense(&axes, |_| ()).1);
        assert!(!cells.with_dense(&axes, |_| ()).1);

        cells.set(2, 0, 4.0).unwrap();
        assert!(cells.is_stale());
        let (value, rebuilt) = cells.with_dense(&axes, |d| *d.get(1, 0).unwrap());
        assert!(rebuilt);
        assert_eq!(value, 3.0);
    }
}
