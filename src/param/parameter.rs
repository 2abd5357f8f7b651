//! Parameters
//!
//! A [`Parameter`] is a named control line or plane. It owns its
//! [`AxisSpace`], the bindings keyed to it, and a per-frame position.
//!
//! # Frame lifecycle
//!
//! 1. [`begin_frame`](Parameter::begin_frame) resets the position to the base
//!    supplied by the host (e.g. an editor slider).
//! 2. Producers push offsets ([`push_offset`](Parameter::push_offset),
//!    [`push_axis_offset`](Parameter::push_axis_offset)); the position follows
//!    immediately.
//! 3. Every binding resolves at the merged position.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RigError};
use crate::param::axis::AxisSpace;
use crate::param::binding::{Binding, BindingId, BindingTarget};
use crate::param::merge::{MergeMode, PositionOffsets};
use crate::param::values::Deformation;

/// Stable parameter identity, preserved by persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterId(pub u32);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "param({})", self.0)
    }
}

/// Output of one binding at one position.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(f32),
    Deformation(Deformation),
}

/// A named control axis or plane.
#[derive(Debug, Clone)]
pub struct Parameter {
    id: ParameterId,
    name: String,
    axes: AxisSpace,
    min: Vec2,
    max: Vec2,
    base: Vec2,
    position: Vec2,
    offsets: PositionOffsets,
    bindings: Vec<Binding>,
}

impl Parameter {
    /// Creates a parameter over an already validated axis space.
    #[must_use]
    pub fn new(name: impl Into<String>, axes: AxisSpace) -> Self {
        Self {
            id: ParameterId::default(),
            name: name.into(),
            axes,
            min: Vec2::ZERO,
            max: Vec2::ONE,
            base: Vec2::ZERO,
            position: Vec2::ZERO,
            offsets: PositionOffsets::default(),
            bindings: Vec::new(),
        }
    }

    /// A line parameter. Malformed breakpoints are rejected.
    pub fn line(name: impl Into<String>, breakpoints: Vec<f32>) -> Result<Self> {
        Ok(Self::new(name, AxisSpace::line(breakpoints)?))
    }

    /// A plane parameter. Malformed breakpoints are rejected.
    pub fn plane(name: impl Into<String>, x: Vec<f32>, y: Vec<f32>) -> Result<Self> {
        Ok(Self::new(name, AxisSpace::plane(x, y)?))
    }

    // ========================================================================
    // Identity & axes
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> ParameterId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ParameterId) {
        self.id = id;
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    #[must_use]
    pub fn axes(&self) -> &AxisSpace {
        &self.axes
    }

    #[inline]
    #[must_use]
    pub fn is_plane(&self) -> bool {
        self.axes.is_plane()
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis < self.axes.dims() {
            Ok(())
        } else {
            Err(RigError::AxisOutOfRange {
                axis,
                dims: self.axes.dims(),
            })
        }
    }

    /// Inserts a breakpoint; every binding gains an unset slice of cells at
    /// the same index. Returns the new breakpoint's index.
    pub fn insert_breakpoint(&mut self, axis: usize, position: f32) -> Result<usize> {
        self.check_axis(axis)?;
        let index = self
            .axes
            .axis_mut(axis)
            .and_then(|a| a.insert(position))
            .ok_or_else(|| RigError::InvalidAxis {
                axis,
                reason: format!("cannot insert breakpoint at {position}"),
            })?;
        for binding in &mut self.bindings {
            binding.insert_slice(axis, index);
        }
        Ok(index)
    }

    /// Removes an interior breakpoint and the matching slice of every binding.
    pub fn remove_breakpoint(&mut self, axis: usize, index: usize) -> Result<()> {
        self.check_axis(axis)?;
        let len = self.axes.breakpoints(axis).len();
        if index >= len {
            return Err(RigError::InvalidAxis {
                axis,
                reason: format!("no breakpoint at index {index} (axis has {len})"),
            });
        }
        let removed = self.axes.axis_mut(axis).is_some_and(|a| a.remove(index));
        if !removed {
            return Err(RigError::FixedBreakpoint { axis, index });
        }
        for binding in &mut self.bindings {
            binding.remove_slice(axis, index);
        }
        Ok(())
    }

    /// Replaces the axis space. Bindings are resized by truncate/zero-fill;
    /// cells that did not exist before are unset.
    pub fn set_axis_space(&mut self, axes: AxisSpace) {
        let dims = axes.grid_dims();
        if dims != self.axes.grid_dims() {
            log::warn!(
                "Parameter `{}`: grid {:?} -> {:?}, resizing {} bindings",
                self.name,
                self.axes.grid_dims(),
                dims,
                self.bindings.len()
            );
        }
        for binding in &mut self.bindings {
            binding.resize_grid(dims);
            binding.invalidate();
        }
        if !axes.is_plane() {
            self.base.y = 0.0;
            self.position.y = 0.0;
        }
        self.axes = axes;
    }

    /// Index of the breakpoint cell nearest to `position`.
    #[must_use]
    pub fn closest_keypoint(&self, position: Vec2) -> [usize; 2] {
        let x = self.axes.axis(0).map_or(0, |a| a.closest(position.x));
        let y = self.axes.axis(1).map_or(0, |a| a.closest(position.y));
        [x, y]
    }

    /// Normalized position of a breakpoint cell.
    #[must_use]
    pub fn keypoint_position(&self, [x, y]: [usize; 2]) -> Option<Vec2> {
        let px = *self.axes.breakpoints(0).get(x)?;
        let py = *self.axes.breakpoints(1).get(y)?;
        Some(Vec2::new(px, py))
    }

    // ========================================================================
    // Value range
    // ========================================================================

    /// User-facing range per axis; positions stay normalized internally.
    #[must_use]
    pub fn range(&self) -> (Vec2, Vec2) {
        (self.min, self.max)
    }

    pub fn set_range(&mut self, min: Vec2, max: Vec2) {
        self.min = min;
        self.max = max;
    }

    /// Maps a value in user units to the normalized control space.
    #[must_use]
    pub fn map_value(&self, value: Vec2) -> Vec2 {
        let span = self.max - self.min;
        let mapped = Vec2::new(
            if span.x == 0.0 { 0.0 } else { (value.x - self.min.x) / span.x },
            if span.y == 0.0 { 0.0 } else { (value.y - self.min.y) / span.y },
        );
        mapped.clamp(Vec2::ZERO, Vec2::ONE)
    }

    /// Maps a normalized position back to user units.
    #[must_use]
    pub fn unmap_value(&self, position: Vec2) -> Vec2 {
        self.min + (self.max - self.min) * position
    }

    // ========================================================================
    // Position & offsets
    // ========================================================================

    /// Producer-supplied base position the frame starts from.
    #[inline]
    #[must_use]
    pub fn base(&self) -> Vec2 {
        self.base
    }

    /// Sets the base position (clamped to the unit cube). Offsets already
    /// pushed this frame are re-applied on top of it.
    pub fn set_base(&mut self, base: Vec2) {
        self.base = self.restrict(base.clamp(Vec2::ZERO, Vec2::ONE));
        self.position = self.restrict(self.offsets.apply(self.base));
    }

    /// Current merged position.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Drops last frame's offsets and returns to the base position.
    pub fn begin_frame(&mut self) {
        self.offsets.reset();
        self.position = self.base;
    }

    /// Pushes an offset onto a single axis.
    pub fn push_axis_offset(&mut self, axis: usize, value: f32, mode: MergeMode) -> Result<()> {
        self.check_axis(axis)?;
        self.offsets.push_axis(axis, value, mode);
        self.position = self.restrict(self.offsets.apply(self.base));
        Ok(())
    }

    /// Pushes an offset onto the full position. The y component is ignored
    /// by line parameters.
    pub fn push_offset(&mut self, value: Vec2, mode: MergeMode) {
        self.offsets.push(value, mode);
        self.position = self.restrict(self.offsets.apply(self.base));
    }

    /// Clamps the merged position into the unit cube.
    pub fn clamp_position(&mut self) {
        self.position = self.position.clamp(Vec2::ZERO, Vec2::ONE);
    }

    fn restrict(&self, mut position: Vec2) -> Vec2 {
        if !self.axes.is_plane() {
            position.y = 0.0;
        }
        position
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Bindings in creation order.
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut [Binding] {
        &mut self.bindings
    }

    #[must_use]
    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.id() == id)
    }

    pub fn binding_mut(&mut self, id: BindingId) -> Option<&mut Binding> {
        self.bindings.iter_mut().find(|b| b.id() == id)
    }

    /// The binding driving `target`, if any.
    #[must_use]
    pub fn binding_for(&self, target: &BindingTarget) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.target() == target)
    }

    /// Attaches a binding, resizing it to this parameter's grid if needed.
    pub(crate) fn attach(&mut self, mut binding: Binding) {
        let dims = self.axes.grid_dims();
        if binding.dims() != dims {
            log::warn!(
                "Binding {} on `{}`: grid {:?} does not match axes {:?}, resizing",
                binding.target(),
                self.name,
                binding.dims(),
                dims
            );
            binding.resize_grid(dims);
        }
        self.bindings.push(binding);
    }

    pub(crate) fn detach(&mut self, id: BindingId) -> Option<Binding> {
        let index = self.bindings.iter().position(|b| b.id() == id)?;
        Some(self.bindings.remove(index))
    }

    /// Removes every binding matching `f`, returning their ids.
    pub(crate) fn detach_where(&mut self, mut f: impl FnMut(&Binding) -> bool) -> Vec<BindingId> {
        let mut removed = Vec::new();
        self.bindings.retain(|b| {
            if f(b) {
                removed.push(b.id());
                false
            } else {
                true
            }
        });
        removed
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Resolves one binding at an arbitrary position.
    #[must_use]
    pub fn sample(&self, binding: &Binding, position: Vec2) -> Resolved {
        self.sample_tracked(binding, position).0
    }

    /// Resolves one binding, also reporting whether its dense grid had to be
    /// rebuilt.
    pub(crate) fn sample_tracked(&self, binding: &Binding, position: Vec2) -> (Resolved, bool) {
        let position = self.restrict(position);
        match binding {
            Binding::Value(b) => {
                let (value, rebuilt) = b
                    .cells()
                    .with_dense(&self.axes, |dense| dense.sample(&self.axes, position));
                (Resolved::Value(value), rebuilt)
            }
            Binding::Deformation(b) => {
                let (field, rebuilt) = b
                    .cells()
                    .with_dense(&self.axes, |dense| dense.sample(&self.axes, position));
                (Resolved::Deformation(field), rebuilt)
            }
        }
    }

    /// Resolves every binding at `position`, in creation order.
    pub fn resolve_at(&self, position: Vec2) -> impl Iterator<Item = (&Binding, Resolved)> + '_ {
        self.bindings
            .iter()
            .map(move |b| (b, self.sample(b, position)))
    }

    /// Resolves every binding at the current position.
    pub fn resolve(&self) -> impl Iterator<Item = (&Binding, Resolved)> + '_ {
        self.resolve_at(self.position)
    }
}
