//! Axis Spaces
//!
//! An [`AxisSpace`] describes the control space of a parameter: one axis for a
//! line parameter, two for a plane. Each axis is a strictly increasing list of
//! breakpoints starting at 0 and ending at 1. Grid cells exist at every
//! breakpoint (one per breakpoint per axis).
//!
//! Addressing a continuous coordinate yields an [`AxisLookup`]: the index of
//! the enclosing segment and the local factor inside it.

use smallvec::SmallVec;

use crate::errors::{Result, RigError};

/// Placeholder breakpoints for the missing second axis of a line parameter.
const COLLAPSED_AXIS: [f32; 1] = [0.0];

/// Position of a continuous coordinate relative to an axis' breakpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLookup {
    /// Index of the lower breakpoint of the enclosing segment.
    pub index: usize,
    /// Local factor in `[0, 1]` between `index` and `index + 1`.
    pub t: f32,
}

/// A single validated axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    breakpoints: Vec<f32>,
}

impl Axis {
    /// Validates and wraps a breakpoint list.
    ///
    /// `axis` is only used to label the error.
    pub fn new(axis: usize, breakpoints: Vec<f32>) -> Result<Self> {
        let invalid = |reason: String| RigError::InvalidAxis { axis, reason };

        if breakpoints.len() < 2 {
            return Err(invalid(format!(
                "needs at least 2 breakpoints, got {}",
                breakpoints.len()
            )));
        }
        if let Some(bad) = breakpoints.iter().find(|b| !b.is_finite()) {
            return Err(invalid(format!("non-finite breakpoint {bad}")));
        }
        if breakpoints[0] != 0.0 {
            return Err(invalid(format!("first breakpoint is {}, not 0", breakpoints[0])));
        }
        let last = breakpoints[breakpoints.len() - 1];
        if last != 1.0 {
            return Err(invalid(format!("last breakpoint is {last}, not 1")));
        }
        if let Some(i) = breakpoints.windows(2).position(|w| w[0] >= w[1]) {
            return Err(invalid(format!(
                "breakpoints not strictly increasing at index {}: {} >= {}",
                i + 1,
                breakpoints[i],
                breakpoints[i + 1]
            )));
        }

        Ok(Self { breakpoints })
    }

    /// Evenly spaced axis with `count` breakpoints (`count >= 2`).
    pub fn uniform(axis: usize, count: usize) -> Result<Self> {
        if count < 2 {
            return Self::new(axis, vec![0.0; count]);
        }
        let last = (count - 1) as f32;
        let mut breakpoints: Vec<f32> = (0..count).map(|i| i as f32 / last).collect();
        // Guard the endpoint against rounding.
        breakpoints[count - 1] = 1.0;
        Self::new(axis, breakpoints)
    }

    #[inline]
    #[must_use]
    pub fn breakpoints(&self) -> &[f32] {
        &self.breakpoints
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Always `false`: a valid axis holds at least two breakpoints.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Locates a continuous coordinate on this axis.
    #[inline]
    #[must_use]
    pub fn locate(&self, c: f32) -> AxisLookup {
        locate(&self.breakpoints, c)
    }

    /// Index of the breakpoint nearest to `c`.
    #[must_use]
    pub fn closest(&self, c: f32) -> usize {
        let lookup = self.locate(c);
        if lookup.t > 0.5 && lookup.index + 1 < self.len() {
            lookup.index + 1
        } else {
            lookup.index
        }
    }

    pub(crate) fn insert(&mut self, position: f32) -> Option<usize> {
        if !(position > 0.0 && position < 1.0) {
            return None;
        }
        let index = self.breakpoints.partition_point(|&b| b < position);
        if self.breakpoints[index] == position {
            return None;
        }
        self.breakpoints.insert(index, position);
        Some(index)
    }

    pub(crate) fn remove(&mut self, index: usize) -> bool {
        if index == 0 || index + 1 >= self.len() {
            return false;
        }
        self.breakpoints.remove(index);
        true
    }
}

/// The 1- or 2-axis control space of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpace {
    axes: SmallVec<[Axis; 2]>,
}

impl AxisSpace {
    /// Builds a space from raw breakpoint lists, validating every axis.
    pub fn new(axes: Vec<Vec<f32>>) -> Result<Self> {
        if axes.is_empty() || axes.len() > 2 {
            return Err(RigError::AxisCount(axes.len()));
        }
        let axes = axes
            .into_iter()
            .enumerate()
            .map(|(i, points)| Axis::new(i, points))
            .collect::<Result<SmallVec<[Axis; 2]>>>()?;
        Ok(Self { axes })
    }

    /// A one-axis (line) space.
    pub fn line(breakpoints: Vec<f32>) -> Result<Self> {
        Self::new(vec![breakpoints])
    }

    /// A two-axis (plane) space.
    pub fn plane(x: Vec<f32>, y: Vec<f32>) -> Result<Self> {
        Self::new(vec![x, y])
    }

    /// Evenly spaced space with `counts[i]` breakpoints on axis `i`.
    pub fn uniform(counts: &[usize]) -> Result<Self> {
        if counts.is_empty() || counts.len() > 2 {
            return Err(RigError::AxisCount(counts.len()));
        }
        let axes = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| Axis::uniform(i, count))
            .collect::<Result<SmallVec<[Axis; 2]>>>()?;
        Ok(Self { axes })
    }

    /// Number of axes (1 or 2).
    #[inline]
    #[must_use]
    pub fn dims(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_plane(&self) -> bool {
        self.axes.len() == 2
    }

    #[inline]
    #[must_use]
    pub fn axis(&self, index: usize) -> Option<&Axis> {
        self.axes.get(index)
    }

    pub(crate) fn axis_mut(&mut self, index: usize) -> Option<&mut Axis> {
        self.axes.get_mut(index)
    }

    /// Breakpoints of axis `index`. A line space reports `[0.0]` for axis 1,
    /// matching its `n x 1` grid layout.
    #[inline]
    #[must_use]
    pub fn breakpoints(&self, index: usize) -> &[f32] {
        self.axes
            .get(index)
            .map_or(&COLLAPSED_AXIS[..], Axis::breakpoints)
    }

    /// Grid dimensions `[cells along x, cells along y]`.
    #[inline]
    #[must_use]
    pub fn grid_dims(&self) -> [usize; 2] {
        [self.breakpoints(0).len(), self.breakpoints(1).len()]
    }

    /// Locates a position on both axes. The y lookup of a line space is
    /// always `(0, 0.0)`.
    #[inline]
    #[must_use]
    pub fn locate(&self, position: glam::Vec2) -> [AxisLookup; 2] {
        [
            locate(self.breakpoints(0), position.x),
            locate(self.breakpoints(1), position.y),
        ]
    }

    /// Raw breakpoint lists, used by persistence.
    #[must_use]
    pub fn to_vecs(&self) -> Vec<Vec<f32>> {
        self.axes.iter().map(|a| a.breakpoints.clone()).collect()
    }
}

/// Clamps `c` into the breakpoint range and finds its enclosing segment.
///
/// The last breakpoint maps to the last segment with `t = 1`, and every
/// other breakpoint maps to the segment it starts with `t = 0`, so samples
/// on breakpoints are exact.
#[must_use]
pub fn locate(breakpoints: &[f32], c: f32) -> AxisLookup {
    let n = breakpoints.len();
    if n < 2 {
        return AxisLookup { index: 0, t: 0.0 };
    }

    let first = breakpoints[0];
    let last = breakpoints[n - 1];
    let c = if c.is_nan() { first } else { c.clamp(first, last) };

    // partition_point gives the first breakpoint > c, so the segment starts one before it.
    let next = breakpoints.partition_point(|&b| b <= c);
    let index = next.saturating_sub(1).min(n - 2);

    let lo = breakpoints[index];
    let span = breakpoints[index + 1] - lo;
    let t = if span > 0.0 { ((c - lo) / span).clamp(0.0, 1.0) } else { 0.0 };

    AxisLookup { index, t }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_breakpoints_are_exact() {
        let points = [0.0, 0.25, 0.75, 1.0];
        assert_eq!(locate(&points, 0.0), AxisLookup { index: 0, t: 0.0 });
        assert_eq!(locate(&points, 0.25), AxisLookup { index: 1, t: 0.0 });
        assert_eq!(locate(&points, 0.75), AxisLookup { index: 2, t: 0.0 });
        assert_eq!(locate(&points, 1.0), AxisLookup { index: 2, t: 1.0 });
    }

    #[test]
    fn test_locate_clamps_and_handles_nan() {
        let points = [0.0, 0.5, 1.0];
        assert_eq!(locate(&points, -3.0), AxisLookup { index: 0, t: 0.0 });
        assert_eq!(locate(&points, 7.0), AxisLookup { index: 1, t: 1.0 });
        assert_eq!(locate(&points, f32::NAN), AxisLookup { index: 0, t: 0.0 });
    }

    #[test]
    fn test_locate_midpoint() {
        let lookup = locate(&[0.0, 0.25, 0.75, 1.0], 0.5);
        assert_eq!(lookup.index, 1);
        assert!((lookup.t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_axis_insert_and_remove() {
        let mut axis = Axis::new(0, vec![0.0, 1.0]).unwrap();
        assert_eq!(axis.insert(0.5), Some(1));
        assert_eq!(axis.insert(0.5), None);
        assert_eq!(axis.insert(1.0), None);
        assert!(!axis.remove(0));
        assert!(axis.remove(1));
        assert_eq!(axis.breakpoints(), &[0.0, 1.0]);
    }
}
