//! Binding Grids
//!
//! [`Grid`] is the authored table of a binding: one payload per cell plus an
//! explicit flag. [`DenseGrid`] is the fully populated table produced by the
//! reconstructor and sampled at runtime.
//!
//! Both are stored x-major: cell `(x, y)` lives at `x * height + y`. A line
//! parameter uses an `n x 1` layout.

use glam::Vec2;

use crate::errors::{Result, RigError};
use crate::param::axis::AxisSpace;
use crate::param::values::Interpolatable;

#[inline]
fn flat(dims: [usize; 2], x: usize, y: usize) -> usize {
    x * dims[1] + y
}

/// Authored cells of a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    dims: [usize; 2],
    values: Vec<T>,
    explicit: Vec<bool>,
}

impl<T: Clone> Grid<T> {
    /// A grid with every cell unset and holding `fill`.
    #[must_use]
    pub fn new(dims: [usize; 2], fill: &T) -> Self {
        let len = dims[0] * dims[1];
        Self {
            dims,
            values: vec![fill.clone(); len],
            explicit: vec![false; len],
        }
    }

    #[inline]
    #[must_use]
    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check(&self, x: usize, y: usize) -> Result<usize> {
        if x < self.dims[0] && y < self.dims[1] {
            Ok(flat(self.dims, x, y))
        } else {
            Err(RigError::CellOutOfRange {
                x,
                y,
                width: self.dims[0],
                height: self.dims[1],
            })
        }
    }

    /// Stored payload of a cell, explicit or not.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        self.check(x, y).ok().map(|i| &self.values[i])
    }

    /// Payload of a cell if it was explicitly authored.
    #[inline]
    #[must_use]
    pub fn explicit_value(&self, x: usize, y: usize) -> Option<&T> {
        self.check(x, y)
            .ok()
            .filter(|&i| self.explicit[i])
            .map(|i| &self.values[i])
    }

    #[inline]
    #[must_use]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.check(x, y).is_ok_and(|i| self.explicit[i])
    }

    /// Authors a cell.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<()> {
        let i = self.check(x, y)?;
        self.values[i] = value;
        self.explicit[i] = true;
        Ok(())
    }

    /// Clears the explicit flag of a cell and resets its payload to `fill`.
    pub fn unset(&mut self, x: usize, y: usize, fill: &T) -> Result<()> {
        let i = self.check(x, y)?;
        self.values[i] = fill.clone();
        self.explicit[i] = false;
        Ok(())
    }

    /// Unsets every cell.
    pub fn clear(&mut self, fill: &T) {
        self.values.fill(fill.clone());
        self.explicit.fill(false);
    }

    /// Number of explicit cells.
    #[must_use]
    pub fn explicit_count(&self) -> usize {
        self.explicit.iter().filter(|&&e| e).count()
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn explicit_mask(&self) -> &[bool] {
        &self.explicit
    }

    /// Applies `f` to every stored payload, explicit or not.
    pub fn for_each_value_mut(&mut self, f: impl FnMut(&mut T)) {
        self.values.iter_mut().for_each(f);
    }

    /// Resizes to `dims`, keeping every cell whose address survives.
    ///
    /// Cells beyond the new bounds are dropped; new cells are unset and hold
    /// `fill`.
    pub fn resize(&mut self, dims: [usize; 2], fill: &T) {
        if dims == self.dims {
            return;
        }
        let mut resized = Self::new(dims, fill);
        for x in 0..self.dims[0].min(dims[0]) {
            for y in 0..self.dims[1].min(dims[1]) {
                let from = flat(self.dims, x, y);
                let to = flat(dims, x, y);
                resized.values[to] = self.values[from].clone();
                resized.explicit[to] = self.explicit[from];
            }
        }
        *self = resized;
    }

    /// Inserts an unset slice of cells at `index` along `axis`.
    pub(crate) fn insert_slice(&mut self, axis: usize, index: usize, fill: &T) {
        let mut dims = self.dims;
        dims[axis] += 1;
        let mut grown = Self::new(dims, fill);
        for x in 0..self.dims[0] {
            for y in 0..self.dims[1] {
                let (nx, ny) = match axis {
                    0 if x >= index => (x + 1, y),
                    1 if y >= index => (x, y + 1),
                    _ => (x, y),
                };
                let from = flat(self.dims, x, y);
                let to = flat(dims, nx, ny);
                grown.values[to] = self.values[from].clone();
                grown.explicit[to] = self.explicit[from];
            }
        }
        *self = grown;
    }

    /// Removes the slice of cells at `index` along `axis`.
    pub(crate) fn remove_slice(&mut self, axis: usize, index: usize) {
        let mut dims = self.dims;
        dims[axis] -= 1;
        let mut values = Vec::with_capacity(dims[0] * dims[1]);
        let mut explicit = Vec::with_capacity(dims[0] * dims[1]);
        for x in 0..self.dims[0] {
            for y in 0..self.dims[1] {
                if (axis == 0 && x == index) || (axis == 1 && y == index) {
                    continue;
                }
                let from = flat(self.dims, x, y);
                values.push(self.values[from].clone());
                explicit.push(self.explicit[from]);
            }
        }
        *self = Self {
            dims,
            values,
            explicit,
        };
    }

    /// Mirrors the grid along `axis`.
    pub(crate) fn reverse(&mut self, axis: usize) {
        let [w, h] = self.dims;
        for x in 0..w {
            for y in 0..h {
                let (mx, my) = if axis == 0 { (w - 1 - x, y) } else { (x, h - 1 - y) };
                let a = flat(self.dims, x, y);
                let b = flat(self.dims, mx, my);
                if a < b {
                    self.values.swap(a, b);
                    self.explicit.swap(a, b);
                }
            }
        }
    }

    /// Swaps two cells, payload and explicit flag together.
    pub fn swap(&mut self, a: [usize; 2], b: [usize; 2]) -> Result<()> {
        let ia = self.check(a[0], a[1])?;
        let ib = self.check(b[0], b[1])?;
        self.values.swap(ia, ib);
        self.explicit.swap(ia, ib);
        Ok(())
    }
}

/// Fully populated, sampleable grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrid<T> {
    dims: [usize; 2],
    values: Vec<T>,
}

impl<T: Interpolatable> DenseGrid<T> {
    pub(crate) fn from_parts(dims: [usize; 2], values: Vec<T>) -> Self {
        debug_assert_eq!(values.len(), dims[0] * dims[1]);
        Self { dims, values }
    }

    #[inline]
    #[must_use]
    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        (x < self.dims[0] && y < self.dims[1]).then(|| &self.values[flat(self.dims, x, y)])
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Bilinear sample at a continuous position.
    ///
    /// `axes` must describe this grid's dimensions.
    #[must_use]
    pub fn sample(&self, axes: &AxisSpace, position: Vec2) -> T {
        let [lx, ly] = axes.locate(position);
        let x0 = lx.index.min(self.dims[0] - 1);
        let x1 = (lx.index + 1).min(self.dims[0] - 1);
        let y0 = ly.index.min(self.dims[1] - 1);
        let y1 = (ly.index + 1).min(self.dims[1] - 1);

        let at = |x: usize, y: usize| &self.values[flat(self.dims, x, y)];

        let low = T::interpolate_linear(at(x0, y0), at(x1, y0), lx.t);
        if y0 == y1 {
            return low;
        }
        let high = T::interpolate_linear(at(x0, y1), at(x1, y1), lx.t);
        T::interpolate_linear(&low, &high, ly.t)
    }
}
