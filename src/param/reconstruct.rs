//! Grid Reconstruction
//!
//! Turns a partially authored binding grid into a dense one. Explicit cells
//! are copied through untouched; every other cell is synthesized from the
//! explicit ones in rounds. Each round commits the first stage that makes
//! progress, then starts over:
//!
//! 1. **Corner completion** on the smallest span holding every explicit cell.
//!    Three resolved corners complete the parallelogram
//!    (`adjacent_a + adjacent_b - shared`). Two resolved corners on a diagonal
//!    fill the other two with the directional rule of stage 3, which lands on
//!    the minimum-norm plane through the pair.
//! 2. **Line interpolation**: a cell with resolved cells on both sides along an
//!    axis line is interpolated by breakpoint position. Inside a rectangle with
//!    resolved corners this produces the bilinear fill.
//! 3. **Directional propagation**: a cell with resolved cells on one side only
//!    copies the nearest one (edge clamp, never extrapolated).
//!
//! When both axes produce an estimate for the same cell in stage 2 or 3, the
//! two are blended with weights `1 / d²`, `d` being the breakpoint-position
//! distance to the nearest contributing cell on that axis. In stage 2 a cell
//! outside every resolved rectangle also takes the one-sided copy from the
//! axis that cannot interpolate it.
//!
//! The output depends only on the explicit cells, so running the
//! reconstruction again on the same authored grid (or on its dense output
//! marked fully explicit) changes nothing.

use crate::param::axis::AxisSpace;
use crate::param::grid::{DenseGrid, Grid};
use crate::param::values::Interpolatable;

/// Stateless dense-grid builder shared by every binding kind.
pub struct GridReconstructor;

impl GridReconstructor {
    /// Reconstructs `grid` against the breakpoints of `axes`.
    ///
    /// A grid without explicit cells yields `default` everywhere.
    #[must_use]
    pub fn reconstruct<T: Interpolatable>(
        grid: &Grid<T>,
        axes: &AxisSpace,
        default: &T,
    ) -> DenseGrid<T> {
        let dims = grid.dims();
        let explicit = grid.explicit_count();
        if explicit == 0 {
            return DenseGrid::from_parts(dims, vec![default.clone(); grid.len()]);
        }

        let Some(span) = Span::of(grid) else {
            return DenseGrid::from_parts(dims, vec![default.clone(); grid.len()]);
        };

        let mut work = Work {
            dims,
            coords: [axes.breakpoints(0), axes.breakpoints(1)],
            values: grid.values().to_vec(),
            resolved: grid.explicit_mask().to_vec(),
            remaining: grid.len() - explicit,
            line: Vec::with_capacity(dims[0].max(dims[1])),
        };

        while work.remaining > 0 {
            if work.complete_corners(span) {
                continue;
            }
            if work.interpolate_lines() {
                continue;
            }
            if !work.extend_lines() {
                // Only reachable with no resolved cell at all, which the
                // explicit count above rules out.
                break;
            }
        }

        DenseGrid::from_parts(dims, work.values)
    }
}

/// Bounding box of the explicit cells.
#[derive(Debug, Clone, Copy)]
struct Span {
    x: [usize; 2],
    y: [usize; 2],
}

impl Span {
    fn of<T: Clone>(grid: &Grid<T>) -> Option<Self> {
        let height = grid.dims()[1];
        let mut span: Option<Span> = None;
        for (i, _) in grid.explicit_mask().iter().enumerate().filter(|(_, e)| **e) {
            let (x, y) = (i / height, i % height);
            span = Some(match span {
                None => Span { x: [x, x], y: [y, y] },
                Some(s) => Span {
                    x: [s.x[0].min(x), s.x[1].max(x)],
                    y: [s.y[0].min(y), s.y[1].max(y)],
                },
            });
        }
        span
    }

    /// Corners in the order (x0,y0), (x0,y1), (x1,y0), (x1,y1); corner `i`
    /// is diagonally opposite corner `3 - i`.
    fn corners(self) -> [[usize; 2]; 4] {
        [
            [self.x[0], self.y[0]],
            [self.x[0], self.y[1]],
            [self.x[1], self.y[0]],
            [self.x[1], self.y[1]],
        ]
    }
}

/// A candidate value for one cell along one axis.
struct Estimate<T> {
    value: T,
    distance: f32,
}

/// Blends two per-axis estimates by inverse squared distance.
fn blend<T: Interpolatable>(a: &Estimate<T>, b: &Estimate<T>) -> T {
    let wa = 1.0 / (a.distance * a.distance).max(f32::EPSILON);
    let wb = 1.0 / (b.distance * b.distance).max(f32::EPSILON);
    T::interpolate_linear(&a.value, &b.value, wb / (wa + wb))
}

struct Work<'a, T> {
    dims: [usize; 2],
    coords: [&'a [f32]; 2],
    values: Vec<T>,
    resolved: Vec<bool>,
    remaining: usize,
    line: Vec<usize>,
}

impl<T: Interpolatable> Work<'_, T> {
    #[inline]
    fn flat(&self, [x, y]: [usize; 2]) -> usize {
        x * self.dims[1] + y
    }

    /// Breakpoint position of cell `index` along `axis`. Falls back to the
    /// index itself if the grid outgrew its axis description.
    #[inline]
    fn coord(&self, axis: usize, index: usize) -> f32 {
        self.coords[axis]
            .get(index)
            .copied()
            .unwrap_or(index as f32)
    }

    fn commit(&mut self, index: usize, value: T) {
        debug_assert!(!self.resolved[index]);
        self.values[index] = value;
        self.resolved[index] = true;
        self.remaining -= 1;
    }

    fn complete_corners(&mut self, span: Span) -> bool {
        if span.x[0] == span.x[1] || span.y[0] == span.y[1] {
            return false;
        }

        let corners = span.corners();
        let known = corners.map(|c| self.resolved[self.flat(c)]);

        match known.iter().filter(|&&k| k).count() {
            3 => {
                let Some(missing) = known.iter().position(|&k| !k) else {
                    return false;
                };
                let shared = 3 - missing;
                let mut adjacent = (0..4).filter(|&i| i != missing && i != shared);
                let (Some(a), Some(b)) = (adjacent.next(), adjacent.next()) else {
                    return false;
                };
                let value = T::complete_parallelogram(
                    &self.values[self.flat(corners[a])],
                    &self.values[self.flat(corners[b])],
                    &self.values[self.flat(corners[shared])],
                );
                let target = self.flat(corners[missing]);
                self.commit(target, value);
                true
            }
            2 if (known[0] && known[3]) || (known[1] && known[2]) => {
                let mut synthesized = Vec::with_capacity(2);
                for (i, &[x, y]) in corners.iter().enumerate() {
                    if known[i] {
                        continue;
                    }
                    let other_x = if x == span.x[0] { span.x[1] } else { span.x[0] };
                    let other_y = if y == span.y[0] { span.y[1] } else { span.y[0] };
                    // The corner sharing x lies along axis 1 and vice versa.
                    let along_y = Estimate {
                        value: self.values[self.flat([x, other_y])].clone(),
                        distance: (self.coord(1, y) - self.coord(1, other_y)).abs(),
                    };
                    let along_x = Estimate {
                        value: self.values[self.flat([other_x, y])].clone(),
                        distance: (self.coord(0, x) - self.coord(0, other_x)).abs(),
                    };
                    synthesized.push((self.flat([x, y]), blend(&along_x, &along_y)));
                }
                for (index, value) in synthesized {
                    self.commit(index, value);
                }
                true
            }
            _ => false,
        }
    }

    /// Number of lines running along `axis`, and the fixed index of each.
    #[inline]
    fn line_count(&self, axis: usize) -> usize {
        self.dims[1 - axis]
    }

    fn load_line(&mut self, axis: usize, fixed: usize) {
        let dims = self.dims;
        self.line.clear();
        if axis == 0 {
            self.line.extend((0..dims[0]).map(|x| x * dims[1] + fixed));
        } else {
            self.line.extend((0..dims[1]).map(|y| fixed * dims[1] + y));
        }
    }

    /// Stage 2: fill every gap bounded on both sides along some line.
    fn interpolate_lines(&mut self) -> bool {
        let mut estimates: [Vec<Option<Estimate<T>>>; 2] = [
            (0..self.values.len()).map(|_| None).collect(),
            (0..self.values.len()).map(|_| None).collect(),
        ];

        for (axis, slot) in estimates.iter_mut().enumerate() {
            for fixed in 0..self.line_count(axis) {
                self.load_line(axis, fixed);
                let mut low: Option<usize> = None;
                for k in 0..self.line.len() {
                    if !self.resolved[self.line[k]] {
                        continue;
                    }
                    if let Some(l) = low.filter(|&l| k > l + 1) {
                        let (cl, ck) = (self.coord(axis, l), self.coord(axis, k));
                        let width = ck - cl;
                        for m in (l + 1)..k {
                            let cm = self.coord(axis, m);
                            let t = if width > 0.0 { (cm - cl) / width } else { 0.0 };
                            slot[self.line[m]] = Some(Estimate {
                                value: T::interpolate_linear(
                                    &self.values[self.line[l]],
                                    &self.values[self.line[k]],
                                    t,
                                ),
                                distance: (cm - cl).min(ck - cm),
                            });
                        }
                    }
                    low = Some(k);
                }
            }
        }

        // Outside every resolved rectangle, a one-sided copy along the other
        // axis still counts as that axis's estimate.
        for index in 0..self.values.len() {
            if self.resolved[index] {
                continue;
            }
            let other = match (estimates[0][index].is_some(), estimates[1][index].is_some()) {
                (true, false) => 1,
                (false, true) => 0,
                _ => continue,
            };
            let cell = [index / self.dims[1], index % self.dims[1]];
            if !self.in_resolved_rect(cell) {
                estimates[other][index] = self.one_sided(other, cell);
            }
        }

        self.commit_estimates(estimates)
    }

    /// Clamped copy of the nearest resolved cell along `axis`, if the resolved
    /// cells of that line all lie on one side of `cell`.
    fn one_sided(&self, axis: usize, cell: [usize; 2]) -> Option<Estimate<T>> {
        let at = |i: usize| {
            let mut c = cell;
            c[axis] = i;
            self.flat(c)
        };
        let pos = cell[axis];
        let low = (0..pos).rev().find(|&i| self.resolved[at(i)]);
        let high = ((pos + 1)..self.dims[axis]).find(|&i| self.resolved[at(i)]);
        let source = match (low, high) {
            (Some(s), None) | (None, Some(s)) => s,
            _ => return None,
        };
        Some(Estimate {
            value: self.values[at(source)].clone(),
            distance: (self.coord(axis, pos) - self.coord(axis, source)).abs(),
        })
    }

    /// Whether `[x, y]` lies in or on a rectangle of more than one row and
    /// column whose four corners are resolved.
    fn in_resolved_rect(&self, [x, y]: [usize; 2]) -> bool {
        let [width, height] = self.dims;
        for x1 in 0..=x {
            for x2 in x.max(x1 + 1)..width {
                let shared = |cy: usize| {
                    self.resolved[self.flat([x1, cy])] && self.resolved[self.flat([x2, cy])]
                };
                let below = (0..y).any(shared);
                let here = shared(y);
                let above = ((y + 1)..height).any(shared);
                if (below && (here || above)) || (here && above) {
                    return true;
                }
            }
        }
        false
    }

    /// Stage 3: copy the nearest resolved cell outward along every line.
    fn extend_lines(&mut self) -> bool {
        let mut estimates: [Vec<Option<Estimate<T>>>; 2] = [
            (0..self.values.len()).map(|_| None).collect(),
            (0..self.values.len()).map(|_| None).collect(),
        ];

        for (axis, slot) in estimates.iter_mut().enumerate() {
            for fixed in 0..self.line_count(axis) {
                self.load_line(axis, fixed);
                let first = self.line.iter().position(|&i| self.resolved[i]);
                let last = self.line.iter().rposition(|&i| self.resolved[i]);
                let (Some(first), Some(last)) = (first, last) else {
                    continue;
                };

                let outward = (0..first)
                    .map(|m| (m, first))
                    .chain(((last + 1)..self.line.len()).map(|m| (m, last)));
                for (m, source) in outward {
                    slot[self.line[m]] = Some(Estimate {
                        value: self.values[self.line[source]].clone(),
                        distance: (self.coord(axis, m) - self.coord(axis, source)).abs(),
                    });
                }
            }
        }

        self.commit_estimates(estimates)
    }

    fn commit_estimates(&mut self, estimates: [Vec<Option<Estimate<T>>>; 2]) -> bool {
        let [along_x, along_y] = estimates;
        let mut progressed = false;
        for (index, pair) in along_x.into_iter().zip(along_y).enumerate() {
            if self.resolved[index] {
                continue;
            }
            let value = match pair {
                (Some(a), Some(b)) => blend(&a, &b),
                (Some(a), None) => a.value,
                (None, Some(b)) => b.value,
                (None, None) => continue,
            };
            self.commit(index, value);
            progressed = true;
        }
        progressed
    }
}
