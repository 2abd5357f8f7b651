use glam::Vec2;
use serde::{Deserialize, Serialize};

/// How a value combines with the value already present.
///
/// Used both for binding outputs merging into node properties and for
/// producer offsets merging into parameter positions. Serialized as the bare
/// variant name (`"Forced"`, `"Additive"`, `"Multiplicative"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MergeMode {
    /// Replace the current value.
    Forced,
    /// Add to the current value.
    #[default]
    Additive,
    /// Multiply the current value.
    Multiplicative,
}

impl MergeMode {
    #[inline]
    #[must_use]
    pub fn merge(self, current: f32, value: f32) -> f32 {
        match self {
            Self::Forced => value,
            Self::Additive => current + value,
            Self::Multiplicative => current * value,
        }
    }

    #[inline]
    #[must_use]
    pub fn merge_vec2(self, current: Vec2, value: Vec2) -> Vec2 {
        match self {
            Self::Forced => value,
            Self::Additive => current + value,
            Self::Multiplicative => current * value,
        }
    }

    /// Merges a displacement field vertex by vertex. Extra entries on either
    /// side are left alone.
    pub fn merge_field(self, current: &mut [Vec2], value: &[Vec2]) {
        for (c, v) in current.iter_mut().zip(value) {
            *c = self.merge_vec2(*c, *v);
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Forced => "Forced",
            Self::Additive => "Additive",
            Self::Multiplicative => "Multiplicative",
        }
    }
}

/// Offsets pushed into a parameter position during one frame.
///
/// Accumulation is order independent: the merged position is
/// `(forced.unwrap_or(base) + Σ additive) * Π multiplicative`, per axis.
/// A later forced push on the same axis replaces an earlier one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOffsets {
    additive: Vec2,
    multiplicative: Vec2,
    forced: [Option<f32>; 2],
}

impl Default for PositionOffsets {
    fn default() -> Self {
        Self {
            additive: Vec2::ZERO,
            multiplicative: Vec2::ONE,
            forced: [None, None],
        }
    }
}

impl PositionOffsets {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Pushes a value onto one axis (`0` or `1`).
    pub(crate) fn push_axis(&mut self, axis: usize, value: f32, mode: MergeMode) {
        match mode {
            MergeMode::Forced => self.forced[axis] = Some(value),
            MergeMode::Additive => self.additive[axis] += value,
            MergeMode::Multiplicative => self.multiplicative[axis] *= value,
        }
    }

    /// Pushes a value onto both axes.
    pub fn push(&mut self, value: Vec2, mode: MergeMode) {
        self.push_axis(0, value.x, mode);
        self.push_axis(1, value.y, mode);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the accumulated offsets to `base`.
    #[must_use]
    pub fn apply(&self, base: Vec2) -> Vec2 {
        let start = Vec2::new(
            self.forced[0].unwrap_or(base.x),
            self.forced[1].unwrap_or(base.y),
        );
        (start + self.additive) * self.multiplicative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_modes() {
        assert_eq!(MergeMode::Forced.merge(3.0, 2.0), 2.0);
        assert_eq!(MergeMode::Additive.merge(3.0, 2.0), 5.0);
        assert_eq!(MergeMode::Multiplicative.merge(3.0, 2.0), 6.0);
    }

    #[test]
    fn test_offsets_are_order_independent() {
        let mut a = PositionOffsets::default();
        a.push_axis(0, 0.5, MergeMode::Multiplicative);
        a.push_axis(0, 0.2, MergeMode::Additive);
        a.push_axis(0, 0.4, MergeMode::Forced);

        let mut b = PositionOffsets::default();
        b.push_axis(0, 0.4, MergeMode::Forced);
        b.push_axis(0, 0.2, MergeMode::Additive);
        b.push_axis(0, 0.5, MergeMode::Multiplicative);

        let base = Vec2::new(0.9, 0.1);
        assert_eq!(a.apply(base), b.apply(base));
        assert!((a.apply(base).x - 0.3).abs() < 1e-6);
        assert_eq!(a.apply(base).y, 0.1);
    }

    #[test]
    fn test_merge_mode_serializes_as_tag() {
        let json = serde_json::to_string(&MergeMode::Multiplicative).unwrap();
        assert_eq!(json, "\"Multiplicative\"");
    }
}
