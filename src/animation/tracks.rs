use serde::{Deserialize, Serialize};

use crate::errors::{Result, RigError};
use crate::param::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Last keyframe interval a track was sampled in.
#[derive(Debug, Clone, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// Keyframed values over time.
#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Builds a track. Times must be finite and non-decreasing, with one
    /// value per time and at least one keyframe.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Result<Self> {
        if times.is_empty() {
            return Err(RigError::InvalidTrack("no keyframes".into()));
        }
        if times.len() != values.len() {
            return Err(RigError::InvalidTrack(format!(
                "{} times but {} values",
                times.len(),
                values.len()
            )));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(RigError::InvalidTrack("non-finite keyframe time".into()));
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(RigError::InvalidTrack("keyframe times decrease".into()));
        }
        Ok(Self {
            times,
            values,
            interpolation,
        })
    }

    #[inline]
    #[must_use]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    /// Time of the last keyframe.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        let next = self.times.partition_point(|&t| t <= time);
        self.sample_at_frame(next.saturating_sub(1), time)
    }

    /// Samples using `cursor` as a starting guess.
    ///
    /// Playback moves a few keyframes per frame at most, so a short linear
    /// scan around the cursor usually hits; scrubbing falls back to a binary
    /// search.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> T {
        let len = self.times.len();
        if len == 1 {
            return self.values[0].clone();
        }

        let i = cursor.last_index.min(len - 1);
        let found = if time >= self.times[i] {
            // forward
            (0..=MAX_SCAN_OFFSET)
                .map(|offset| i + offset)
                .take_while(|&idx| idx < len)
                .find(|&idx| idx == len - 1 || time < self.times[idx + 1])
        } else {
            // backward
            (0..=MAX_SCAN_OFFSET)
                .take_while(|&offset| offset <= i)
                .map(|offset| i - offset)
                .find(|&idx| time >= self.times[idx])
        };

        let index = found.unwrap_or_else(|| {
            self.times
                .partition_point(|&t| t <= time)
                .saturating_sub(1)
        });
        cursor.last_index = index;
        self.sample_at_frame(index, time)
    }

    fn sample_at_frame(&self, index: usize, time: f32) -> T {
        let len = self.times.len();
        if index >= len - 1 {
            return self.values[len - 1].clone();
        }
        if time <= self.times[0] {
            return self.values[0].clone();
        }

        let (t0, t1) = (self.times[index], self.times[index + 1]);
        let dt = t1 - t0;
        let t = if dt > 1e-6 { ((time - t0) / dt).clamp(0.0, 1.0) } else { 0.0 };

        match self.interpolation {
            InterpolationMode::Step => self.values[index].clone(),
            InterpolationMode::Linear => {
                T::interpolate_linear(&self.values[index], &self.values[index + 1], t)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> KeyframeTrack<f32> {
        KeyframeTrack::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
            InterpolationMode::Linear,
        )
        .unwrap()
    }

    #[test]
    fn rejects_malformed_tracks() {
        assert!(KeyframeTrack::<f32>::new(vec![], vec![], InterpolationMode::Linear).is_err());
        assert!(KeyframeTrack::new(vec![0.0, 1.0], vec![1.0], InterpolationMode::Linear).is_err());
        assert!(
            KeyframeTrack::new(vec![1.0, 0.0], vec![1.0, 2.0], InterpolationMode::Step).is_err()
        );
    }

    #[test]
    fn cursor_matches_plain_sampling() {
        let track = ramp();
        let mut cursor = KeyframeCursor::default();
        // forward, then a jump back, then a long jump forward
        for time in [0.25, 0.9, 1.5, 2.75, 0.5, 5.5, 7.0, -1.0] {
            let a = track.sample(time);
            let b = track.sample_with_cursor(time, &mut cursor);
            assert!((a - b).abs() < 1e-5, "time {time}: {a} vs {b}");
        }
    }

    #[test]
    fn step_holds_previous_key() {
        let track =
            KeyframeTrack::new(vec![0.0, 1.0], vec![2.0, 8.0], InterpolationMode::Step).unwrap();
        assert_eq!(track.sample(0.99), 2.0);
        assert_eq!(track.sample(1.0), 8.0);
    }
}
