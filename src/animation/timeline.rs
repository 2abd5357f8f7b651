use crate::animation::tracks::{KeyframeCursor, KeyframeTrack};
use crate::param::merge::MergeMode;
use crate::rig::{OffsetProducer, ParameterKey, Rig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    Once,
    #[default]
    Loop,
    PingPong,
}

/// One keyframed channel: an axis of a parameter.
#[derive(Debug, Clone)]
pub struct AxisChannel {
    pub parameter: ParameterKey,
    pub axis: usize,
    pub mode: MergeMode,
    track: KeyframeTrack<f32>,
    cursor: KeyframeCursor,
}

impl AxisChannel {
    #[must_use]
    pub fn track(&self) -> &KeyframeTrack<f32> {
        &self.track
    }
}

/// Timeline animation of parameter positions.
///
/// Each frame the timeline advances its clock and pushes one offset per
/// channel. `weight` fades the contribution: additive offsets scale toward 0,
/// multiplicative ones toward 1, forced ones are dropped at zero weight.
///
/// ```rust,ignore
/// let mut blink = ParameterTimeline::new("blink");
/// blink.add_channel(eye_open, 0, MergeMode::Forced, track);
/// rig.update(dt, &mut [&mut blink], &mut scene);
/// ```
#[derive(Debug, Clone)]
pub struct ParameterTimeline {
    name: String,
    channels: Vec<AxisChannel>,
    duration: f32,
    /// +1 or -1; only flips under `LoopMode::PingPong`.
    direction: f32,

    pub time: f32,
    pub time_scale: f32,
    pub weight: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,
    pub enabled: bool,
}

impl ParameterTimeline {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
            duration: 0.0,
            direction: 1.0,
            time: 0.0,
            time_scale: 1.0,
            weight: 1.0,
            loop_mode: LoopMode::Loop,
            paused: false,
            enabled: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Length of the longest channel.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    #[must_use]
    pub fn channels(&self) -> &[AxisChannel] {
        &self.channels
    }

    pub fn add_channel(
        &mut self,
        parameter: ParameterKey,
        axis: usize,
        mode: MergeMode,
        track: KeyframeTrack<f32>,
    ) -> &mut Self {
        self.duration = self.duration.max(track.duration());
        self.channels.push(AxisChannel {
            parameter,
            axis,
            mode,
            track,
            cursor: KeyframeCursor::default(),
        });
        self
    }

    /// Drops every channel driving `parameter`.
    pub fn remove_parameter(&mut self, parameter: ParameterKey) {
        self.channels.retain(|c| c.parameter != parameter);
        self.duration = self
            .channels
            .iter()
            .map(|c| c.track.duration())
            .fold(0.0, f32::max);
    }

    /// Advances the clock by `dt` scaled by `time_scale`.
    pub fn advance(&mut self, dt: f32) {
        if self.paused || !self.enabled {
            return;
        }

        let duration = self.duration;
        if duration <= 0.0 {
            return;
        }

        let step = dt * self.time_scale;

        match self.loop_mode {
            LoopMode::Once => {
                self.time += step;
                if self.time >= duration {
                    self.time = duration;
                    self.paused = true;
                } else if self.time < 0.0 {
                    self.time = 0.0;
                    self.paused = true;
                }
            }
            LoopMode::Loop => {
                self.time = (self.time + step).rem_euclid(duration);
            }
            LoopMode::PingPong => {
                let raw = self.time + step * self.direction;
                let bounces = raw.div_euclid(duration) as i64;
                let t = raw.rem_euclid(duration);
                if bounces.rem_euclid(2) == 1 {
                    self.time = duration - t;
                    self.direction = -self.direction;
                } else {
                    self.time = t;
                }
            }
        }
    }

    /// Jumps to `time` without pushing anything.
    pub fn seek(&mut self, time: f32) {
        self.time = time.clamp(0.0, self.duration);
        self.direction = 1.0;
    }

    /// Pushes every channel's value at the current time into the rig.
    pub fn push_offsets(&mut self, rig: &mut Rig) {
        if !self.enabled || self.weight <= 0.0 {
            return;
        }
        let weight = self.weight.min(1.0);

        for channel in &mut self.channels {
            let raw = channel.track.sample_with_cursor(self.time, &mut channel.cursor);
            let value = match channel.mode {
                MergeMode::Additive => raw * weight,
                MergeMode::Multiplicative => 1.0 + (raw - 1.0) * weight,
                MergeMode::Forced => raw,
            };
            if let Err(err) = rig.push_axis_offset(channel.parameter, channel.axis, value, channel.mode) {
                log::warn!("Timeline `{}`: channel axis {} skipped: {err}", self.name, channel.axis);
            }
        }
    }
}

impl OffsetProducer for ParameterTimeline {
    fn produce(&mut self, dt: f32, rig: &mut Rig) {
        self.advance(dt);
        self.push_offsets(rig);
    }
}
