//! Timeline animation of parameter positions.
//!
//! A [`ParameterTimeline`] is one of the offset producers that run between
//! `begin_frame` and `apply`. It never touches bindings directly.

pub mod timeline;
pub mod tracks;

pub use timeline::{AxisChannel, LoopMode, ParameterTimeline};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
