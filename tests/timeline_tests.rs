//! Timeline Tests
//!
//! Tests for:
//! - KeyframeTrack linear/step sampling and clamping
//! - ParameterTimeline loop modes (Once, Loop, PingPong) and time scale
//! - Weighted offsets pushed into parameters
//! - Timelines as `OffsetProducer`s inside `Rig::update`

use glam::Vec2;

use myth_rig::animation::{InterpolationMode, KeyframeCursor, KeyframeTrack, LoopMode, ParameterTimeline};
use myth_rig::param::{MergeMode, Parameter};
use myth_rig::{NodeId, PropertySheet, PropertyTarget, Rig};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn ramp(duration: f32) -> KeyframeTrack<f32> {
    KeyframeTrack::new(vec![0.0, duration], vec![0.0, 1.0], InterpolationMode::Linear).unwrap()
}

// ============================================================================
// KeyframeTrack
// ============================================================================

#[test]
fn track_linear_midpoint_and_clamp() {
    let track = ramp(2.0);
    let mut cursor = KeyframeCursor::default();

    assert!(approx(track.sample_with_cursor(1.0, &mut cursor), 0.5));
    assert!(approx(track.sample_with_cursor(5.0, &mut cursor), 1.0));
    assert!(approx(track.sample_with_cursor(-1.0, &mut cursor), 0.0));
    assert!(approx(track.duration(), 2.0));
}

#[test]
fn track_step_holds_until_next_key() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0, 2.0],
        vec![0.0_f32, 0.5, 1.0],
        InterpolationMode::Step,
    )
    .unwrap();

    assert_eq!(track.sample(0.99), 0.0);
    assert_eq!(track.sample(1.5), 0.5);
    assert_eq!(track.sample(3.0), 1.0);
}

#[test]
fn track_single_key_is_constant() {
    let track = KeyframeTrack::new(vec![0.5], vec![0.3_f32], InterpolationMode::Linear).unwrap();
    let mut cursor = KeyframeCursor::default();
    assert_eq!(track.sample_with_cursor(10.0, &mut cursor), 0.3);
    assert_eq!(track.duration(), 0.5);
}

#[test]
fn track_of_vectors() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![Vec2::ZERO, Vec2::new(2.0, -4.0)],
        InterpolationMode::Linear,
    )
    .unwrap();
    let v = track.sample(0.25);
    assert!(approx(v.x, 0.5) && approx(v.y, -1.0));
}

// ============================================================================
// Clock
// ============================================================================

fn timeline_with(loop_mode: LoopMode) -> ParameterTimeline {
    let mut rig = Rig::new();
    let key = rig.add_parameter(Parameter::line("p", vec![0.0, 1.0]).unwrap());
    let mut timeline = ParameterTimeline::new("clip");
    timeline.add_channel(key, 0, MergeMode::Forced, ramp(2.0));
    timeline.loop_mode = loop_mode;
    timeline
}

#[test]
fn once_stops_at_end() {
    let mut timeline = timeline_with(LoopMode::Once);
    timeline.advance(1.5);
    timeline.advance(1.5);
    assert!(approx(timeline.time, 2.0));
    assert!(timeline.paused);
}

#[test]
fn loop_wraps_both_directions() {
    let mut timeline = timeline_with(LoopMode::Loop);
    timeline.advance(2.5);
    assert!(approx(timeline.time, 0.5));

    timeline.time_scale = -1.0;
    timeline.advance(1.0);
    assert!(approx(timeline.time, 1.5));
}

#[test]
fn ping_pong_reflects() {
    let mut timeline = timeline_with(LoopMode::PingPong);
    timeline.advance(2.5);
    assert!(approx(timeline.time, 1.5));

    // Heading back toward the start now.
    timeline.advance(1.0);
    assert!(approx(timeline.time, 0.5));
    timeline.advance(1.0);
    assert!(approx(timeline.time, 0.5));
    timeline.advance(0.5);
    assert!(approx(timeline.time, 1.0));
}

#[test]
fn paused_timeline_does_not_move() {
    let mut timeline = timeline_with(LoopMode::Loop);
    timeline.paused = true;
    timeline.advance(1.0);
    assert_eq!(timeline.time, 0.0);
}

// ============================================================================
// Producing offsets
// ============================================================================

const HEAD: NodeId = NodeId(7);

fn animated_rig() -> (Rig, PropertySheet, myth_rig::ParameterKey) {
    let mut scene = PropertySheet::new();
    scene.add_property(HEAD, "transform.r", 0.0);

    let mut rig = Rig::new();
    let key = rig.add_parameter(Parameter::line("nod", vec![0.0, 1.0]).unwrap());
    let id = rig
        .bind_value(key, &scene, HEAD, "transform.r", MergeMode::Forced)
        .unwrap();
    let binding = rig.value_binding_mut(key, id).unwrap();
    binding.set_value(0, 0, 0.0).unwrap();
    binding.set_value(1, 0, 90.0).unwrap();
    (rig, scene, key)
}

#[test]
fn timeline_drives_parameter_through_update() {
    let (mut rig, mut scene, key) = animated_rig();
    let mut timeline = ParameterTimeline::new("nod");
    timeline.add_channel(key, 0, MergeMode::Forced, ramp(2.0));

    rig.update(0.5, &mut [&mut timeline], &mut scene);
    assert!(approx(rig.parameter(key).unwrap().position().x, 0.25));
    assert!(approx(scene.offset(HEAD, "transform.r").unwrap(), 22.5));

    rig.update(1.0, &mut [&mut timeline], &mut scene);
    assert!(approx(scene.offset(HEAD, "transform.r").unwrap(), 67.5));
}

#[test]
fn weight_scales_additive_offsets() {
    let (mut rig, mut scene, key) = animated_rig();
    rig.parameter_mut(key).unwrap().set_base(Vec2::new(0.2, 0.0));

    let mut timeline = ParameterTimeline::new("sway");
    timeline.add_channel(key, 0, MergeMode::Additive, ramp(1.0));
    timeline.weight = 0.5;

    rig.update(0.5, &mut [&mut timeline], &mut scene);
    // 0.2 + 0.5 * 0.5
    assert!(approx(rig.parameter(key).unwrap().position().x, 0.45));
}

#[test]
fn zero_weight_pushes_nothing() {
    let (mut rig, mut scene, key) = animated_rig();
    rig.parameter_mut(key).unwrap().set_base(Vec2::new(0.2, 0.0));

    let mut timeline = ParameterTimeline::new("off");
    timeline.add_channel(key, 0, MergeMode::Forced, ramp(1.0));
    timeline.weight = 0.0;

    rig.update(0.5, &mut [&mut timeline], &mut scene);
    assert!(approx(rig.parameter(key).unwrap().position().x, 0.2));
}

#[test]
fn channels_for_removed_parameters_are_skipped() {
    let (mut rig, mut scene, key) = animated_rig();
    let other = rig.add_parameter(Parameter::line("other", vec![0.0, 1.0]).unwrap());

    let mut timeline = ParameterTimeline::new("mixed");
    timeline.add_channel(other, 0, MergeMode::Forced, ramp(1.0));
    timeline.add_channel(key, 0, MergeMode::Forced, ramp(1.0));
    rig.remove_parameter(other);

    rig.update(0.5, &mut [&mut timeline], &mut scene);
    assert!(approx(rig.parameter(key).unwrap().position().x, 0.5));

    timeline.remove_parameter(other);
    assert_eq!(timeline.channels().len(), 1);
}
