use glam::Vec2;
use myth_rig::animation::{InterpolationMode, KeyframeTrack, LoopMode, ParameterTimeline};
use myth_rig::param::{Deformation, MergeMode, Parameter};
use myth_rig::{NodeId, PropertySheet, PropertyTarget, Rig, RigSettings};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let head = NodeId(1);
    let mouth = NodeId(2);

    let mut scene = PropertySheet::new();
    scene.add_property(head, "transform.t.x", 0.0);
    scene.add_property(head, "transform.t.y", 0.0);
    scene.add_mesh(mouth, 4);

    let settings = RigSettings::from_json(r#"{ "strict_deformation": false }"#)?;
    let mut rig = Rig::with_settings(settings);

    // A 3x3 look-around plane: authored on the diagonal, the rest inferred.
    let look = rig.add_parameter(Parameter::plane(
        "head_look",
        vec![0.0, 0.5, 1.0],
        vec![0.0, 0.5, 1.0],
    )?);
    let x = rig.bind_value(look, &scene, head, "transform.t.x", MergeMode::Additive)?;
    let binding = rig.value_binding_mut(look, x)?;
    binding.set_value(0, 0, -20.0)?;
    binding.set_value(2, 2, 20.0)?;

    let y = rig.bind_value(look, &scene, head, "transform.t.y", MergeMode::Additive)?;
    let binding = rig.value_binding_mut(look, y)?;
    binding.set_value(0, 2, 10.0)?;
    binding.set_value(2, 0, -10.0)?;

    // Mouth opening as a mesh deformation.
    let open = rig.add_parameter(Parameter::line("mouth_open", vec![0.0, 1.0])?);
    let deform = rig.bind_deformation(open, &scene, mouth, MergeMode::Additive)?;
    let opened = Deformation::from_offsets(vec![
        Vec2::new(0.0, 2.0),
        Vec2::new(0.0, 2.0),
        Vec2::new(0.0, -2.0),
        Vec2::new(0.0, -2.0),
    ]);
    rig.deformation_binding_mut(open, deform)?.set_value(1, 0, opened)?;

    let mut talk = ParameterTimeline::new("talk");
    talk.loop_mode = LoopMode::PingPong;
    talk.add_channel(
        open,
        0,
        MergeMode::Forced,
        KeyframeTrack::new(vec![0.0, 0.25, 0.5], vec![0.0, 1.0, 0.2], InterpolationMode::Linear)?,
    );
    talk.add_channel(
        look,
        0,
        MergeMode::Forced,
        KeyframeTrack::new(vec![0.0, 1.0], vec![0.0, 1.0], InterpolationMode::Linear)?,
    );

    for frame in 0..8 {
        let stats = rig.update(1.0 / 8.0, &mut [&mut talk], &mut scene);
        println!(
            "frame {frame}: t.x = {:6.2}, t.y = {:6.2}, mouth = {:?} ({stats:?})",
            scene.offset(head, "transform.t.x").unwrap_or_default(),
            scene.offset(head, "transform.t.y").unwrap_or_default(),
            scene.deformation(mouth).map(|d| d[0].y),
        );
    }

    println!("{}", rig.to_json()?);
    Ok(())
}
