//! Persistence Tests
//!
//! Tests for:
//! - Saving and reloading a rig through JSON
//! - Merge-mode tags and the explicit-cell mask in the document
//! - Non-explicit values being discarded on load
//! - Fitting stored tables to the parameter's axes
//! - Rejecting malformed axis points

use glam::Vec2;
use serde_json::json;

use myth_rig::param::{Deformation, MergeMode, Parameter};
use myth_rig::{BindingDesc, NodeId, PropertySheet, PropertyTarget, Rig, RigDesc, RigError};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

const HEAD: NodeId = NodeId(3);
const BODY: NodeId = NodeId(4);

fn scene() -> PropertySheet {
    let mut scene = PropertySheet::new();
    scene.add_property(HEAD, "transform.t.x", 0.0);
    scene.add_property(HEAD, "opacity", 1.0);
    scene.add_mesh(BODY, 2);
    scene
}

fn authored_rig(scene: &PropertySheet) -> Rig {
    let mut rig = Rig::new();
    let yaw = rig.add_parameter(Parameter::line("head_yaw", vec![0.0, 0.5, 1.0]).unwrap());
    let look = rig.add_parameter(
        Parameter::plane("look", vec![0.0, 1.0], vec![0.0, 0.5, 1.0]).unwrap(),
    );

    let x = rig
        .bind_value(yaw, scene, HEAD, "transform.t.x", MergeMode::Additive)
        .unwrap();
    let value = rig.value_binding_mut(yaw, x).unwrap();
    value.set_value(0, 0, -30.0).unwrap();
    value.set_value(2, 0, 30.0).unwrap();

    let fade = rig
        .bind_value(look, scene, HEAD, "opacity", MergeMode::Multiplicative)
        .unwrap();
    rig.value_binding_mut(look, fade).unwrap().set_value(1, 2, 0.25).unwrap();

    let deform = rig.bind_deformation(look, scene, BODY, MergeMode::Forced).unwrap();
    rig.deformation_binding_mut(look, deform)
        .unwrap()
        .set_value(
            0,
            0,
            Deformation::from_offsets(vec![Vec2::new(1.0, 1.0), Vec2::new(-1.0, 0.0)]),
        )
        .unwrap();

    rig.parameter_mut(yaw).unwrap().set_base(Vec2::new(0.75, 0.0));
    rig.parameter_mut(look)
        .unwrap()
        .set_range(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
    rig.parameter_mut(look).unwrap().set_base(Vec2::new(1.0, 1.0));
    rig
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn reloaded_rig_produces_the_same_frame() {
    let mut scene_a = scene();
    let mut scene_b = scene();

    let mut original = authored_rig(&scene_a);
    let json = original.to_json().unwrap();
    let mut reloaded = Rig::from_json(&json).unwrap();

    original.begin_frame();
    original.apply(&mut scene_a);
    reloaded.begin_frame();
    let stats = reloaded.apply(&mut scene_b);

    assert_eq!(stats.resolved, 3);
    assert!(approx(scene_b.offset(HEAD, "transform.t.x").unwrap(), 15.0));
    assert!(approx(scene_b.offset(HEAD, "opacity").unwrap(), 0.25));
    assert_eq!(
        scene_a.offset(HEAD, "transform.t.x"),
        scene_b.offset(HEAD, "transform.t.x")
    );
    assert_eq!(scene_a.deformation(BODY), scene_b.deformation(BODY));
}

#[test]
fn reload_preserves_identity_and_order() {
    let scene = scene();
    let original = authored_rig(&scene);
    let reloaded = Rig::from_json(&original.to_json().unwrap()).unwrap();

    let names = |rig: &Rig| {
        rig.bindings()
            .map(|(key, b)| (rig.parameter(key).unwrap().name().to_owned(), b.target().clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(names(&original), names(&reloaded));

    for (_, p) in original.parameters() {
        let key = reloaded.find_parameter(p.name()).unwrap();
        let q = reloaded.parameter(key).unwrap();
        assert_eq!(p.id(), q.id());
        assert_eq!(p.axes(), q.axes());
        assert_eq!(p.range(), q.range());
        assert_eq!(p.base(), q.base());
    }
    assert_eq!(original.to_desc(), reloaded.to_desc());
}

#[test]
fn document_uses_mode_names_and_masks() {
    let scene = scene();
    let desc = authored_rig(&scene).to_desc();
    let json: serde_json::Value = serde_json::to_value(&desc).unwrap();

    let yaw = &json["parameters"][0];
    assert_eq!(yaw["name"], "head_yaw");
    let binding = &yaw["bindings"][0];
    assert_eq!(binding["kind"], "value");
    assert_eq!(binding["merge_mode"], "Additive");
    assert_eq!(binding["is_set"], json!([[true], [false], [true]]));

    let look = &json["parameters"][1];
    assert_eq!(look["bindings"][0]["merge_mode"], "Multiplicative");
    assert_eq!(look["bindings"][1]["kind"], "deformation");
    assert_eq!(look["bindings"][1]["merge_mode"], "Forced");
}

// ============================================================================
// Loading rules
// ============================================================================

#[test]
fn non_explicit_values_are_discarded() {
    // The middle cell holds a stale inferred value; only the mask counts.
    let doc = json!({
        "parameters": [{
            "id": 9,
            "name": "yaw",
            "axis_points": [[0.0, 0.5, 1.0]],
            "bindings": [{
                "kind": "value",
                "node": 3,
                "key": "transform.t.x",
                "values": [[0.0], [999.0], [10.0]],
                "is_set": [[true], [false], [true]]
            }]
        }]
    });
    let rig = Rig::from_json(&doc.to_string()).unwrap();
    let key = rig.find_parameter("yaw").unwrap();
    let parameter = rig.parameter(key).unwrap();
    let binding = &parameter.bindings()[0];

    assert_eq!(parameter.id().0, 9);
    assert_eq!(binding.mode(), MergeMode::Additive);
    assert!(!binding.is_set(1, 0));
    assert!(binding.is_stale());

    let value = binding.as_value().unwrap();
    assert!(approx(value.resolve(parameter.axes(), Vec2::new(0.5, 0.0)), 5.0));
}

#[test]
fn mismatched_tables_are_fitted() {
    let doc = json!({
        "parameters": [{
            "name": "p",
            "axis_points": [[0.0, 1.0]],
            "bindings": [{
                "kind": "value",
                "node": 3,
                "key": "opacity",
                "values": [[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]],
                "is_set": [[true, true], [true, true], [true, true]],
                "merge_mode": "Forced"
            }]
        }]
    });
    let rig = Rig::from_json(&doc.to_string()).unwrap();
    let key = rig.find_parameter("p").unwrap();
    let binding = &rig.parameter(key).unwrap().bindings()[0];

    assert_eq!(binding.dims(), [2, 1]);
    assert_eq!(binding.explicit_count(), 2);
    assert_eq!(binding.as_value().unwrap().value(1, 0), Some(2.0));
}

#[test]
fn deformation_cells_are_fitted_to_vertex_count() {
    let doc = json!({
        "parameters": [{
            "name": "breath",
            "axis_points": [[0.0, 1.0]],
            "bindings": [{
                "kind": "deformation",
                "node": 4,
                "vertex_count": 2,
                "values": [[[[1.0, 0.0]]], [[[0.0, 1.0], [0.0, 2.0], [5.0, 5.0]]]],
                "is_set": [[true], [true]]
            }]
        }]
    });
    let rig = Rig::from_json(&doc.to_string()).unwrap();
    let key = rig.find_parameter("breath").unwrap();
    let deformation = rig.parameter(key).unwrap().bindings()[0]
        .as_deformation()
        .unwrap();

    assert_eq!(deformation.vertex_count(), 2);
    assert_eq!(
        deformation.value(0, 0).unwrap().offsets,
        vec![Vec2::new(1.0, 0.0), Vec2::ZERO]
    );
    assert_eq!(deformation.value(1, 0).unwrap().vertex_count(), 2);
}

#[test]
fn malformed_axis_points_fail_the_load() {
    let doc = json!({
        "parameters": [{ "name": "bad", "axis_points": [[0.0, 0.7, 0.3, 1.0]] }]
    });
    assert!(matches!(
        Rig::from_json(&doc.to_string()),
        Err(RigError::InvalidAxis { .. })
    ));
    assert!(matches!(
        Rig::from_json("{ not json"),
        Err(RigError::JsonError(_))
    ));
}

#[test]
fn value_binding_on_mesh_key_fails_the_load() {
    let doc = json!({
        "parameters": [{
            "name": "p",
            "axis_points": [[0.0, 1.0]],
            "bindings": [{
                "kind": "value",
                "node": 4,
                "key": "deform",
                "values": [[1.0], [2.0]],
                "is_set": [[true], [true]]
            }]
        }]
    });
    assert!(matches!(
        Rig::from_json(&doc.to_string()),
        Err(RigError::KindMismatch { expected: "value", .. })
    ));
}

#[test]
fn unordered_bindings_load_after_ordered_ones() {
    let desc: RigDesc = serde_json::from_value(json!({
        "parameters": [{
            "name": "p",
            "axis_points": [[0.0, 1.0]],
            "bindings": [
                { "kind": "value", "node": 3, "key": "a", "values": [[0.0], [0.0]], "is_set": [[false], [false]] },
                { "kind": "value", "node": 3, "key": "b", "values": [[0.0], [0.0]], "is_set": [[false], [false]], "order": 1 },
                { "kind": "value", "node": 3, "key": "c", "values": [[0.0], [0.0]], "is_set": [[false], [false]], "order": 0 }
            ]
        }]
    }))
    .unwrap();
    assert!(matches!(desc.parameters[0].bindings[0], BindingDesc::Value { order: None, .. }));

    let rig = Rig::from_desc(&desc).unwrap();
    let keys: Vec<String> = rig.bindings().map(|(_, b)| b.target().key.clone()).collect();
    assert_eq!(keys, ["c", "b", "a"]);
}
