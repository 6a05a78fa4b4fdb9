extern crate nalgebra as na;

use na::{UnitQuaternion, Vector3, Vector4};

use crate::{
    config::{ConfigMap, ConfigValue},
    description::{
        elements::{Collision, Geometry, Joint, JointKind, Link, MaterialDescription, Visual},
        tree::RobotDescription,
    },
    pose::Pose,
    registry::{EntityCategory, EntityID},
    smurf::SmurfOverlay,
    Error,
};

use super::{convert, ConversionOptions};

fn translation(x: f64, y: f64, z: f64) -> Pose {
    Pose::new(Vector3::new(x, y, z), UnitQuaternion::identity())
}

fn sphere_collision(name: &str, origin: Pose) -> Collision {
    Collision {
        name: name.to_string(),
        origin,
        geometry: Geometry::Sphere { radius: 0.1 },
    }
}

fn material(name: &str) -> MaterialDescription {
    MaterialDescription {
        name: name.to_string(),
        color: Vector4::new(0.0, 0.0, 1.0, 1.0),
        texture_filename: String::new(),
    }
}

fn arm(materials: Vec<MaterialDescription>) -> RobotDescription {
    let base = Link::new("base").with_visual(Visual {
        name: String::new(),
        origin: Pose::identity(),
        geometry: Geometry::Box {
            size: Vector3::new(0.4, 0.4, 0.1),
        },
        material_name: "blue".to_string(),
    });
    let upper = Link::new("upper")
        .with_collision(sphere_collision("upper_a", Pose::identity()))
        .with_collision(sphere_collision("upper_b", translation(0.0, 0.0, 0.5)));

    RobotDescription::new(
        "arm",
        vec![Link::new("tool"), base, upper],
        vec![
            Joint::new(
                "shoulder",
                JointKind::Revolute,
                "base",
                "upper",
                translation(0.0, 0.0, 0.1),
            ),
            Joint::new("wrist", JointKind::Fixed, "upper", "tool", translation(0.0, 0.0, 1.0)),
        ],
        materials,
    )
    .unwrap()
}

#[test]
fn when_converting_should_register_the_fallback_material_first() {
    let robot = convert(
        &arm(vec![material("blue"), material("steel")]),
        None,
        &ConversionOptions::default(),
        1,
    )
    .unwrap();

    let names: Vec<(&str, EntityID)> = robot
        .materials
        .iter()
        .map(|m| (m.name.as_str(), m.id))
        .collect();
    assert_eq!(
        vec![
            ("_fakeMaterial", EntityID::new(1)),
            ("blue", EntityID::new(2)),
            ("steel", EntityID::new(3)),
        ],
        names
    );
    assert_eq!(Vector4::new(1.0, 0.0, 0.0, 1.0), robot.materials[0].diffuse);
    assert!(robot.materials[0].exists);
}

#[test]
fn when_a_document_material_uses_the_fallback_name_should_fail() {
    let result = convert(
        &arm(vec![material("_fakeMaterial")]),
        None,
        &ConversionOptions::default(),
        1,
    );

    assert_eq!(
        Err(Error::DuplicateName {
            category: EntityCategory::Material,
            name: "_fakeMaterial".to_string(),
        }),
        result.map(|r| r.name)
    );
}

#[test]
fn when_converting_should_hand_out_gapless_ids_in_walk_order() {
    let robot = convert(&arm(vec![]), None, &ConversionOptions::default(), 1).unwrap();

    let nodes: Vec<(&str, u64)> = robot
        .nodes
        .iter()
        .map(|n| (n.name.as_str(), n.id.value()))
        .collect();
    assert_eq!(
        vec![("base", 1), ("upper", 2), ("upper_b", 3), ("tool", 4)],
        nodes
    );

    let joints: Vec<(&str, u64)> = robot
        .joints
        .iter()
        .map(|j| (j.name.as_str(), j.id.value()))
        .collect();
    assert_eq!(vec![("shoulder", 1), ("wrist", 2)], joints);

    assert_eq!(robot.node_by_name("base").unwrap().id, robot.root_node);
    assert_eq!(4, robot.registry.count(EntityCategory::Node));
    assert_eq!(2, robot.registry.count(EntityCategory::Joint));
    assert_eq!(0, robot.registry.count(EntityCategory::Motor));
}

#[test]
fn when_converting_with_a_zero_first_group_should_start_groups_at_one() {
    let robot = convert(&arm(vec![]), None, &ConversionOptions::default(), 0).unwrap();

    assert_eq!(1, robot.node_by_name("upper").unwrap().group_id);
    assert_eq!(1, robot.node_by_name("upper_b").unwrap().group_id);
    assert_eq!(0, robot.node_by_name("base").unwrap().group_id);
}

#[test]
fn when_converting_with_an_empty_overlay_should_match_the_plain_conversion() {
    let description = arm(vec![material("blue")]);
    let options = ConversionOptions::default();

    let plain = convert(&description, None, &options, 3).unwrap();
    let overlaid = convert(&description, Some(&SmurfOverlay::default()), &options, 3).unwrap();

    assert_eq!(plain.nodes, overlaid.nodes);
    assert_eq!(plain.joints, overlaid.joints);
    assert_eq!(plain.materials, overlaid.materials);
    assert!(overlaid.motors.is_empty());
    assert!(overlaid.warnings.is_empty());
}

#[test]
fn when_converting_with_an_overlay_should_resolve_motors_after_the_tree() {
    let motor: ConfigMap = vec![
        ("name", ConfigValue::from("shoulder_motor")),
        ("joint", ConfigValue::from("shoulder")),
    ]
    .into_iter()
    .collect();
    let overlay = SmurfOverlay {
        motors: vec![motor],
        ..Default::default()
    };

    let robot = convert(
        &arm(vec![]),
        Some(&overlay),
        &ConversionOptions::default(),
        1,
    )
    .unwrap();

    assert_eq!(1, robot.motors.len());
    assert_eq!(EntityID::new(1), robot.motors[0].joint_id);
    assert_eq!(
        Some(EntityID::new(1)),
        robot.registry.resolve(EntityCategory::Motor, "shoulder_motor")
    );
}

#[test]
fn when_reading_options_should_keep_defaults_for_missing_fields() {
    let options = ConversionOptions::from_yaml_str(
        "fallback_shape_edge: 0.05\nfallback_material_name: missing\n",
    )
    .unwrap();

    assert_eq!(0.05, options.fallback_shape_edge);
    assert_eq!("missing", options.fallback_material_name);
    assert_eq!(
        ConversionOptions::default().auxiliary_node_mass,
        options.auxiliary_node_mass
    );
    assert!(options.correct_stl_up_axis);
}

#[test]
fn when_reading_empty_options_should_use_the_defaults() {
    assert_eq!(
        ConversionOptions::default(),
        ConversionOptions::from_yaml_str("  \n").unwrap()
    );
}

#[test]
fn when_reading_malformed_options_should_fail() {
    let result = ConversionOptions::from_yaml_str("fallback_shape_edge: [1, 2]\n");

    assert!(matches!(result, Err(Error::InvalidDocument { .. })));
}
