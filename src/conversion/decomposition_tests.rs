use float_cmp::{ApproxEq, F64Margin, FloatMargin};
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::{
    conversion::{convert, ConversionOptions, ConvertedRobot},
    description::{
        elements::{Collision, Geometry, Inertial, Joint, JointKind, Link, Visual},
        tree::RobotDescription,
    },
    geometry::ShapeKind,
    pose::Pose,
    registry::{EntityCategory, EntityID},
    ConversionWarning,
};

use super::needs_grouping;

fn at(x: f64, y: f64, z: f64) -> Pose {
    Pose::new(Vector3::new(x, y, z), UnitQuaternion::identity())
}

fn cube() -> Geometry {
    Geometry::Box {
        size: Vector3::new(0.1, 0.1, 0.1),
    }
}

fn mesh(filename: &str) -> Geometry {
    Geometry::Mesh {
        filename: filename.to_string(),
        scale: Vector3::new(1.0, 1.0, 1.0),
    }
}

fn visual(name: &str, origin: Pose, geometry: Geometry) -> Visual {
    Visual {
        name: name.to_string(),
        origin,
        geometry,
        material_name: String::new(),
    }
}

fn collision(name: &str, origin: Pose, geometry: Geometry) -> Collision {
    Collision {
        name: name.to_string(),
        origin,
        geometry,
    }
}

fn inertial(origin: Pose) -> Inertial {
    Inertial {
        origin,
        mass: 1.5,
        inertia: Matrix3::identity(),
    }
}

fn convert_links(links: Vec<Link>, joints: Vec<Joint>) -> ConvertedRobot {
    let description = RobotDescription::new("robot", links, joints, vec![]).unwrap();
    convert(&description, None, &ConversionOptions::default(), 1).unwrap()
}

fn convert_single(link: Link) -> ConvertedRobot {
    convert_links(vec![link], vec![])
}

fn assert_position(expected: Vector3<f64>, actual: &Vector3<f64>) {
    let margin = F64Margin {
        ulps: 2,
        epsilon: 1e-12,
    };
    for i in 0..3 {
        assert!(
            expected[i].approx_eq(actual[i], margin),
            "expected {:?} but got {:?}",
            expected,
            actual
        );
    }
}

#[test]
fn when_link_has_one_coinciding_visual_and_collision_should_create_one_node() {
    let link = Link::new("base")
        .with_inertial(inertial(at(0.0, 0.0, 0.2)))
        .with_visual(visual("base_visual", at(0.0, 0.0, 0.2), cube()))
        .with_collision(collision("base_collision", at(0.0, 0.0, 0.2), cube()));

    assert!(!needs_grouping(&link));

    let robot = convert_single(link);

    assert_eq!(1, robot.nodes.len());
    let node = &robot.nodes[0];
    assert_eq!(EntityID::new(1), node.id);
    assert_eq!(0, node.group_id);
    assert!(node.relative_id.is_none());
    assert_eq!(Some(1.5), node.mass);
    assert_eq!(Some(Matrix3::identity()), node.inertia);
    assert_position(Vector3::new(0.0, 0.0, 0.2), &node.position);
    assert_position(Vector3::zeros(), &node.visual.position);
    assert_eq!(ShapeKind::Box, node.collision.physic_mode);
    assert_eq!(None, node.collision.bitmask);
    assert_eq!(robot.root_node, node.id);
}

#[test]
fn when_link_has_two_extra_collisions_and_one_extra_visual_should_create_three_nodes() {
    let link = Link::new("base")
        .with_visual(visual("v0", at(0.0, 0.0, 0.0), cube()))
        .with_visual(visual("v1", at(1.0, 0.0, 0.0), cube()))
        .with_collision(collision("c0", at(0.0, 0.0, 0.0), cube()))
        .with_collision(collision("c1", at(1.0, 0.0, 0.0), cube()))
        .with_collision(collision("c2", at(0.0, 1.0, 0.0), cube()));

    let robot = convert_single(link);

    assert_eq!(3, robot.nodes.len());
    let primary = &robot.nodes[0];
    let first = &robot.nodes[1];
    let second = &robot.nodes[2];

    assert_eq!("base", primary.name);
    assert_eq!("c1", first.name);
    assert_eq!("c2", second.name);

    assert!(primary.group_id > 0);
    assert_eq!(primary.group_id, first.group_id);
    assert_eq!(primary.group_id, second.group_id);

    assert_eq!(primary.id, first.relative_id);
    assert_eq!(primary.id, second.relative_id);
    assert_position(Vector3::new(1.0, 0.0, 0.0), &first.position);
    assert_position(Vector3::new(0.0, 1.0, 0.0), &second.position);

    // The first auxiliary node carries the extra visual, the second one a fallback visual
    assert_position(Vector3::zeros(), &first.visual.position);
    assert_eq!("", first.visual.material_name);
    assert_eq!("_fakeMaterial", second.visual.material_name);
    assert_eq!(Vector3::new(0.01, 0.01, 0.01), second.visual.shape.size);

    assert_eq!(Some(0.001), first.mass);
    assert_eq!(Some(0.0), first.density);

    assert_eq!(Some(first.id), robot.registry.collision_owner("c1"));
    assert_eq!(Some(second.id), robot.registry.collision_owner("c2"));
    assert_eq!(Some(primary.id), robot.registry.collision_owner("c0"));
    assert_eq!(Some("base"), robot.registry.visual_owner("v1"));
}

#[test]
fn when_parent_has_no_inertial_should_express_child_pose_in_parent_collision_frame() {
    let links = vec![
        Link::new("root"),
        Link::new("a").with_collision(collision("a_collision", at(0.0, 0.0, 0.5), cube())),
        Link::new("b"),
    ];
    let joints = vec![
        Joint::new("root_a", JointKind::Fixed, "root", "a", at(0.0, 0.0, 0.0)),
        Joint::new("a_b", JointKind::Fixed, "a", "b", at(1.0, 0.0, 0.0)),
    ];

    let robot = convert_links(links, joints);

    let a = robot.node_by_name("a").unwrap();
    let b = robot.node_by_name("b").unwrap();
    assert_eq!(a.id, b.relative_id);
    assert_position(Vector3::new(1.0, 0.0, -0.5), &b.position);

    // Without inertial the node frame is the collision frame, so the link does not split
    assert_eq!(0, a.group_id);
    assert_eq!(None, a.mass);
    assert_position(Vector3::new(0.0, 0.0, 0.5), &a.position);
}

#[test]
fn when_child_has_inertial_should_compose_joint_and_inertial_origin() {
    let quarter_turn =
        Pose::from_xyz_rpy(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.5 * std::f64::consts::PI));
    let links = vec![
        Link::new("root").with_inertial(inertial(at(0.0, 0.0, 1.0))),
        Link::new("arm").with_inertial(inertial(at(0.5, 0.0, 0.0))),
    ];
    let joints = vec![Joint::new("j", JointKind::Revolute, "root", "arm", quarter_turn)];

    let robot = convert_links(links, joints);

    let arm = robot.node_by_name("arm").unwrap();
    // joint (1,0,0) + rotated inertial offset (0,0.5,0), relative to the parent inertial (0,0,1)
    assert_position(Vector3::new(1.0, 0.5, -1.0), &arm.position);
    assert!(arm
        .rotation
        .angle()
        .approx_eq(0.5 * std::f64::consts::PI, F64Margin::default().epsilon(1e-12)));
}

#[test]
fn when_collision_and_inertial_frames_differ_within_tolerance_should_not_split() {
    let link = Link::new("base")
        .with_inertial(inertial(at(0.0, 0.0, 0.0)))
        .with_collision(collision("c", at(1e-12, 0.0, 0.0), cube()));

    assert!(!needs_grouping(&link));
    assert_eq!(1, convert_single(link).nodes.len());
}

#[test]
fn when_collision_and_inertial_frames_differ_beyond_tolerance_should_split() {
    let offsets = [
        Pose::new(Vector3::new(1e-9, 0.0, 0.0), UnitQuaternion::identity()),
        Pose::new(Vector3::new(0.0, 1e-9, 0.0), UnitQuaternion::identity()),
        Pose::new(Vector3::new(0.0, 0.0, 1e-9), UnitQuaternion::identity()),
        Pose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1e-8),
        ),
    ];

    for offset in offsets {
        let link = Link::new("base")
            .with_inertial(inertial(Pose::identity()))
            .with_collision(collision("c", offset, cube()));

        assert!(needs_grouping(&link));

        let robot = convert_single(link);
        assert_eq!(2, robot.nodes.len());

        // The primary node keeps a placeholder collision that never collides
        let primary = &robot.nodes[0];
        assert_eq!(Some(0), primary.collision.bitmask);
        assert_eq!(Vector3::new(0.01, 0.01, 0.01), primary.collision.extents);

        let auxiliary = &robot.nodes[1];
        assert_eq!("c", auxiliary.name);
        assert_eq!(None, auxiliary.collision.bitmask);
        assert_eq!(Some(auxiliary.id), robot.registry.collision_owner("c"));
    }
}

#[test]
fn when_collision_mesh_differs_from_visual_mesh_should_move_visual_to_its_own_node() {
    let link = Link::new("hull")
        .with_visual(visual("hull_visual", at(0.0, 0.0, 0.3), mesh("hull_fine.dae")))
        .with_collision(collision("hull_collision", at(0.0, 0.0, 0.0), mesh("hull_coarse.stl")));

    let robot = convert_single(link);

    assert_eq!(2, robot.nodes.len());
    let primary = &robot.nodes[0];
    assert!(primary.group_id > 0);
    assert_eq!("hull_coarse.stl", primary.collision.filename);
    assert_eq!("_fakeMaterial", primary.visual.material_name);

    let visual_node = &robot.nodes[1];
    assert_eq!("hull_visual", visual_node.name);
    assert_eq!("hull_fine.dae", visual_node.visual.shape.filename);
    assert_position(Vector3::new(0.0, 0.0, 0.3), &visual_node.position);
    assert_position(Vector3::zeros(), &visual_node.visual.position);
    assert_eq!(Vector3::new(0.001, 0.001, 0.001), visual_node.collision.extents);
    assert_eq!(Some(0), visual_node.collision.bitmask);
    assert_eq!(Some(0.001), visual_node.mass);
    assert!(!visual_node.no_physical);
}

#[test]
fn when_collision_mesh_matches_visual_mesh_should_create_one_node() {
    let link = Link::new("hull")
        .with_visual(visual("v", at(0.0, 0.0, 0.0), mesh("hull.stl")))
        .with_collision(collision("c", at(0.0, 0.0, 0.0), mesh("hull.stl")));

    assert!(!needs_grouping(&link));
    assert_eq!(1, convert_single(link).nodes.len());
}

#[test]
fn when_visual_is_a_mesh_and_collision_a_primitive_should_create_one_node() {
    let link = Link::new("hull")
        .with_visual(visual("v", at(0.0, 0.0, 0.0), mesh("hull.stl")))
        .with_collision(collision("c", at(0.0, 0.0, 0.0), cube()));

    assert!(!needs_grouping(&link));
}

#[test]
fn when_extra_visual_is_not_compatible_with_extra_collision_should_not_pair_them() {
    let link = Link::new("base")
        .with_visual(visual("v0", at(0.0, 0.0, 0.0), cube()))
        .with_visual(visual("v1", at(0.0, 0.0, 2.0), mesh("decor.dae")))
        .with_collision(collision("c0", at(0.0, 0.0, 0.0), cube()))
        .with_collision(collision("c1", at(1.0, 0.0, 0.0), cube()));

    let robot = convert_single(link);

    let names: Vec<&str> = robot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(vec!["base", "c1", "v1"], names);
    assert_eq!("_fakeMaterial", robot.nodes[1].visual.material_name);
    assert_eq!("decor.dae", robot.nodes[2].visual.shape.filename);
}

#[test]
fn when_a_mesh_collision_refuses_the_next_visual_should_offer_it_to_the_following_collision() {
    let link = Link::new("base")
        .with_visual(visual("v0", at(0.0, 0.0, 0.0), cube()))
        .with_visual(visual("v1", at(0.0, 2.0, 0.0), cube()))
        .with_collision(collision("c0", at(0.0, 0.0, 0.0), cube()))
        .with_collision(collision("c1", at(1.0, 0.0, 0.0), mesh("bumper.stl")))
        .with_collision(collision("c2", at(0.0, 2.0, 0.0), cube()));

    let robot = convert_single(link);

    let names: Vec<&str> = robot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(vec!["base", "c1", "c2"], names);
    assert_eq!("_fakeMaterial", robot.nodes[1].visual.material_name);
    assert_eq!("", robot.nodes[2].visual.material_name);
    assert_eq!(Vector3::new(0.1, 0.1, 0.1), robot.nodes[2].visual.shape.size);
    assert_position(Vector3::zeros(), &robot.nodes[2].visual.position);
    assert_eq!(Some("base"), robot.registry.visual_owner("v1"));
}

#[test]
fn when_a_visual_gets_its_own_node_should_map_the_visual_to_that_node() {
    let link = Link::new("mast")
        .with_visual(visual("mast_visual", at(0.0, 0.0, 0.0), cube()))
        .with_visual(visual("antenna", at(0.0, 0.0, 1.0), cube()));

    let robot = convert_single(link);

    let names: Vec<&str> = robot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(vec!["mast", "antenna"], names);
    assert_eq!(Some("mast"), robot.registry.visual_owner("mast_visual"));
    assert_eq!(Some("antenna"), robot.registry.visual_owner("antenna"));
}

#[test]
fn when_paired_visual_is_offset_should_express_it_relative_to_the_auxiliary_node() {
    let link = Link::new("base")
        .with_inertial(inertial(at(0.0, 0.0, 1.0)))
        .with_collision(collision("c0", at(0.0, 0.0, 1.0), cube()))
        .with_collision(collision("c1", at(2.0, 0.0, 1.0), cube()))
        .with_visual(visual("v0", at(0.0, 0.0, 1.5), cube()))
        .with_visual(visual("v1", at(2.0, 0.0, 1.25), cube()));

    let robot = convert_single(link);

    assert_position(Vector3::new(0.0, 0.0, 0.5), &robot.nodes[0].visual.position);
    assert_position(Vector3::new(2.0, 0.0, 0.0), &robot.nodes[1].position);
    assert_position(Vector3::new(0.0, 0.0, 0.25), &robot.nodes[1].visual.position);
}

#[test]
fn when_link_has_no_shapes_should_use_fallback_shapes() {
    let robot = convert_single(Link::new("empty"));

    let node = &robot.nodes[0];
    assert_eq!(0, node.group_id);
    assert_eq!(None, node.mass);
    assert_eq!(ShapeKind::Box, node.visual.shape.kind);
    assert_eq!("_fakeMaterial", node.visual.material_name);
    assert_eq!(Some(0), node.collision.bitmask);
}

#[test]
fn when_extra_shapes_are_unnamed_should_name_auxiliary_nodes_after_the_link() {
    let link = Link::new("arm")
        .with_collision(collision("", at(0.0, 0.0, 0.0), cube()))
        .with_collision(collision("", at(1.0, 0.0, 0.0), cube()))
        .with_collision(collision("", at(2.0, 0.0, 0.0), cube()));

    let robot = convert_single(link);

    let names: Vec<&str> = robot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(vec!["arm", "arm_child", "arm_child_2"], names);
    assert_eq!(
        vec![ConversionWarning::RenamedNode {
            preferred: "arm_child".to_string(),
            assigned: "arm_child_2".to_string()
        }],
        robot.warnings
    );
}

#[test]
fn when_a_shape_is_named_like_a_later_link_should_rename_the_auxiliary_node() {
    let links = vec![
        Link::new("base")
            .with_collision(collision("c0", at(0.0, 0.0, 0.0), cube()))
            .with_collision(collision("wheel", at(1.0, 0.0, 0.0), cube())),
        Link::new("wheel"),
    ];
    let joints = vec![Joint::new("j", JointKind::Continuous, "base", "wheel", at(1.0, 0.0, 0.0))];

    let robot = convert_links(links, joints);

    let names: Vec<&str> = robot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(vec!["base", "wheel_2", "wheel"], names);
    assert_eq!(
        robot.registry.resolve(EntityCategory::Node, "wheel"),
        Some(robot.nodes[2].id)
    );
}

#[test]
fn when_several_links_split_should_hand_out_consecutive_group_ids() {
    let split = |name: &str| {
        Link::new(name)
            .with_collision(collision("", at(0.0, 0.0, 0.0), cube()))
            .with_collision(collision("", at(1.0, 0.0, 0.0), cube()))
    };
    let links = vec![split("a"), Link::new("b"), split("c")];
    let joints = vec![
        Joint::new("ab", JointKind::Fixed, "a", "b", Pose::identity()),
        Joint::new("bc", JointKind::Fixed, "b", "c", Pose::identity()),
    ];
    let description = RobotDescription::new("robot", links, joints, vec![]).unwrap();

    let robot = convert(&description, None, &ConversionOptions::default(), 5).unwrap();

    assert_eq!(5, robot.node_by_name("a").unwrap().group_id);
    assert_eq!(0, robot.node_by_name("b").unwrap().group_id);
    assert_eq!(6, robot.node_by_name("c").unwrap().group_id);
}

#[test]
fn when_nodes_are_created_ids_should_follow_the_pre_order_walk_without_gaps() {
    let links = vec![
        Link::new("root")
            .with_collision(collision("", at(0.0, 0.0, 0.0), cube()))
            .with_collision(collision("", at(1.0, 0.0, 0.0), cube())),
        Link::new("left"),
        Link::new("right"),
    ];
    let joints = vec![
        Joint::new("l", JointKind::Fixed, "root", "left", Pose::identity()),
        Joint::new("r", JointKind::Fixed, "root", "right", Pose::identity()),
    ];

    let robot = convert_links(links, joints);

    let ids: Vec<u64> = robot.nodes.iter().map(|n| n.id.value()).collect();
    assert_eq!(vec![1, 2, 3, 4], ids);
    let names: Vec<&str> = robot.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(vec!["root", "root_child", "left", "right"], names);
}

#[test]
fn when_a_shape_is_unsupported_should_warn_with_the_shape_name() {
    let link = Link::new("arm").with_collision(collision(
        "arm_capsule",
        Pose::identity(),
        Geometry::Unsupported {
            kind: "capsule".to_string(),
        },
    ));

    let robot = convert_single(link);

    assert_eq!(Vector3::zeros(), robot.nodes[0].collision.extents);
    assert_eq!(
        vec![ConversionWarning::UnsupportedGeometry {
            shape: "arm_capsule".to_string(),
            kind: "capsule".to_string()
        }],
        robot.warnings
    );
}
