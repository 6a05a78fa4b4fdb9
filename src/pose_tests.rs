use std::f64::consts::PI;

use float_cmp::{ApproxEq, F64Margin, FloatMargin};
use nalgebra::{UnitQuaternion, Vector3};

use super::{Pose, POSE_EQUALITY_TOLERANCE};

fn assert_vector_eq(expected: &Vector3<f64>, actual: &Vector3<f64>) {
    for (e, a) in expected.iter().zip(actual.iter()) {
        assert!(
            (*e).approx_eq(
                *a,
                F64Margin {
                    ulps: 2,
                    epsilon: 1e-9
                }
            ),
            "expected {:?} but got {:?}",
            expected,
            actual
        );
    }
}

fn sample_poses() -> Vec<Pose> {
    vec![
        Pose::identity(),
        Pose::new(Vector3::new(1.0, 2.0, 3.0), UnitQuaternion::identity()),
        Pose::from_xyz_rpy(Vector3::new(-0.5, 0.25, 4.0), Vector3::new(0.1, -0.7, 2.3)),
        Pose::from_xyz_rpy(Vector3::new(0.0, 0.0, 0.0), Vector3::new(PI, 0.0, 0.0)),
        Pose::from_xyz_rpy(Vector3::new(10.0, -3.0, 0.5), Vector3::new(0.5 * PI, 0.25 * PI, -PI)),
    ]
}

#[test]
fn when_composing_the_inverse_with_the_pose_should_be_identity() {
    for pose in sample_poses() {
        let result = pose.inverse().compose(&pose);

        assert_vector_eq(&Vector3::zeros(), result.position());
        assert!(
            result.rotation().angle() < 1e-9,
            "rotation of {} should be identity",
            result
        );
    }
}

#[test]
fn when_composing_the_pose_with_the_inverse_should_be_identity() {
    for pose in sample_poses() {
        let result = pose.compose(&pose.inverse());

        assert_vector_eq(&Vector3::zeros(), result.position());
        assert!(result.rotation().angle() < 1e-9);
    }
}

#[test]
fn when_composing_should_rotate_then_translate_the_child_position() {
    let parent = Pose::from_xyz_rpy(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.5 * PI));
    let child = Pose::new(Vector3::new(1.0, 0.0, 0.0), UnitQuaternion::identity());

    let result = parent.compose(&child);

    assert_vector_eq(&Vector3::new(1.0, 1.0, 0.0), result.position());
    assert!(result
        .rotation()
        .angle_to(parent.rotation())
        .approx_eq(0.0, F64Margin::default().epsilon(1e-12)));
}

#[test]
fn when_inverting_should_negate_and_rotate_the_position() {
    let pose = Pose::from_xyz_rpy(Vector3::new(1.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 0.5 * PI));

    let inverse = pose.inverse();

    // R^-1 * (-p) with R a quarter turn around z
    assert_vector_eq(&Vector3::new(-2.0, 1.0, 0.0), inverse.position());
}

#[test]
fn when_computing_relative_pose_should_express_it_in_the_target_frame() {
    let frame = Pose::from_xyz_rpy(Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, 0.5 * PI));
    let pose = Pose::new(Vector3::new(1.0, 0.0, 1.0), UnitQuaternion::identity());

    let relative = pose.relative_to(&frame);

    assert_vector_eq(&Vector3::new(0.0, -1.0, 0.0), relative.position());

    // Going back out of the frame should give the original pose
    let restored = frame.compose(&relative);
    assert_vector_eq(pose.position(), restored.position());
    assert!(restored.rotation().angle_to(pose.rotation()) < 1e-9);
}

#[test]
fn when_computing_pose_relative_to_itself_should_be_identity() {
    for pose in sample_poses() {
        let relative = pose.relative_to(&pose);
        assert_vector_eq(&Vector3::zeros(), relative.position());
        assert!(relative.rotation().angle() < 1e-9);
    }
}

#[test]
fn when_composing_long_chains_should_keep_rotation_normalized() {
    let step = Pose::from_xyz_rpy(Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.01, 0.02, 0.03));
    let mut pose = Pose::identity();
    for _ in 0..10_000 {
        pose = pose.compose(&step);
    }

    let norm = pose.rotation().quaternion().norm();
    assert!(norm.approx_eq(1.0, F64Margin::default().epsilon(1e-12)));
}

#[test]
fn when_comparing_identical_poses_should_be_equal() {
    for pose in sample_poses() {
        let copy = pose;
        assert!(pose.approx_eq(&copy));
    }
}

#[test]
fn when_comparing_poses_within_tolerance_should_be_equal() {
    let pose = Pose::new(Vector3::new(1.0, 2.0, 3.0), UnitQuaternion::identity());
    let other = Pose::new(
        Vector3::new(1.0 + 0.5 * POSE_EQUALITY_TOLERANCE, 2.0, 3.0),
        UnitQuaternion::identity(),
    );

    assert!(pose.approx_eq(&other));
}

#[test]
fn when_any_position_component_differs_beyond_tolerance_should_not_be_equal() {
    let pose = Pose::new(Vector3::new(1.0, 2.0, 3.0), UnitQuaternion::identity());
    let epsilon = 1e-9;

    for axis in 0..3 {
        let mut position = *pose.position();
        position[axis] += epsilon;
        let other = Pose::new(position, UnitQuaternion::identity());

        assert!(
            !pose.approx_eq(&other),
            "poses should differ on axis {}",
            axis
        );
    }
}

#[test]
fn when_rotation_differs_beyond_tolerance_should_not_be_equal() {
    let pose = Pose::identity();

    for axis in [Vector3::x_axis(), Vector3::y_axis(), Vector3::z_axis()] {
        let other = Pose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&axis, 1e-8),
        );

        assert!(!pose.approx_eq(&other));
    }
}

#[test]
fn when_comparing_negated_quaternions_should_not_be_equal() {
    let rotation = UnitQuaternion::from_euler_angles(0.3, 0.2, 0.1);
    let negated = UnitQuaternion::new_unchecked(-rotation.into_inner());

    let pose = Pose::new(Vector3::zeros(), rotation);
    let other = Pose::new(Vector3::zeros(), negated);

    assert!(!pose.approx_eq(&other));
}

#[test]
fn when_creating_from_euler_degrees_should_convert_to_radians() {
    let pose = Pose::from_position_and_euler_degrees(
        Vector3::new(1.0, 2.0, 3.0),
        Vector3::new(0.0, 0.0, 90.0),
    );

    let expected = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5 * PI);
    assert!(pose.rotation().angle_to(&expected) < 1e-12);
    assert_vector_eq(&Vector3::new(1.0, 2.0, 3.0), pose.position());
}

#[test]
fn when_converting_to_isometry_should_keep_the_transform() {
    let pose = Pose::from_xyz_rpy(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.2, 0.4, 0.6));
    let isometry = pose.to_isometry();

    let back = Pose::from(isometry);
    assert!(pose.approx_eq(&back));
}
