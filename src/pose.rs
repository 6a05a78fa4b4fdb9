//! Defines rigid transforms (position + rotation) and the operations used to move poses between
//! the frames of a kinematic tree.
//!
//! All poses are parent-relative: a pose describes where a child frame sits in its parent frame.
//! Composition therefore reads left to right from the outermost frame inwards, i.e.
//! `world_to_link.compose(&link_to_visual)` is the pose of the visual in the world frame.

extern crate nalgebra as na;

use std::fmt::Display;

use float_cmp::{ApproxEq, F64Margin};
use na::{Isometry3, Translation3, UnitQuaternion, Vector3};

#[cfg(test)]
#[path = "pose_tests.rs"]
mod pose_tests;

/// The absolute tolerance used when comparing two poses component by component.
pub const POSE_EQUALITY_TOLERANCE: f64 = 1e-11;

/// Defines a rigid transform relative to a parent frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// The position of the frame origin in the parent frame.
    position: Vector3<f64>,

    /// The orientation of the frame relative to the parent frame.
    rotation: UnitQuaternion<f64>,
}

impl Pose {
    /// Returns a value indicating whether the two poses are equal within
    /// [POSE_EQUALITY_TOLERANCE].
    ///
    /// The comparison is done independently on the three position components and the four
    /// quaternion components. Two poses are only equal if all seven components are within the
    /// tolerance. Note that a quaternion and its negation describe the same rotation but are not
    /// considered equal here.
    pub fn approx_eq(&self, other: &Pose) -> bool {
        let margin = F64Margin {
            epsilon: POSE_EQUALITY_TOLERANCE,
            ulps: 0,
        };

        let positions_match = self
            .position
            .iter()
            .zip(other.position.iter())
            .all(|(a, b)| (*a).approx_eq(*b, margin));

        let rotations_match = self
            .rotation
            .coords
            .iter()
            .zip(other.rotation.coords.iter())
            .all(|(a, b)| (*a).approx_eq(*b, margin));

        positions_match && rotations_match
    }

    /// Returns the pose of `child` expressed in the parent frame of the current pose.
    ///
    /// The child position is rotated by the current rotation and then translated by the current
    /// position. The rotations are multiplied and renormalized to keep drift out of long chains.
    ///
    /// ## Parameters
    ///
    /// * 'child' - The pose of a frame expressed relative to the current pose.
    pub fn compose(&self, child: &Pose) -> Pose {
        let position = self.position + self.rotation * child.position;
        let mut rotation = self.rotation * child.rotation;
        rotation.renormalize();

        Pose { position, rotation }
    }

    /// Creates a new [Pose] from a position and Euler angles in degrees (roll, pitch, yaw).
    pub fn from_position_and_euler_degrees(position: Vector3<f64>, euler: Vector3<f64>) -> Self {
        Self::from_xyz_rpy(position, euler.map(f64::to_radians))
    }

    /// Creates a new [Pose] from a position and roll, pitch, yaw angles in radians, as used by
    /// URDF `origin` elements.
    pub fn from_xyz_rpy(xyz: Vector3<f64>, rpy: Vector3<f64>) -> Self {
        Self {
            position: xyz,
            rotation: UnitQuaternion::from_euler_angles(rpy.x, rpy.y, rpy.z),
        }
    }

    /// Returns the identity pose, i.e. a frame that coincides with its parent.
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Returns the inverse of the current pose.
    ///
    /// The inverse rotation is applied to the negated position, so that
    /// `pose.inverse().compose(&pose)` is the identity.
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        let position = rotation * (-self.position);

        Pose { position, rotation }
    }

    /// Creates a new [Pose].
    ///
    /// ## Parameters
    ///
    /// * 'position' - The position of the frame in the parent frame.
    /// * 'rotation' - The orientation of the frame relative to the parent frame.
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// Returns the position of the frame in the parent frame.
    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    /// Returns the current pose expressed relative to the `frame` pose.
    ///
    /// Both poses must be expressed in the same parent frame. This is used whenever "the pose of
    /// A relative to frame B" is needed, e.g. the offset of a visual relative to the inertial
    /// frame of the same link.
    ///
    /// ## Parameters
    ///
    /// * 'frame' - The pose of the frame in which the result should be expressed.
    pub fn relative_to(&self, frame: &Pose) -> Pose {
        frame.inverse().compose(self)
    }

    /// Returns the orientation of the frame relative to the parent frame.
    pub fn rotation(&self) -> &UnitQuaternion<f64> {
        &self.rotation
    }

    /// Returns the pose as a nalgebra [Isometry3].
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let q = &self.rotation;
        write!(
            f,
            "Pose [position: ({}, {}, {}), rotation: ({}, {}, {}, {})]",
            self.position.x, self.position.y, self.position.z, q.w, q.i, q.j, q.k
        )
    }
}

impl From<Isometry3<f64>> for Pose {
    fn from(isometry: Isometry3<f64>) -> Self {
        Self {
            position: isometry.translation.vector,
            rotation: isometry.rotation,
        }
    }
}
