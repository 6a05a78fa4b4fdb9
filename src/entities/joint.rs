extern crate nalgebra as na;

use std::fmt::Display;

use na::Vector3;

use crate::{config::ConfigMap, description::elements::JointLimits, registry::EntityID};

/// Defines the joint types of the simulation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SimJointKind {
    /// A rotation around the joint axis.
    Hinge,
    /// A translation along the joint axis.
    Slider,
    /// A rigid connection.
    Fixed,
}

impl Display for SimJointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimJointKind::Hinge => "hinge",
            SimJointKind::Slider => "slider",
            SimJointKind::Fixed => "fixed",
        };
        write!(f, "{}", name)
    }
}

/// Defines a joint between two nodes of the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimJoint {
    /// The id of the joint.
    pub id: EntityID,
    /// The unique name of the joint.
    pub name: String,
    /// The node on the parent side of the joint.
    pub parent_node: EntityID,
    /// The node on the child side of the joint.
    pub child_node: EntityID,
    /// The joint type.
    pub kind: SimJointKind,
    /// The joint axis in the robot frame.
    pub axis: Vector3<f64>,
    /// The pivot point in the robot frame.
    pub anchor: Vector3<f64>,
    /// The motion range, `None` for an unconstrained joint.
    pub limits: Option<JointLimits>,
    /// Additional fields for the simulation.
    pub extra: ConfigMap,
}
