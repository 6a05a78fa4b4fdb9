use tracing::debug;

use crate::{
    config::ConfigMap,
    description::{
        elements::JointKind,
        tree::{JointIndex, RobotDescription},
    },
    entities::joint::{SimJoint, SimJointKind},
    registry::EntityCategory,
    Error,
};

use super::ConversionState;

#[cfg(test)]
#[path = "joints_tests.rs"]
mod joints_tests;

/// Returns the simulation joint type for a joint type of the input document. Types without a
/// simulation counterpart become fixed joints.
pub(crate) fn project_kind(kind: &JointKind) -> SimJointKind {
    match kind {
        JointKind::Revolute | JointKind::Continuous => SimJointKind::Hinge,
        JointKind::Prismatic => SimJointKind::Slider,
        _ => SimJointKind::Fixed,
    }
}

/// Creates the simulation joint for a joint of the tree.
///
/// The axis and the anchor are expressed in the frame of the root link. The child link frame
/// coincides with the joint frame, so its global pose gives both the anchor and the rotation
/// that takes the joint axis into the root frame.
///
/// ## Errors
///
/// * [Error::DuplicateName] - Returned when the joint name is already registered.
/// * [Error::UnresolvedReference] - Returned when one of the end point links has no node.
pub(super) fn project_joint(
    state: &mut ConversionState,
    description: &RobotDescription,
    joint_index: JointIndex,
) -> Result<(), Error> {
    let joint = description.joint(joint_index);

    let parent_node =
        state
            .registry
            .resolve_for(EntityCategory::Node, &joint.parent_link, &joint.name)?;
    let child_node =
        state
            .registry
            .resolve_for(EntityCategory::Node, &joint.child_link, &joint.name)?;
    let child_link =
        description
            .link_by_name(&joint.child_link)
            .ok_or_else(|| Error::UnknownLink {
                joint: joint.name.clone(),
                link: joint.child_link.clone(),
            })?;

    let id = state.registry.register(EntityCategory::Joint, &joint.name)?;

    let kind = project_kind(&joint.kind);
    let global = description.global_pose(child_link);

    debug!(
        joint = joint.name.as_str(),
        id = id.value(),
        kind = %kind,
        "Projecting joint"
    );

    state.joints.push(SimJoint {
        id,
        name: joint.name.clone(),
        parent_node,
        child_node,
        kind,
        axis: global.rotation() * joint.axis,
        anchor: *global.position(),
        limits: joint.limits,
        extra: ConfigMap::new(),
    });

    Ok(())
}
