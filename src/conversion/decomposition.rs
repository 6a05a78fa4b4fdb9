//! Splits a link into the nodes of the simulation.
//!
//! A simulation node owns exactly one inertial frame, one collision shape and one visual shape,
//! and its pose is the inertial frame. A link that fits that mould becomes a single node. Any
//! other link becomes a primary node plus auxiliary nodes that share a group id:
//!
//! * the primary collision is only used when it coincides with the inertial frame,
//! * a mesh collision only keeps the primary visual when that visual is the same mesh,
//! * every collision shape that was not used gets its own auxiliary node, paired with the next
//!   unused visual shape when the two are compatible,
//! * every visual shape that is still unused gets a visual only auxiliary node.

extern crate nalgebra as na;

use na::{UnitQuaternion, Vector3};
use tracing::debug;

use crate::{
    config::ConfigMap,
    description::{
        elements::{Collision, Geometry, Link, Visual},
        tree::{LinkIndex, RobotDescription},
    },
    entities::node::{CollisionShape, SimNode, VisualShape},
    geometry::{extract_shape, ShapeDescriptor},
    pose::Pose,
    registry::{EntityCategory, EntityID},
    ConversionWarning, Error,
};

use super::ConversionState;

#[cfg(test)]
#[path = "decomposition_tests.rs"]
mod decomposition_tests;

/// Returns a value indicating whether two shapes can share a node: either both are primitives or
/// both are the same mesh file.
fn shapes_compatible(visual: &Visual, collision: &Collision) -> bool {
    match (
        visual.geometry.mesh_filename(),
        collision.geometry.mesh_filename(),
    ) {
        (None, None) => true,
        (Some(v), Some(c)) => v == c,
        _ => false,
    }
}

/// Returns which primary shapes of the link can be placed on the primary node, as
/// (visual, collision).
fn primary_shapes_used(link: &Link) -> (bool, bool) {
    let collision_used = match (&link.inertial, link.primary_collision()) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(inertial), Some(collision)) => collision.origin.approx_eq(&inertial.origin),
    };

    let visual_used = match (link.primary_visual(), link.primary_collision()) {
        (None, _) => false,
        (Some(visual), Some(collision)) if collision_used && collision.geometry.is_mesh() => {
            visual.geometry.mesh_filename() == collision.geometry.mesh_filename()
        }
        (Some(_), _) => true,
    };

    (visual_used, collision_used)
}

/// Returns a value indicating whether the link needs more than one node.
pub(crate) fn needs_grouping(link: &Link) -> bool {
    let (visual_used, collision_used) = primary_shapes_used(link);
    link.visuals.len() > 1
        || link.collisions.len() > 1
        || (link.primary_collision().is_some() && !collision_used)
        || (link.primary_visual().is_some() && !visual_used)
}

fn fallback_visual(state: &ConversionState) -> VisualShape {
    VisualShape {
        shape: ShapeDescriptor::cube(state.options.fallback_shape_edge),
        position: Vector3::zeros(),
        rotation: UnitQuaternion::identity(),
        material_name: state.options.fallback_material_name.clone(),
    }
}

fn fallback_collision(edge: f64) -> CollisionShape {
    let mut collision = CollisionShape::from_shape(&ShapeDescriptor::cube(edge));
    collision.bitmask = Some(0);
    collision
}

fn extract(
    state: &mut ConversionState,
    link: &Link,
    shape_name: &str,
    geometry: &Geometry,
) -> ShapeDescriptor {
    let owner = if shape_name.is_empty() {
        link.name.as_str()
    } else {
        shape_name
    };

    let (descriptor, warning) = extract_shape(geometry, owner);
    if let Some(w) = warning {
        state.warn(w);
    }

    descriptor
}

fn visual_shape(
    state: &mut ConversionState,
    link: &Link,
    visual: &Visual,
    offset: Pose,
) -> VisualShape {
    let shape = extract(state, link, &visual.name, &visual.geometry);
    VisualShape {
        shape,
        position: *offset.position(),
        rotation: *offset.rotation(),
        material_name: visual.material_name.clone(),
    }
}

/// Returns a node name that is not used by any registered node nor by any link.
fn unique_node_name(
    state: &mut ConversionState,
    description: &RobotDescription,
    preferred: &str,
) -> String {
    let taken = |state: &ConversionState, name: &str| {
        state.registry.resolve(EntityCategory::Node, name).is_some()
            || description.link_by_name(name).is_some()
    };

    if !taken(state, preferred) {
        return preferred.to_string();
    }

    let mut suffix = 2;
    let assigned = loop {
        let candidate = format!("{}_{}", preferred, suffix);
        if !taken(state, &candidate) {
            break candidate;
        }
        suffix += 1;
    };

    state.warn(ConversionWarning::RenamedNode {
        preferred: preferred.to_string(),
        assigned: assigned.clone(),
    });

    assigned
}

fn auxiliary_name(link: &Link, shape_name: &str) -> String {
    if shape_name.is_empty() {
        format!("{}_child", link.name)
    } else {
        shape_name.to_string()
    }
}

/// The values shared by all auxiliary nodes of one link.
struct AuxiliaryGroup {
    primary: EntityID,
    group_id: u64,
    mass: f64,
}

impl AuxiliaryGroup {
    fn node(
        &self,
        id: EntityID,
        name: String,
        pose: Pose,
        visual: VisualShape,
        collision: CollisionShape,
    ) -> SimNode {
        SimNode {
            id,
            name,
            relative_id: self.primary,
            position: *pose.position(),
            rotation: *pose.rotation(),
            group_id: self.group_id,
            movable: true,
            no_physical: false,
            mass: Some(self.mass),
            density: Some(0.0),
            inertia: None,
            visual,
            collision,
            extra: ConfigMap::new(),
        }
    }
}

/// Creates the nodes for one link and returns the id of its primary node.
///
/// The parent link, if any, must have been decomposed already.
///
/// ## Errors
///
/// * [Error::DuplicateName] - Returned when the link name is already used by a node.
/// * [Error::UnresolvedReference] - Returned when the parent link has no node yet.
pub(super) fn decompose_link(
    state: &mut ConversionState,
    description: &RobotDescription,
    link_index: LinkIndex,
) -> Result<EntityID, Error> {
    let link = description.link(link_index);
    let id = state.registry.register(EntityCategory::Node, &link.name)?;

    let (visual_used, collision_used) = primary_shapes_used(link);
    let group_id = if needs_grouping(link) {
        state.allocate_group()
    } else {
        0
    };

    let node_frame = link.node_frame();
    let (relative_id, pose) = match description.parent_joint(link_index) {
        None => (EntityID::none(), node_frame),
        Some(joint_index) => {
            let joint = description.joint(joint_index);
            let parent_node =
                state
                    .registry
                    .resolve_for(EntityCategory::Node, &joint.parent_link, &link.name)?;

            // The parent node frame is the inertial frame of the parent link
            let parent_frame = description
                .parent_link(link_index)
                .map(|parent| description.link(parent).node_frame())
                .unwrap_or_default();

            (
                parent_node,
                joint.origin.compose(&node_frame).relative_to(&parent_frame),
            )
        }
    };

    let (mass, density, inertia) = match &link.inertial {
        Some(inertial) => (Some(inertial.mass), Some(0.0), Some(inertial.inertia)),
        None => (None, None, None),
    };

    let visual = match link.primary_visual() {
        Some(v) if visual_used => {
            state.registry.record_visual(&v.name, &link.name);
            visual_shape(state, link, v, v.origin.relative_to(&node_frame))
        }
        _ => fallback_visual(state),
    };

    let collision = match link.primary_collision() {
        Some(c) if collision_used => {
            state.registry.record_collision(&c.name, id);
            let shape = extract(state, link, &c.name, &c.geometry);
            CollisionShape::from_shape(&shape)
        }
        _ => fallback_collision(state.options.fallback_shape_edge),
    };

    debug!(
        link = link.name.as_str(),
        node = id.value(),
        group = group_id,
        "Decomposing link"
    );

    state.nodes.push(SimNode {
        id,
        name: link.name.clone(),
        relative_id,
        position: *pose.position(),
        rotation: *pose.rotation(),
        group_id,
        movable: true,
        no_physical: false,
        mass,
        density,
        inertia,
        visual,
        collision,
        extra: ConfigMap::new(),
    });

    let group = AuxiliaryGroup {
        primary: id,
        group_id,
        mass: state.options.auxiliary_node_mass,
    };
    let skip_collisions = usize::from(collision_used);
    let skip_visuals = usize::from(visual_used);
    let collisions: Vec<&Collision> = link.collisions.iter().skip(skip_collisions).collect();
    let visuals: Vec<&Visual> = link.visuals.iter().skip(skip_visuals).collect();

    // Index of the next visual that has not been placed on a node
    let mut next_visual = 0;
    for collision in collisions {
        let name = unique_node_name(state, description, &auxiliary_name(link, &collision.name));
        let aux_id = state.registry.register(EntityCategory::Node, &name)?;
        state.registry.record_collision(&collision.name, aux_id);

        let aux_pose = collision.origin.relative_to(&node_frame);
        let paired = visuals
            .get(next_visual)
            .filter(|visual| shapes_compatible(visual, collision));
        let visual = match paired {
            Some(v) => {
                next_visual += 1;
                state.registry.record_visual(&v.name, &link.name);
                let offset = v.origin.relative_to(&node_frame).relative_to(&aux_pose);
                visual_shape(state, link, v, offset)
            }
            None => fallback_visual(state),
        };

        let shape = extract(state, link, &collision.name, &collision.geometry);
        state.nodes.push(group.node(
            aux_id,
            name,
            aux_pose,
            visual,
            CollisionShape::from_shape(&shape),
        ));
    }

    for visual in &visuals[next_visual..] {
        let name = unique_node_name(state, description, &auxiliary_name(link, &visual.name));
        let aux_id = state.registry.register(EntityCategory::Node, &name)?;

        // A visual only node carries the visual itself, overlays address the node directly
        state.registry.record_visual(&visual.name, &name);

        let aux_pose = visual.origin.relative_to(&node_frame);
        let shape = visual_shape(state, link, visual, Pose::identity());
        let collision = fallback_collision(state.options.visual_only_collision_edge);
        state
            .nodes
            .push(group.node(aux_id, name, aux_pose, shape, collision));
    }

    Ok(id)
}
