//! Builds a [RobotDescription] from a parsed URDF document.

extern crate nalgebra as na;

use std::path::Path;

use na::{Matrix3, Vector3, Vector4};
use tracing::debug;

use crate::{pose::Pose, Error};

use super::{
    elements::{
        Collision, Geometry, Inertial, Joint, JointKind, JointLimits, Link, MaterialDescription,
        Visual,
    },
    tree::RobotDescription,
};

#[cfg(test)]
#[path = "urdf_import_tests.rs"]
mod urdf_import_tests;

fn vector(v: &urdf_rs::Vec3) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

fn pose(origin: &urdf_rs::Pose) -> Pose {
    Pose::from_xyz_rpy(vector(&origin.xyz), vector(&origin.rpy))
}

fn geometry(geometry: &urdf_rs::Geometry) -> Geometry {
    match geometry {
        urdf_rs::Geometry::Box { size } => Geometry::Box { size: vector(size) },
        urdf_rs::Geometry::Cylinder { radius, length } => Geometry::Cylinder {
            radius: *radius,
            length: *length,
        },
        urdf_rs::Geometry::Sphere { radius } => Geometry::Sphere { radius: *radius },
        urdf_rs::Geometry::Mesh { filename, scale } => Geometry::Mesh {
            filename: filename.clone(),
            scale: scale
                .as_ref()
                .map(vector)
                .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0)),
        },
        urdf_rs::Geometry::Capsule { .. } => Geometry::Unsupported {
            kind: "capsule".to_string(),
        },
    }
}

fn inertial(inertial: &urdf_rs::Inertial) -> Option<Inertial> {
    let i = &inertial.inertia;
    let inertia = Matrix3::new(
        i.ixx, i.ixy, i.ixz, //
        i.ixy, i.iyy, i.iyz, //
        i.ixz, i.iyz, i.izz,
    );

    // urdf-rs fills in an all-zero block when the link declares none
    if inertial.mass.value == 0.0 && inertia.iter().all(|v| *v == 0.0) {
        return None;
    }

    Some(Inertial {
        origin: pose(&inertial.origin),
        mass: inertial.mass.value,
        inertia,
    })
}

fn material(material: &urdf_rs::Material) -> MaterialDescription {
    MaterialDescription {
        name: material.name.clone(),
        color: material
            .color
            .as_ref()
            .map(|c| Vector4::new(c.rgba[0], c.rgba[1], c.rgba[2], c.rgba[3]))
            .unwrap_or_else(|| Vector4::new(1.0, 1.0, 1.0, 1.0)),
        texture_filename: material
            .texture
            .as_ref()
            .map(|t| t.filename.clone())
            .unwrap_or_default(),
    }
}

fn link(link: &urdf_rs::Link) -> Link {
    Link {
        name: link.name.clone(),
        inertial: inertial(&link.inertial),
        visuals: link
            .visual
            .iter()
            .map(|v| Visual {
                name: v.name.clone().unwrap_or_default(),
                origin: pose(&v.origin),
                geometry: geometry(&v.geometry),
                material_name: v
                    .material
                    .as_ref()
                    .map(|m| m.name.clone())
                    .unwrap_or_default(),
            })
            .collect(),
        collisions: link
            .collision
            .iter()
            .map(|c| Collision {
                name: c.name.clone().unwrap_or_default(),
                origin: pose(&c.origin),
                geometry: geometry(&c.geometry),
            })
            .collect(),
    }
}

fn joint(joint: &urdf_rs::Joint) -> Joint {
    let kind = match joint.joint_type {
        urdf_rs::JointType::Revolute => JointKind::Revolute,
        urdf_rs::JointType::Continuous => JointKind::Continuous,
        urdf_rs::JointType::Prismatic => JointKind::Prismatic,
        urdf_rs::JointType::Fixed => JointKind::Fixed,
        urdf_rs::JointType::Floating => JointKind::Floating,
        urdf_rs::JointType::Planar => JointKind::Planar,
        urdf_rs::JointType::Spherical => JointKind::Other("spherical".to_string()),
    };

    let limits = match kind {
        JointKind::Revolute | JointKind::Prismatic => Some(JointLimits {
            lower: joint.limit.lower,
            upper: joint.limit.upper,
        }),
        _ => None,
    };

    Joint {
        name: joint.name.clone(),
        kind,
        parent_link: joint.parent.link.clone(),
        child_link: joint.child.link.clone(),
        origin: pose(&joint.origin),
        axis: vector(&joint.axis.xyz),
        limits,
    }
}

impl RobotDescription {
    /// Creates a [RobotDescription] from a parsed URDF robot.
    ///
    /// Materials declared at the top level come first. Named materials that are only declared
    /// inline on a visual are added after them, the first declaration of a name wins.
    ///
    /// ## Errors
    ///
    /// Returns the same errors as [RobotDescription::new].
    pub fn from_urdf_robot(robot: &urdf_rs::Robot) -> Result<Self, Error> {
        let mut materials: Vec<MaterialDescription> = Vec::new();
        let inline = robot
            .links
            .iter()
            .flat_map(|l| l.visual.iter())
            .filter_map(|v| v.material.as_ref());
        for m in robot.materials.iter().chain(inline) {
            if m.name.is_empty() || materials.iter().any(|known| known.name == m.name) {
                continue;
            }

            materials.push(material(m));
        }

        debug!(
            robot = robot.name.as_str(),
            links = robot.links.len(),
            joints = robot.joints.len(),
            materials = materials.len(),
            "Importing URDF robot"
        );

        RobotDescription::new(
            robot.name.clone(),
            robot.links.iter().map(link).collect(),
            robot.joints.iter().map(joint).collect(),
            materials,
        )
    }
}

/// Reads a URDF file and creates a [RobotDescription] from it.
///
/// ## Errors
///
/// * [Error::UnreadableDocument] - Returned when the file cannot be read or parsed.
/// * Any error returned by [RobotDescription::new].
pub fn load_urdf_file<P: AsRef<Path>>(path: P) -> Result<RobotDescription, Error> {
    let path = path.as_ref();
    let robot = urdf_rs::read_file(path).map_err(|e| Error::UnreadableDocument {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    RobotDescription::from_urdf_robot(&robot)
}

/// Parses a URDF document and creates a [RobotDescription] from it.
///
/// ## Errors
///
/// * [Error::InvalidDocument] - Returned when the text is not a valid URDF document.
/// * Any error returned by [RobotDescription::new].
pub fn load_urdf_str(xml: &str) -> Result<RobotDescription, Error> {
    let robot = urdf_rs::read_from_string(xml).map_err(|e| Error::InvalidDocument {
        reason: e.to_string(),
    })?;

    RobotDescription::from_urdf_robot(&robot)
}
