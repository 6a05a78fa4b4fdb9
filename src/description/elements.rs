//! Defines the links, joints and shapes of the input kinematic tree.

extern crate nalgebra as na;

use std::fmt::Display;

use na::{Matrix3, Vector3, Vector4};

use crate::pose::Pose;

#[cfg(test)]
#[path = "elements_tests.rs"]
mod elements_tests;

/// Defines the shape of a visual or collision element.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A sphere centred on the shape origin.
    Sphere {
        /// The radius of the sphere.
        radius: f64,
    },
    /// A box centred on the shape origin.
    Box {
        /// The edge lengths of the box along the x, y and z axes.
        size: Vector3<f64>,
    },
    /// A cylinder centred on the shape origin, with its axis along z.
    Cylinder {
        /// The radius of the cylinder.
        radius: f64,
        /// The length of the cylinder.
        length: f64,
    },
    /// A mesh loaded from a file.
    Mesh {
        /// The path or URI of the mesh file.
        filename: String,
        /// The scale applied to the mesh.
        scale: Vector3<f64>,
    },
    /// A shape that the simulation cannot represent.
    Unsupported {
        /// The name of the shape type, e.g. "capsule".
        kind: String,
    },
}

impl Geometry {
    /// Returns the mesh filename if the geometry is a mesh.
    pub fn mesh_filename(&self) -> Option<&str> {
        match self {
            Geometry::Mesh { filename, .. } => Some(filename.as_str()),
            _ => None,
        }
    }

    /// Returns a value indicating whether the geometry is a mesh.
    pub fn is_mesh(&self) -> bool {
        matches!(self, Geometry::Mesh { .. })
    }
}

/// Defines the mass properties of a link.
#[derive(Clone, Debug, PartialEq)]
pub struct Inertial {
    /// The pose of the centre of mass frame relative to the link frame.
    pub origin: Pose,
    /// The mass in kg.
    pub mass: f64,
    /// The symmetric inertia tensor, expressed in the centre of mass frame.
    pub inertia: Matrix3<f64>,
}

/// Defines a visual shape attached to a link.
#[derive(Clone, Debug, PartialEq)]
pub struct Visual {
    /// The name of the shape. May be empty.
    pub name: String,
    /// The pose of the shape relative to the link frame.
    pub origin: Pose,
    /// The shape.
    pub geometry: Geometry,
    /// The name of the material used to render the shape. May be empty.
    pub material_name: String,
}

/// Defines a collision shape attached to a link.
#[derive(Clone, Debug, PartialEq)]
pub struct Collision {
    /// The name of the shape. May be empty.
    pub name: String,
    /// The pose of the shape relative to the link frame.
    pub origin: Pose,
    /// The shape.
    pub geometry: Geometry,
}

/// Defines a rigid body in the kinematic tree.
///
/// The first entry of [Link::visuals] and [Link::collisions] is the primary shape of that kind,
/// any further entries are the extra shapes. All shapes are kept in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    /// The unique name of the link.
    pub name: String,
    /// The mass properties, if the link declared any.
    pub inertial: Option<Inertial>,
    /// The visual shapes.
    pub visuals: Vec<Visual>,
    /// The collision shapes.
    pub collisions: Vec<Collision>,
}

impl Link {
    /// Creates a link without mass properties or shapes.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            inertial: None,
            visuals: Vec::new(),
            collisions: Vec::new(),
        }
    }

    /// Returns the frame that the simulation node of this link is expressed in.
    ///
    /// This is the inertial origin, the primary collision origin when there are no mass
    /// properties, and the link frame itself when the link has neither.
    pub fn node_frame(&self) -> Pose {
        if let Some(inertial) = &self.inertial {
            return inertial.origin;
        }

        match self.primary_collision() {
            Some(collision) => collision.origin,
            None => Pose::identity(),
        }
    }

    /// Returns the primary collision shape.
    pub fn primary_collision(&self) -> Option<&Collision> {
        self.collisions.first()
    }

    /// Returns the primary visual shape.
    pub fn primary_visual(&self) -> Option<&Visual> {
        self.visuals.first()
    }

    /// Adds a collision shape and returns the link.
    pub fn with_collision(mut self, collision: Collision) -> Self {
        self.collisions.push(collision);
        self
    }

    /// Sets the mass properties and returns the link.
    pub fn with_inertial(mut self, inertial: Inertial) -> Self {
        self.inertial = Some(inertial);
        self
    }

    /// Adds a visual shape and returns the link.
    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visuals.push(visual);
        self
    }
}

/// Defines the joint types of the input document.
#[derive(Clone, Debug, PartialEq)]
pub enum JointKind {
    /// A limited rotation around the joint axis.
    Revolute,
    /// An unlimited rotation around the joint axis.
    Continuous,
    /// A translation along the joint axis.
    Prismatic,
    /// A rigid connection.
    Fixed,
    /// Six degrees of freedom.
    Floating,
    /// Translation in the plane perpendicular to the joint axis.
    Planar,
    /// Any joint type without a dedicated variant.
    Other(String),
}

impl Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointKind::Revolute => write!(f, "revolute"),
            JointKind::Continuous => write!(f, "continuous"),
            JointKind::Prismatic => write!(f, "prismatic"),
            JointKind::Fixed => write!(f, "fixed"),
            JointKind::Floating => write!(f, "floating"),
            JointKind::Planar => write!(f, "planar"),
            JointKind::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Defines the motion range of a joint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointLimits {
    /// The lower limit in rad or m.
    pub lower: f64,
    /// The upper limit in rad or m.
    pub upper: f64,
}

/// Defines a connection between a parent link and a child link.
#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    /// The unique name of the joint.
    pub name: String,
    /// The joint type.
    pub kind: JointKind,
    /// The name of the parent link.
    pub parent_link: String,
    /// The name of the child link.
    pub child_link: String,
    /// The pose of the joint frame, and thus of the child link frame, in the parent link frame.
    pub origin: Pose,
    /// The joint axis in the joint frame.
    pub axis: Vector3<f64>,
    /// The motion range, if the joint is limited.
    pub limits: Option<JointLimits>,
}

impl Joint {
    /// Creates a new joint with the x-axis as joint axis and no limits.
    pub fn new<S: Into<String>>(
        name: S,
        kind: JointKind,
        parent_link: S,
        child_link: S,
        origin: Pose,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            parent_link: parent_link.into(),
            child_link: child_link.into(),
            origin,
            axis: Vector3::x(),
            limits: None,
        }
    }
}

/// Defines a material declared by the input document.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDescription {
    /// The unique name of the material.
    pub name: String,
    /// The diffuse colour as r, g, b, a.
    pub color: Vector4<f64>,
    /// The texture file, empty if the material has no texture.
    pub texture_filename: String,
}
