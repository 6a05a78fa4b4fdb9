//! Maps the shapes of the input document onto the shape descriptions of the simulation.

extern crate nalgebra as na;

use std::fmt::Display;

use na::Vector3;

use crate::{description::elements::Geometry, ConversionWarning};

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod geometry_tests;

/// The filename used for shapes that are not loaded from a file.
pub const PRIMITIVE_FILENAME: &str = "PRIMITIVE";

/// Defines the shape types known to the simulation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShapeKind {
    /// A sphere. The x extent is the radius.
    Sphere,
    /// A box. The extents are the edge lengths.
    Box,
    /// A cylinder. The x extent is the radius, the y extent the length.
    Cylinder,
    /// A mesh loaded from a file. The extents are the declared mesh scale.
    Mesh,
}

impl ShapeKind {
    /// Returns the name of the shape type as used by the simulation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Sphere => "sphere",
            ShapeKind::Box => "box",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Mesh => "mesh",
        }
    }
}

impl Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Defines a shape in the terms of the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDescriptor {
    /// The shape type.
    pub kind: ShapeKind,
    /// The extents of the shape. See [ShapeKind] for the meaning per shape type.
    pub size: Vector3<f64>,
    /// The scale of the shape. Only meshes carry a scale other than one.
    pub scale: Vector3<f64>,
    /// The mesh file, or [PRIMITIVE_FILENAME] for primitive shapes.
    pub filename: String,
    /// The name of the primitive the shape was created from. Empty for meshes.
    pub origin_name: String,
}

impl ShapeDescriptor {
    /// Creates a box with the given edge length.
    pub fn cube(edge: f64) -> Self {
        Self {
            kind: ShapeKind::Box,
            size: Vector3::new(edge, edge, edge),
            scale: Vector3::new(1.0, 1.0, 1.0),
            filename: PRIMITIVE_FILENAME.to_string(),
            origin_name: ShapeKind::Box.as_str().to_string(),
        }
    }

    /// Returns the extents used for the collision shape.
    ///
    /// The simulation has no bounding information for meshes, so the declared mesh scale is used
    /// as an approximation of the mesh extents.
    pub fn collision_extents(&self) -> Vector3<f64> {
        match self.kind {
            ShapeKind::Mesh => self.scale,
            _ => self.size,
        }
    }

    /// Returns a value indicating whether the shape is a mesh.
    pub fn is_mesh(&self) -> bool {
        self.kind == ShapeKind::Mesh
    }
}

/// Creates the simulation shape for a shape of the input document.
///
/// Shapes that the simulation does not support are replaced by a box with zero extents and a
/// [ConversionWarning::UnsupportedGeometry] is returned alongside.
///
/// ## Parameters
///
/// * 'geometry' - The shape of the input document.
/// * 'owner' - The name of the shape, or of its link, used in the warning.
pub fn extract_shape(
    geometry: &Geometry,
    owner: &str,
) -> (ShapeDescriptor, Option<ConversionWarning>) {
    let primitive = |kind: ShapeKind, size: Vector3<f64>| ShapeDescriptor {
        kind,
        size,
        scale: Vector3::new(1.0, 1.0, 1.0),
        filename: PRIMITIVE_FILENAME.to_string(),
        origin_name: kind.as_str().to_string(),
    };

    match geometry {
        Geometry::Sphere { radius } => (
            primitive(ShapeKind::Sphere, Vector3::new(*radius, 0.0, 0.0)),
            None,
        ),
        Geometry::Box { size } => (primitive(ShapeKind::Box, *size), None),
        Geometry::Cylinder { radius, length } => (
            primitive(ShapeKind::Cylinder, Vector3::new(*radius, *length, 0.0)),
            None,
        ),
        Geometry::Mesh { filename, scale } => (
            ShapeDescriptor {
                kind: ShapeKind::Mesh,
                size: *scale,
                scale: *scale,
                filename: filename.clone(),
                origin_name: String::new(),
            },
            None,
        ),
        Geometry::Unsupported { kind } => (
            primitive(ShapeKind::Box, Vector3::zeros()),
            Some(ConversionWarning::UnsupportedGeometry {
                shape: owner.to_string(),
                kind: kind.clone(),
            }),
        ),
    }
}
