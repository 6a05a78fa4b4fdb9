//! Defines the rigid bodies of the simulation and the merge of SMURF overlays onto them.

extern crate nalgebra as na;

use na::{Matrix3, UnitQuaternion, Vector3};
use tracing::warn;

use crate::{
    config::ConfigMap,
    geometry::{ShapeDescriptor, ShapeKind},
    registry::EntityID,
    ConversionWarning, Error,
};

#[cfg(test)]
#[path = "node_tests.rs"]
mod node_tests;

/// Defines the shape used to render a node.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualShape {
    /// The shape.
    pub shape: ShapeDescriptor,
    /// The position of the shape relative to the node frame.
    pub position: Vector3<f64>,
    /// The orientation of the shape relative to the node frame.
    pub rotation: UnitQuaternion<f64>,
    /// The name of the material. Empty when the node uses the default colour.
    pub material_name: String,
}

/// Defines the shape used to compute the contacts of a node.
///
/// The collision shape is always centred on the node frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionShape {
    /// The shape type.
    pub physic_mode: ShapeKind,
    /// The extents of the shape.
    pub extents: Vector3<f64>,
    /// The scale of the shape.
    pub scale: Vector3<f64>,
    /// The mesh file, or the primitive filename.
    pub filename: String,
    /// The collision filter. `None` leaves the simulation default in place, zero disables all
    /// contacts.
    pub bitmask: Option<u32>,
}

impl CollisionShape {
    /// Creates a collision shape from a shape description.
    pub fn from_shape(shape: &ShapeDescriptor) -> Self {
        Self {
            physic_mode: shape.kind,
            extents: shape.collision_extents(),
            scale: shape.scale,
            filename: shape.filename.clone(),
            bitmask: None,
        }
    }
}

/// Defines the sections of a SMURF overlay that can be merged onto a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OverlayKind {
    /// Fields of the node itself.
    Node,
    /// Fields of the visual shape.
    Visual,
    /// Fields of the collision shape.
    Collision,
}

/// Defines a rigid body of the simulation.
///
/// The node frame is the inertial frame of the body. The visual shape carries an offset relative
/// to that frame, the collision shape is centred on it.
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
    /// The id of the node.
    pub id: EntityID,
    /// The unique name of the node.
    pub name: String,
    /// The node the pose is relative to, or [EntityID::none()] for the world.
    pub relative_id: EntityID,
    /// The position relative to the parent node frame.
    pub position: Vector3<f64>,
    /// The orientation relative to the parent node frame.
    pub rotation: UnitQuaternion<f64>,
    /// The group shared by all nodes created from one link, or 0.
    pub group_id: u64,
    /// Whether the node can move.
    pub movable: bool,
    /// Whether the node takes part in the physics simulation.
    pub no_physical: bool,
    /// The mass in kg, `None` when no inertia was supplied.
    pub mass: Option<f64>,
    /// The density, `None` when no inertia was supplied.
    pub density: Option<f64>,
    /// The inertia tensor, `None` when no inertia was supplied.
    pub inertia: Option<Matrix3<f64>>,
    /// The visual shape.
    pub visual: VisualShape,
    /// The collision shape.
    pub collision: CollisionShape,
    /// Overlay fields that have no dedicated member.
    pub extra: ConfigMap,
}

impl SimNode {
    /// Merges the fields of a SMURF overlay record onto the node. Later overlays win.
    ///
    /// Fields with a dedicated member are type checked. A field with a value of the wrong type is
    /// skipped and reported, the remaining fields are still merged. Unknown fields are stored in
    /// [SimNode::extra].
    ///
    /// ## Parameters
    ///
    /// * 'overlay' - The overlay record.
    /// * 'kind' - The section the record came from.
    pub fn apply_overlay(&mut self, overlay: &ConfigMap, kind: OverlayKind) -> Vec<ConversionWarning> {
        let mut warnings = Vec::new();
        for (key, value) in overlay.iter() {
            match self.apply_field(overlay, kind, key) {
                Ok(true) => {}
                Ok(false) => {
                    self.extra.insert(key, value.clone());
                }
                Err(e) => {
                    warn!(node = self.name.as_str(), field = key, "Ignoring overlay field: {}", e);
                    warnings.push(ConversionWarning::IgnoredOverlayField(e));
                }
            }
        }

        warnings
    }

    /// Returns a value indicating whether the node carries its own inertia.
    pub fn has_inertia(&self) -> bool {
        self.mass.is_some()
    }

    fn apply_field(&mut self, overlay: &ConfigMap, kind: OverlayKind, key: &str) -> Result<bool, Error> {
        let record = self.name.as_str();
        match (kind, key) {
            (_, "name") => {}
            (OverlayKind::Node, "mass") => self.mass = overlay.get_f64(record, key)?,
            (OverlayKind::Node, "density") => self.density = overlay.get_f64(record, key)?,
            (OverlayKind::Node, "movable") => {
                if let Some(v) = overlay.get_bool(record, key)? {
                    self.movable = v;
                }
            }
            (OverlayKind::Node, "noPhysical") => {
                if let Some(v) = overlay.get_bool(record, key)? {
                    self.no_physical = v;
                }
            }
            (OverlayKind::Node, "groupid") => {
                if let Some(v) = overlay.get_u64(record, key)? {
                    self.group_id = v;
                }
            }
            (OverlayKind::Node, "position") => {
                if let Some(v) = overlay.get_vector3(record, key)? {
                    self.position = v;
                }
            }
            (OverlayKind::Node, "rotation") => {
                if let Some(v) = overlay.get_quaternion(record, key)? {
                    self.rotation = v;
                }
            }
            (OverlayKind::Node | OverlayKind::Visual, "materialName") => {
                if let Some(v) = overlay.get_str(record, key)? {
                    self.visual.material_name = v.to_string();
                }
            }
            (OverlayKind::Visual, "visualsize") => {
                if let Some(v) = overlay.get_vector3(record, key)? {
                    self.visual.shape.size = v;
                }
            }
            (OverlayKind::Visual, "visualscale") => {
                if let Some(v) = overlay.get_vector3(record, key)? {
                    self.visual.shape.scale = v;
                }
            }
            (OverlayKind::Visual, "visualposition") => {
                if let Some(v) = overlay.get_vector3(record, key)? {
                    self.visual.position = v;
                }
            }
            (OverlayKind::Visual, "visualrotation") => {
                if let Some(v) = overlay.get_quaternion(record, key)? {
                    self.visual.rotation = v;
                }
            }
            (OverlayKind::Visual, "filename") => {
                if let Some(v) = overlay.get_str(record, key)? {
                    self.visual.shape.filename = v.to_string();
                }
            }
            (OverlayKind::Collision, "physicmode") => {
                if let Some(v) = overlay.get_str(record, key)? {
                    self.collision.physic_mode = parse_shape_kind(v).ok_or_else(|| Error::FieldType {
                        record: record.to_string(),
                        field: key.to_string(),
                        expected: "one of box, sphere, cylinder, mesh".to_string(),
                    })?;
                }
            }
            (OverlayKind::Collision, "extend") => {
                if let Some(v) = overlay.get_vector3(record, key)? {
                    self.collision.extents = v;
                }
            }
            (OverlayKind::Collision, "scale") => {
                if let Some(v) = overlay.get_vector3(record, key)? {
                    self.collision.scale = v;
                }
            }
            // The generic "bitmask" of a collision record is the collision filter of the node
            (OverlayKind::Collision, "bitmask" | "coll_bitmask") => {
                if let Some(v) = overlay.get_u64(record, key)? {
                    self.collision.bitmask =
                        Some(u32::try_from(v).map_err(|_| Error::FieldType {
                            record: record.to_string(),
                            field: key.to_string(),
                            expected: "a 32 bit mask".to_string(),
                        })?);
                }
            }
            _ => return Ok(false),
        }

        Ok(true)
    }
}

fn parse_shape_kind(name: &str) -> Option<ShapeKind> {
    match name {
        "box" => Some(ShapeKind::Box),
        "sphere" => Some(ShapeKind::Sphere),
        "cylinder" => Some(ShapeKind::Cylinder),
        "mesh" => Some(ShapeKind::Mesh),
        _ => None,
    }
}
