#![warn(missing_docs)]

//! Conversion of URDF robot descriptions, optionally overlaid with SMURF annotation data, into a
//! flat, ID-indexed set of simulation entities.
//!
//! URDF attaches the inertial, visual and collision frames of a link as siblings of the link
//! frame. The simulation side expects a rigid body ("node") whose pose is the inertial frame and
//! which owns exactly one collision shape and one visual shape. The conversion therefore
//! re-expresses every pose relative to the node frame and splits links that carry several shapes
//! (or whose collision and inertial frames disagree) into a primary node plus grouped auxiliary
//! nodes.
//!
//! The pipeline is:
//!
//! 1. [description] holds the kinematic tree as an arena of links and joints.
//! 2. [conversion::convert] walks the tree once, registers dense ids in the
//!    [registry::IdRegistry] and merges the [smurf::SmurfOverlay] onto the results.
//! 3. [assembly::assemble] hands the entities, in dependency order, to a
//!    [assembly::SimulationHost].

use thiserror::Error;

/// Defines the assembly pipeline that creates the converted entities in a simulation.
pub mod assembly;

/// Defines the tagged-variant configuration document used for overlays and requests.
pub mod config;

/// Defines the link decomposition, joint projection and cross-reference resolution.
pub mod conversion;

/// Defines the input kinematic tree.
pub mod description;

/// Defines the simulation entities produced by the conversion.
pub mod entities;

/// Defines the mapping from URDF shapes to simulation shape descriptions.
pub mod geometry;

/// Defines rigid transforms and the operations on them.
pub mod pose;

/// Defines the id registry that turns names into dense integer handles.
pub mod registry;

/// Defines the SMURF overlay sections and the top-level conversion request.
pub mod smurf;

use assembly::Stage;
use registry::{EntityCategory, EntityID};

/// Defines the different errors for the conversion crate.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Returned when a document could not be read from disk.
    #[error("Unable to read the document at {path}: {reason}")]
    UnreadableDocument {
        /// The path of the document.
        path: String,
        /// The reason the read failed.
        reason: String,
    },

    /// Returned when a document was read but its structure is not what was expected.
    #[error("The document is invalid: {reason}")]
    InvalidDocument {
        /// A description of the problem.
        reason: String,
    },

    /// Returned when the kinematic tree contains no link without a parent joint.
    #[error("The kinematic tree does not have a root link")]
    MissingRootLink,

    /// Returned when the kinematic tree contains more than one link without a parent joint.
    #[error("The kinematic tree has multiple root links: {names:?}")]
    MultipleRootLinks {
        /// The names of the links that have no parent joint.
        names: Vec<String>,
    },

    /// Returned when a joint refers to a link that is not part of the kinematic tree.
    #[error("Joint {joint} refers to the unknown link {link}")]
    UnknownLink {
        /// The name of the joint.
        joint: String,
        /// The name of the link that could not be found.
        link: String,
    },

    /// Returned when a link is the child of more than one joint.
    #[error("Link {link} is the child of more than one joint")]
    LinkHasMultipleParents {
        /// The name of the link.
        link: String,
    },

    /// Returned when following the parent joints of a link leads back to the link.
    #[error("The kinematic tree contains a cycle through link {link}")]
    CyclicKinematicTree {
        /// The name of a link on the cycle.
        link: String,
    },

    /// Returned when a name is registered twice within one category.
    #[error("The {category} name {name} is already registered")]
    DuplicateName {
        /// The category in which the name was registered.
        category: EntityCategory,
        /// The duplicated name.
        name: String,
    },

    /// Returned when a record references a name that is not registered in the given category.
    #[error("Record {record} references the unknown {category} {reference}")]
    UnresolvedReference {
        /// The category in which the reference was looked up.
        category: EntityCategory,
        /// The name of the record holding the reference.
        record: String,
        /// The name that could not be resolved.
        reference: String,
    },

    /// Returned when a record lacks a field that is required to process it.
    #[error("Record {record} is missing the required field {field}")]
    MissingField {
        /// The name of the record, or its section when it has no name.
        record: String,
        /// The missing field.
        field: String,
    },

    /// Returned when a field is present but holds a value of the wrong type.
    #[error("Field {field} of record {record} should be {expected}")]
    FieldType {
        /// The name of the record.
        record: String,
        /// The name of the field.
        field: String,
        /// A description of the expected type.
        expected: String,
    },

    /// Returned when the simulation host refused to create an entity.
    #[error("Failed to create {stage} entry {name} ({id}): {reason}")]
    CreationFailed {
        /// The stage of the assembly pipeline that failed.
        stage: Stage,
        /// The internal id of the entity, or the none id for entities without one.
        id: EntityID,
        /// The name of the entity.
        name: String,
        /// The reason given by the host.
        reason: String,
    },
}

/// Defines the non-fatal problems found during a conversion.
///
/// Warnings never stop a conversion. They are collected on the
/// [ConvertedRobot](conversion::ConvertedRobot) and logged as they are found.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ConversionWarning {
    /// A shape used a geometry type that the simulation does not support. A degenerate
    /// primitive was used instead.
    #[error("Shape {shape} uses the unsupported geometry {kind}, using a degenerate primitive")]
    UnsupportedGeometry {
        /// The name of the shape, or of its link when the shape is unnamed.
        shape: String,
        /// The geometry type that is not supported.
        kind: String,
    },

    /// A motor, sensor or controller record was rejected and will not be created.
    #[error("Rejected record: {0}")]
    RejectedRecord(Error),

    /// An overlay field was ignored because its value had the wrong type.
    #[error("Ignored overlay field: {0}")]
    IgnoredOverlayField(Error),

    /// An overlay record did not match any converted entity.
    #[error("The {section} overlay {name} does not match any entity")]
    UnmatchedOverlay {
        /// The overlay section.
        section: String,
        /// The name used for matching.
        name: String,
    },

    /// An auxiliary node was renamed because its preferred name was already taken.
    #[error("Node name {preferred} is already used, renamed to {assigned}")]
    RenamedNode {
        /// The name the node would have had.
        preferred: String,
        /// The name the node was given.
        assigned: String,
    },

    /// A sensor had an id list but its type does not tell which category the ids belong to.
    #[error("Sensor {sensor} of type {sensor_type} has an id list of no known category")]
    UnknownSensorIdCategory {
        /// The name of the sensor.
        sensor: String,
        /// The type of the sensor.
        sensor_type: String,
    },
}
