//! Converts a [RobotDescription] into the flat, id indexed entities of the simulation.
//!
//! The conversion walks the kinematic tree once, in pre-order. Every link is decomposed into one
//! or more nodes and the joint to its parent is projected right after, so that both end points
//! of every joint already have an id. Once the tree is done the SMURF overlay is merged, in
//! dependency order, onto the results.

extern crate nalgebra as na;

use std::{fs, path::Path};

use na::Vector4;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    description::tree::RobotDescription,
    entities::{
        joint::SimJoint,
        material::Material,
        node::SimNode,
        records::{ControllerRecord, GraphicsRecord, LightRecord, MotorRecord, SensorRecord},
    },
    registry::{EntityCategory, EntityID, IdRegistry},
    smurf::SmurfOverlay,
    ConversionWarning, Error,
};

mod decomposition;
mod joints;
mod overlay_merge;
mod references;

#[cfg(test)]
#[path = "conversion_tests.rs"]
mod conversion_tests;

/// Defines the tunable constants of a conversion.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionOptions {
    /// The edge length of the box used when a node has no visual or no collision shape.
    pub fallback_shape_edge: f64,

    /// The mass of the auxiliary nodes that carry the extra shapes of a link.
    pub auxiliary_node_mass: f64,

    /// The edge length of the collision box of auxiliary nodes that only carry a visual shape.
    pub visual_only_collision_edge: f64,

    /// The name of the material used by fallback visual shapes. Always the first material.
    pub fallback_material_name: String,

    /// The diffuse colour of the fallback material as r, g, b, a.
    pub fallback_material_color: [f64; 4],

    /// Whether visual STL meshes are rotated by -90 degrees around x when assembled.
    pub correct_stl_up_axis: bool,

    /// The colour of nodes whose visual shape has no material, as r, g, b, a.
    pub default_node_color: [f64; 4],
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            fallback_shape_edge: 0.01,
            auxiliary_node_mass: 0.001,
            visual_only_collision_edge: 0.001,
            fallback_material_name: "_fakeMaterial".to_string(),
            fallback_material_color: [1.0, 0.0, 0.0, 1.0],
            correct_stl_up_axis: true,
            default_node_color: [0.4, 0.4, 0.4, 1.0],
        }
    }
}

impl ConversionOptions {
    /// Reads the options from a YAML file. Missing fields keep their default.
    ///
    /// ## Errors
    ///
    /// * [Error::UnreadableDocument] - Returned when the file cannot be read.
    /// * [Error::InvalidDocument] - Returned when the file does not hold valid options.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::UnreadableDocument {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml_str(&text)
    }

    /// Parses the options from YAML text. Missing fields keep their default.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidDocument] - Returned when the text does not hold valid options.
    pub fn from_yaml_str(text: &str) -> Result<Self, Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(text).map_err(|e| Error::InvalidDocument {
            reason: e.to_string(),
        })
    }
}

/// Defines the result of converting one robot.
#[derive(Clone, Debug)]
pub struct ConvertedRobot {
    /// The name of the robot.
    pub name: String,
    /// The materials, the fallback material first.
    pub materials: Vec<Material>,
    /// The nodes in id order. The root node comes first.
    pub nodes: Vec<SimNode>,
    /// The joints in id order.
    pub joints: Vec<SimJoint>,
    /// The motors in id order.
    pub motors: Vec<MotorRecord>,
    /// The sensors in id order.
    pub sensors: Vec<SensorRecord>,
    /// The controllers in id order.
    pub controllers: Vec<ControllerRecord>,
    /// The lights in overlay order.
    pub lights: Vec<LightRecord>,
    /// The graphics options in overlay order.
    pub graphics: Vec<GraphicsRecord>,
    /// The ids and name maps of the conversion.
    pub registry: IdRegistry,
    /// The non-fatal problems found during the conversion.
    pub warnings: Vec<ConversionWarning>,
    /// The node created for the root link.
    pub root_node: EntityID,
}

impl ConvertedRobot {
    /// Returns the material with the given name.
    pub fn material_by_name(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// Returns the node with the given id.
    pub fn node(&self, id: EntityID) -> Option<&SimNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns the node with the given name.
    pub fn node_by_name(&self, name: &str) -> Option<&SimNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Holds the state of one conversion while the tree is walked.
struct ConversionState<'a> {
    options: &'a ConversionOptions,
    registry: IdRegistry,
    materials: Vec<Material>,
    nodes: Vec<SimNode>,
    joints: Vec<SimJoint>,
    motors: Vec<MotorRecord>,
    sensors: Vec<SensorRecord>,
    controllers: Vec<ControllerRecord>,
    lights: Vec<LightRecord>,
    graphics: Vec<GraphicsRecord>,
    warnings: Vec<ConversionWarning>,
    next_group_id: u64,
}

impl<'a> ConversionState<'a> {
    fn allocate_group(&mut self) -> u64 {
        let group = self.next_group_id;
        self.next_group_id += 1;
        group
    }

    fn new(options: &'a ConversionOptions, first_group_id: u64) -> Self {
        Self {
            options,
            registry: IdRegistry::new(),
            materials: Vec::new(),
            nodes: Vec::new(),
            joints: Vec::new(),
            motors: Vec::new(),
            sensors: Vec::new(),
            controllers: Vec::new(),
            lights: Vec::new(),
            graphics: Vec::new(),
            warnings: Vec::new(),
            next_group_id: first_group_id.max(1),
        }
    }

    fn warn(&mut self, warning: ConversionWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Converts a robot description, and optionally a SMURF overlay, into simulation entities.
///
/// Ids start at 1 in every category and are handed out in discovery order: the fallback
/// material and the document materials first, then the nodes and joints in a pre-order walk of
/// the tree, then the overlay motors, sensors and controllers. Overlay records that reference
/// unknown names are rejected and reported as warnings, they do not receive an id.
///
/// ## Parameters
///
/// * 'description' - The kinematic tree.
/// * 'overlay' - The SMURF sections, if the robot was loaded from a SMURF document.
/// * 'options' - The conversion constants.
/// * 'first_group_id' - The first group id to hand out. Usually one more than the largest group
///   id already used by the simulation.
///
/// ## Errors
///
/// * [Error::DuplicateName] - Returned when a document material is named like the fallback
///   material.
/// * [Error::UnresolvedReference] - Returned when the tree references a node that was not
///   created. This indicates an inconsistent description.
pub fn convert(
    description: &RobotDescription,
    overlay: Option<&SmurfOverlay>,
    options: &ConversionOptions,
    first_group_id: u64,
) -> Result<ConvertedRobot, Error> {
    info!(
        robot = description.name(),
        links = description.links().len(),
        joints = description.joints().len(),
        "Converting robot"
    );

    let mut state = ConversionState::new(options, first_group_id);

    let fallback_id = state
        .registry
        .register(EntityCategory::Material, &options.fallback_material_name)?;
    state.materials.push(Material::fallback(
        fallback_id,
        &options.fallback_material_name,
        Vector4::from(options.fallback_material_color),
    ));
    for material in description.materials() {
        let id = state
            .registry
            .register(EntityCategory::Material, &material.name)?;
        state
            .materials
            .push(Material::from_description(id, material));
    }

    let mut root_node = EntityID::none();
    for link in description.walk() {
        let node = decomposition::decompose_link(&mut state, description, link)?;
        if let Some(joint) = description.parent_joint(link) {
            joints::project_joint(&mut state, description, joint)?;
        } else {
            root_node = node;
        }
    }

    if let Some(overlay) = overlay {
        debug!(robot = description.name(), "Merging SMURF overlay");
        references::resolve_motors(&mut state, &overlay.motors);
        references::resolve_sensors(&mut state, description, &overlay.sensors);
        overlay_merge::merge_materials(&mut state, &overlay.materials);
        overlay_merge::merge_nodes(&mut state, &overlay.nodes);
        overlay_merge::merge_visuals(&mut state, &overlay.visual);
        overlay_merge::merge_collisions(&mut state, &overlay.collision);
        overlay_merge::collect_lights(&mut state, &overlay.lights);
        overlay_merge::collect_graphics(&mut state, &overlay.graphics);
        references::resolve_controllers(&mut state, &overlay.controllers);
    }

    info!(
        robot = description.name(),
        nodes = state.nodes.len(),
        joints = state.joints.len(),
        motors = state.motors.len(),
        sensors = state.sensors.len(),
        controllers = state.controllers.len(),
        warnings = state.warnings.len(),
        "Converted robot"
    );

    Ok(ConvertedRobot {
        name: description.name().to_string(),
        materials: state.materials,
        nodes: state.nodes,
        joints: state.joints,
        motors: state.motors,
        sensors: state.sensors,
        controllers: state.controllers,
        lights: state.lights,
        graphics: state.graphics,
        registry: state.registry,
        warnings: state.warnings,
        root_node,
    })
}
