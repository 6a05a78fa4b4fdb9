//! Creates the entities of a converted robot in a simulation.
//!
//! The entities are handed to a [SimulationHost] in dependency order: materials, nodes, joints,
//! motors, sensors, controllers, lights and graphics options. Every host call receives a view on
//! the external ids assigned so far, so that a joint can find the external ids of its nodes and
//! a controller those of its motors. The first refused creation stops the assembly. Entities
//! created before that point are kept and listed in the [AssemblyReport].

extern crate nalgebra as na;

use std::{f64::consts::FRAC_PI_2, fmt::Display};

use na::{UnitQuaternion, Vector3, Vector4};
use tracing::{debug, info, warn};

use crate::{
    conversion::{ConversionOptions, ConvertedRobot},
    entities::{
        joint::SimJoint,
        material::Material,
        node::SimNode,
        records::{ControllerRecord, GraphicsRecord, LightRecord, MotorRecord, SensorRecord},
    },
    pose::Pose,
    registry::{EntityCategory, EntityID, ExternalIdTable, IdMapping, RunID},
    Error,
};

#[cfg(test)]
#[path = "assembly_tests.rs"]
mod assembly_tests;

/// Defines the stages of the assembly, in execution order.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// Creating the materials.
    Materials,
    /// Creating the nodes.
    Nodes,
    /// Creating the joints.
    Joints,
    /// Creating the motors.
    Motors,
    /// Creating the sensors.
    Sensors,
    /// Creating the controllers.
    Controllers,
    /// Creating the lights.
    Lights,
    /// Applying the graphics options.
    Graphics,
    /// Placing the root node in the world.
    RootPose,
}

impl Stage {
    /// The stages in execution order.
    pub const ALL: [Stage; 9] = [
        Stage::Materials,
        Stage::Nodes,
        Stage::Joints,
        Stage::Motors,
        Stage::Sensors,
        Stage::Controllers,
        Stage::Lights,
        Stage::Graphics,
        Stage::RootPose,
    ];
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Materials => "materials",
            Stage::Nodes => "nodes",
            Stage::Joints => "joints",
            Stage::Motors => "motors",
            Stage::Sensors => "sensors",
            Stage::Controllers => "controllers",
            Stage::Lights => "lights",
            Stage::Graphics => "graphics",
            Stage::RootPose => "root pose",
        };
        write!(f, "{}", name)
    }
}

/// Defines the failure reported by a [SimulationHost] when it cannot create an entity.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[error("{reason}")]
pub struct HostError {
    /// The reason given by the host.
    pub reason: String,
}

impl HostError {
    /// Creates a new [HostError].
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Defines the simulation that the converted entities are created in.
///
/// Every creation call either creates the entity and returns the id the simulation assigned to
/// it, or fails without side effects. The [IdMapping] gives the external ids of the entities
/// created earlier in the same assembly.
pub trait SimulationHost {
    /// Returns the largest group id the simulation already uses. New groups are numbered after it.
    fn max_group_id(&self) -> u64 {
        0
    }

    /// Creates a material.
    fn create_material(&mut self, material: &Material) -> Result<u64, HostError>;

    /// Creates a node, rendered with the given material.
    fn create_node(
        &mut self,
        node: &SimNode,
        material: &Material,
        ids: IdMapping<'_>,
    ) -> Result<u64, HostError>;

    /// Creates a joint between two nodes that were created before.
    fn create_joint(&mut self, joint: &SimJoint, ids: IdMapping<'_>) -> Result<u64, HostError>;

    /// Creates a motor for a joint that was created before.
    fn create_motor(&mut self, motor: &MotorRecord, ids: IdMapping<'_>)
        -> Result<u64, HostError>;

    /// Creates a sensor.
    fn create_sensor(
        &mut self,
        sensor: &SensorRecord,
        ids: IdMapping<'_>,
    ) -> Result<u64, HostError>;

    /// Creates a controller for sensors and motors that were created before.
    fn create_controller(
        &mut self,
        controller: &ControllerRecord,
        ids: IdMapping<'_>,
    ) -> Result<u64, HostError>;

    /// Creates a light. Returns `false` when the light was refused.
    fn create_light(&mut self, light: &LightRecord) -> bool;

    /// Applies graphics options. Returns `false` when the options were refused.
    fn set_graphics_options(&mut self, graphics: &GraphicsRecord) -> bool;

    /// Moves the root node, and everything attached to it, to the given world pose.
    fn set_root_pose(
        &mut self,
        root_node: u64,
        position: &Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) -> Result<(), HostError>;
}

/// Defines the outcome of an assembly.
#[derive(Debug)]
pub struct AssemblyReport {
    /// The run the external ids are recorded under.
    pub run_id: RunID,
    /// The external ids of every created entity that has an internal id.
    pub external_ids: ExternalIdTable,
    /// The number of entities created per stage, in stage order.
    pub created: Vec<(Stage, usize)>,
    /// The creation that failed, if any. The stages after it were not started.
    pub failure: Option<Error>,
    /// Whether the root node was moved to the requested pose.
    pub root_placed: bool,
}

impl AssemblyReport {
    fn new(run_id: RunID) -> Self {
        Self {
            run_id,
            external_ids: ExternalIdTable::default(),
            created: Vec::new(),
            failure: None,
            root_placed: false,
        }
    }

    /// Returns the number of entities created in the stage.
    pub fn created_in(&self, stage: Stage) -> usize {
        self.created
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Returns the external id of an entity of the robot.
    pub fn external_id(&self, category: EntityCategory, id: EntityID) -> Option<u64> {
        self.external_ids.get(category, id, self.run_id)
    }

    /// Returns a value indicating whether every entity was created and the root was placed.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.root_placed
    }
}

/// The identity of one entity of a stage, as recorded in the report.
struct StageItem<'a> {
    category: Option<EntityCategory>,
    id: EntityID,
    name: &'a str,
}

fn run_stage<T, K, C>(
    report: &mut AssemblyReport,
    stage: Stage,
    items: &[T],
    key: K,
    mut create: C,
) -> Result<(), Error>
where
    K: Fn(&T) -> StageItem<'_>,
    C: FnMut(&T, IdMapping<'_>) -> Result<u64, HostError>,
{
    let mut count = 0;
    let mut outcome = Ok(());
    for item in items {
        let StageItem { category, id, name } = key(item);
        match create(item, report.external_ids.mapping(report.run_id)) {
            Ok(external) => {
                if let Some(category) = category {
                    report
                        .external_ids
                        .insert(category, id, report.run_id, external);
                }
                count += 1;
            }
            Err(e) => {
                warn!(stage = %stage, name, reason = e.reason.as_str(), "Creation failed");
                outcome = Err(Error::CreationFailed {
                    stage,
                    id,
                    name: name.to_string(),
                    reason: e.reason,
                });
                break;
            }
        }
    }

    debug!(stage = %stage, count, "Finished assembly stage");
    report.created.push((stage, count));
    outcome
}

fn refused(kind: &str) -> HostError {
    HostError::new(format!("the host refused the {}", kind))
}

fn color(values: [f64; 4]) -> Vector4<f64> {
    Vector4::from(values)
}

/// Selects the materials that nodes are rendered with.
struct MaterialResolver<'a> {
    robot: &'a ConvertedRobot,
    untextured: Material,
    fallback: Material,
}

impl<'a> MaterialResolver<'a> {
    fn new(robot: &'a ConvertedRobot, options: &ConversionOptions) -> Self {
        let fallback = robot
            .material_by_name(&options.fallback_material_name)
            .cloned()
            .unwrap_or_else(|| {
                Material::fallback(
                    EntityID::none(),
                    &options.fallback_material_name,
                    color(options.fallback_material_color),
                )
            });

        Self {
            robot,
            untextured: Material::fallback(
                EntityID::none(),
                "",
                color(options.default_node_color),
            ),
            fallback,
        }
    }

    /// Returns the material of a node. Nodes without a material name are grey, nodes with an
    /// unknown material name use the fallback material.
    fn resolve(&self, name: &str) -> &Material {
        if name.is_empty() {
            return &self.untextured;
        }

        self.robot.material_by_name(name).unwrap_or(&self.fallback)
    }
}

fn is_stl(filename: &str) -> bool {
    filename.ends_with(".stl") || filename.ends_with(".STL")
}

/// Returns the node as it is handed to the host.
///
/// STL meshes are stored with z pointing forward, their visual rotation gets an extra -90 degree
/// turn about x.
fn prepared_node(node: &SimNode, options: &ConversionOptions) -> SimNode {
    let mut node = node.clone();
    if options.correct_stl_up_axis && is_stl(&node.visual.shape.filename) {
        let correction = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2);
        node.visual.rotation *= correction;
    }

    node
}

fn entity<'a>(category: EntityCategory, id: EntityID, name: &'a str) -> StageItem<'a> {
    StageItem {
        category: Some(category),
        id,
        name,
    }
}

fn create_entities(
    robot: &ConvertedRobot,
    host: &mut dyn SimulationHost,
    options: &ConversionOptions,
    report: &mut AssemblyReport,
) -> Result<(), Error> {
    run_stage(
        report,
        Stage::Materials,
        &robot.materials,
        |m: &Material| entity(EntityCategory::Material, m.id, &m.name),
        |m, _| host.create_material(m),
    )?;

    let materials = MaterialResolver::new(robot, options);
    run_stage(
        report,
        Stage::Nodes,
        &robot.nodes,
        |n: &SimNode| entity(EntityCategory::Node, n.id, &n.name),
        |n, ids| {
            let material = materials.resolve(&n.visual.material_name);
            host.create_node(&prepared_node(n, options), material, ids)
        },
    )?;

    run_stage(
        report,
        Stage::Joints,
        &robot.joints,
        |j: &SimJoint| entity(EntityCategory::Joint, j.id, &j.name),
        |j, ids| host.create_joint(j, ids),
    )?;

    run_stage(
        report,
        Stage::Motors,
        &robot.motors,
        |m: &MotorRecord| entity(EntityCategory::Motor, m.id, &m.name),
        |m, ids| host.create_motor(m, ids),
    )?;

    run_stage(
        report,
        Stage::Sensors,
        &robot.sensors,
        |s: &SensorRecord| entity(EntityCategory::Sensor, s.id, &s.name),
        |s, ids| host.create_sensor(s, ids),
    )?;

    run_stage(
        report,
        Stage::Controllers,
        &robot.controllers,
        |c: &ControllerRecord| entity(EntityCategory::Controller, c.id, &c.name),
        |c, ids| host.create_controller(c, ids),
    )?;

    run_stage(
        report,
        Stage::Lights,
        &robot.lights,
        |l: &LightRecord| StageItem {
            category: None,
            id: EntityID::none(),
            name: &l.name,
        },
        |l, _| {
            if host.create_light(l) {
                Ok(0)
            } else {
                Err(refused("light"))
            }
        },
    )?;

    run_stage(
        report,
        Stage::Graphics,
        &robot.graphics,
        |_: &GraphicsRecord| StageItem {
            category: None,
            id: EntityID::none(),
            name: "graphics",
        },
        |g, _| {
            if host.set_graphics_options(g) {
                Ok(0)
            } else {
                Err(refused("graphics options"))
            }
        },
    )?;

    Ok(())
}

fn place_root(
    robot: &ConvertedRobot,
    host: &mut dyn SimulationHost,
    placement: &Pose,
    report: &AssemblyReport,
) -> Result<(), Error> {
    let name = robot
        .node(robot.root_node)
        .map(|n| n.name.as_str())
        .unwrap_or_default();
    let failed = |reason: String| Error::CreationFailed {
        stage: Stage::RootPose,
        id: robot.root_node,
        name: name.to_string(),
        reason,
    };

    let external = report
        .external_id(EntityCategory::Node, robot.root_node)
        .ok_or_else(|| failed("the root node was not created".to_string()))?;

    host.set_root_pose(external, placement.position(), placement.rotation())
        .map_err(|e| failed(e.reason))
}

/// Creates the entities of a converted robot in a simulation and places the robot in the world.
///
/// Each assembly runs under a fresh [RunID], so the external ids of different robots never
/// collide in an [ExternalIdTable].
///
/// ## Parameters
///
/// * 'robot' - The converted robot.
/// * 'host' - The simulation.
/// * 'options' - The options the robot was converted with.
/// * 'placement' - The world pose of the root node.
///
/// A creation failure does not roll back the entities created before it. The failure is stored
/// in [AssemblyReport::failure] and the root node is left where the host put it.
pub fn assemble(
    robot: &ConvertedRobot,
    host: &mut dyn SimulationHost,
    options: &ConversionOptions,
    placement: &Pose,
) -> AssemblyReport {
    let mut report = AssemblyReport::new(RunID::new());
    info!(robot = robot.name.as_str(), run = %report.run_id, "Assembling robot");

    let outcome = create_entities(robot, host, options, &mut report)
        .and_then(|_| place_root(robot, host, placement, &report));
    match outcome {
        Ok(()) => {
            report.root_placed = true;
            info!(
                robot = robot.name.as_str(),
                run = %report.run_id,
                nodes = report.created_in(Stage::Nodes),
                joints = report.created_in(Stage::Joints),
                "Assembled robot"
            );
        }
        Err(e) => {
            warn!(robot = robot.name.as_str(), run = %report.run_id, "Assembly stopped: {}", e);
            report.failure = Some(e);
        }
    }

    report
}
