//! Resolves the names referenced by the SMURF motor, sensor and controller records into ids.
//!
//! A record is checked completely before it receives an id. A record with a reference that
//! cannot be resolved is rejected and reported, the records after it are still processed.

use tracing::debug;

use crate::{
    config::ConfigMap,
    description::tree::RobotDescription,
    entities::records::{ControllerRecord, MotorRecord, SensorRecord},
    registry::{EntityCategory, EntityID, IdRegistry},
    ConversionWarning, Error,
};

use super::ConversionState;

#[cfg(test)]
#[path = "references_tests.rs"]
mod references_tests;

/// The sign written for every motor axis.
// The motor axis is not derived from the joint configuration.
pub const MOTOR_AXIS: i32 = 1;

fn record_name<'a>(record: &'a ConfigMap, section: &str) -> Result<&'a str, Error> {
    record
        .get_str(section, "name")?
        .ok_or_else(|| Error::MissingField {
            record: section.to_string(),
            field: "name".to_string(),
        })
}

fn resolve_list(
    registry: &IdRegistry,
    record: &ConfigMap,
    name: &str,
    field: &str,
    category: EntityCategory,
) -> Result<Vec<EntityID>, Error> {
    match record.get_string_list(name, field)? {
        None => Ok(Vec::new()),
        Some(references) => references
            .iter()
            .map(|reference| registry.resolve_for(category, reference, name))
            .collect(),
    }
}

fn ensure_unregistered(
    registry: &IdRegistry,
    category: EntityCategory,
    name: &str,
) -> Result<(), Error> {
    match registry.resolve(category, name) {
        Some(_) => Err(Error::DuplicateName {
            category,
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}

fn reject(state: &mut ConversionState, error: Error) {
    state.warn(ConversionWarning::RejectedRecord(error));
}

fn resolve_motor(registry: &IdRegistry, record: &ConfigMap) -> Result<MotorRecord, Error> {
    let name = record_name(record, "motors")?;
    let joint_name = record.require_str(name, "joint")?;
    let joint_id = registry.resolve_for(EntityCategory::Joint, joint_name, name)?;
    ensure_unregistered(registry, EntityCategory::Motor, name)?;

    Ok(MotorRecord {
        id: EntityID::none(),
        name: name.to_string(),
        joint_name: joint_name.to_string(),
        joint_id,
        axis: MOTOR_AXIS,
        config: record.clone(),
    })
}

/// Resolves the SMURF motor records. Every motor drives the joint named by its `joint` field.
pub(super) fn resolve_motors(state: &mut ConversionState, records: &[ConfigMap]) {
    for record in records {
        match resolve_motor(&state.registry, record) {
            Ok(mut motor) => {
                match state.registry.register(EntityCategory::Motor, &motor.name) {
                    Ok(id) => motor.id = id,
                    Err(e) => {
                        reject(state, e);
                        continue;
                    }
                }

                debug!(motor = motor.name.as_str(), id = motor.id.value(), "Resolved motor");
                state.motors.push(motor);
            }
            Err(e) => reject(state, e),
        }
    }
}

/// Returns the category of the entries of a sensor `id` list, based on the sensor type.
fn id_category(sensor_type: &str) -> Option<(EntityCategory, bool)> {
    if sensor_type.contains("Motor") {
        Some((EntityCategory::Motor, false))
    } else if sensor_type.contains("Node") {
        Some((EntityCategory::Node, sensor_type.contains("Contact")))
    } else if sensor_type.contains("Joint") {
        Some((EntityCategory::Joint, false))
    } else {
        None
    }
}

fn resolve_sensor(
    state: &mut ConversionState,
    description: &RobotDescription,
    record: &ConfigMap,
) -> Result<SensorRecord, Error> {
    let name = record_name(record, "sensors")?;
    let sensor_type = record.get_str(name, "type")?.unwrap_or_default();
    let registry = &state.registry;

    let link = record.get_str(name, "link")?;
    let attached_node = match link {
        Some(link) => registry.resolve_for(EntityCategory::Node, link, name)?,
        None => EntityID::none(),
    };

    let mut joint_id = match record.get_str(name, "joint")? {
        Some(joint) => registry.resolve_for(EntityCategory::Joint, joint, name)?,
        None => EntityID::none(),
    };

    if sensor_type == "Joint6DOF" {
        let link = link.ok_or_else(|| Error::MissingField {
            record: name.to_string(),
            field: "link".to_string(),
        })?;
        let parent_joint = description
            .link_by_name(link)
            .and_then(|l| description.parent_joint(l))
            .map(|j| description.joint(j).name.as_str())
            .ok_or_else(|| Error::UnresolvedReference {
                category: EntityCategory::Joint,
                record: name.to_string(),
                reference: format!("parent joint of {}", link),
            })?;
        joint_id = registry.resolve_for(EntityCategory::Joint, parent_joint, name)?;
    }

    let mut ids = Vec::new();
    let mut unknown_category = false;
    if let Some(references) = record.get_string_list(name, "id")? {
        match id_category(sensor_type) {
            Some((EntityCategory::Node, true)) => {
                for reference in &references {
                    let owner = registry.collision_owner(reference).ok_or_else(|| {
                        Error::UnresolvedReference {
                            category: EntityCategory::Node,
                            record: name.to_string(),
                            reference: reference.clone(),
                        }
                    })?;
                    ids.push(owner);
                }
            }
            Some((category, _)) => {
                for reference in &references {
                    ids.push(registry.resolve_for(category, reference, name)?);
                }
            }
            None => unknown_category = true,
        }
    }

    ids.extend(resolve_list(registry, record, name, "links", EntityCategory::Node)?);
    ids.extend(resolve_list(registry, record, name, "joints", EntityCategory::Joint)?);
    ids.extend(resolve_list(registry, record, name, "motors", EntityCategory::Motor)?);
    ensure_unregistered(registry, EntityCategory::Sensor, name)?;

    if unknown_category {
        state.warn(ConversionWarning::UnknownSensorIdCategory {
            sensor: name.to_string(),
            sensor_type: sensor_type.to_string(),
        });
    }

    Ok(SensorRecord {
        id: EntityID::none(),
        name: name.to_string(),
        sensor_type: sensor_type.to_string(),
        attached_node,
        joint_id,
        ids,
        config: record.clone(),
    })
}

/// Resolves the SMURF sensor records.
///
/// * `link` gives the node the sensor is attached to, `joint` the measured joint.
/// * `Joint6DOF` sensors measure the parent joint of their link.
/// * The `id` list holds motor, node, collision or joint names depending on the sensor type.
/// * The `links`, `joints` and `motors` lists are appended to the ids.
pub(super) fn resolve_sensors(
    state: &mut ConversionState,
    description: &RobotDescription,
    records: &[ConfigMap],
) {
    for record in records {
        match resolve_sensor(state, description, record) {
            Ok(mut sensor) => {
                match state.registry.register(EntityCategory::Sensor, &sensor.name) {
                    Ok(id) => sensor.id = id,
                    Err(e) => {
                        reject(state, e);
                        continue;
                    }
                }

                debug!(sensor = sensor.name.as_str(), id = sensor.id.value(), "Resolved sensor");
                state.sensors.push(sensor);
            }
            Err(e) => reject(state, e),
        }
    }
}

fn resolve_controller(registry: &IdRegistry, record: &ConfigMap) -> Result<ControllerRecord, Error> {
    let name = record_name(record, "controllers")?;
    let sensor_ids = resolve_list(registry, record, name, "sensors", EntityCategory::Sensor)?;
    let motor_ids = resolve_list(registry, record, name, "motors", EntityCategory::Motor)?;
    ensure_unregistered(registry, EntityCategory::Controller, name)?;

    Ok(ControllerRecord {
        id: EntityID::none(),
        name: name.to_string(),
        sensor_ids,
        motor_ids,
        config: record.clone(),
    })
}

/// Resolves the SMURF controller records. `sensors` and `motors` name the sensors the controller
/// reads and the motors it drives.
pub(super) fn resolve_controllers(state: &mut ConversionState, records: &[ConfigMap]) {
    for record in records {
        match resolve_controller(&state.registry, record) {
            Ok(mut controller) => {
                match state
                    .registry
                    .register(EntityCategory::Controller, &controller.name)
                {
                    Ok(id) => controller.id = id,
                    Err(e) => {
                        reject(state, e);
                        continue;
                    }
                }

                debug!(
                    controller = controller.name.as_str(),
                    id = controller.id.value(),
                    "Resolved controller"
                );
                state.controllers.push(controller);
            }
            Err(e) => reject(state, e),
        }
    }
}
