use crate::{config::ConfigMap, registry::EntityID};

/// Defines a motor driving a joint.
#[derive(Clone, Debug, PartialEq)]
pub struct MotorRecord {
    /// The id of the motor.
    pub id: EntityID,
    /// The unique name of the motor.
    pub name: String,
    /// The name of the driven joint.
    pub joint_name: String,
    /// The id of the driven joint.
    pub joint_id: EntityID,
    /// The sign of the motor axis. Always 1.
    pub axis: i32,
    /// The SMURF record of the motor, with all includes merged.
    pub config: ConfigMap,
}

/// Defines a sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorRecord {
    /// The id of the sensor.
    pub id: EntityID,
    /// The unique name of the sensor.
    pub name: String,
    /// The sensor type, e.g. `Joint6DOF` or `NodeContact`.
    pub sensor_type: String,
    /// The node the sensor is attached to, or [EntityID::none()].
    pub attached_node: EntityID,
    /// The joint the sensor measures, or [EntityID::none()].
    pub joint_id: EntityID,
    /// The entities the sensor reads from. The category depends on the sensor type.
    pub ids: Vec<EntityID>,
    /// The SMURF record of the sensor, with all includes merged.
    pub config: ConfigMap,
}

/// Defines a controller that reads sensors and drives motors.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerRecord {
    /// The id of the controller.
    pub id: EntityID,
    /// The unique name of the controller.
    pub name: String,
    /// The sensors the controller reads, in record order.
    pub sensor_ids: Vec<EntityID>,
    /// The motors the controller drives, in record order.
    pub motor_ids: Vec<EntityID>,
    /// The SMURF record of the controller, with all includes merged.
    pub config: ConfigMap,
}

/// Defines a light source. Passed on to the simulation as is.
#[derive(Clone, Debug, PartialEq)]
pub struct LightRecord {
    /// The name of the light, empty when the record has none.
    pub name: String,
    /// The SMURF record of the light.
    pub config: ConfigMap,
}

/// Defines a set of graphics options. Passed on to the simulation as is.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicsRecord {
    /// The SMURF record of the graphics options.
    pub config: ConfigMap,
}
