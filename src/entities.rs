/// Defines the joints of the simulation.
pub mod joint;

/// Defines the materials of the simulation.
pub mod material;

/// Defines the rigid bodies of the simulation.
pub mod node;

/// Defines the motors, sensors, controllers, lights and graphics options.
pub mod records;
