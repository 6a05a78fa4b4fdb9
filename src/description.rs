/// Defines the links, joints, shapes and materials of the input document.
pub mod elements;

/// Defines the kinematic tree formed by the links and joints.
pub mod tree;

/// Defines the adapter from URDF documents parsed by `urdf-rs`.
#[cfg(feature = "urdf")]
pub mod urdf_import;
