//! Defines the materials used to render nodes.

extern crate nalgebra as na;

use na::Vector4;
use tracing::warn;

use crate::{
    config::{ConfigMap, ConfigValue},
    description::elements::MaterialDescription,
    registry::EntityID,
    ConversionWarning, Error,
};

#[cfg(test)]
#[path = "material_tests.rs"]
mod material_tests;

/// Defines a material of the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// The id of the material.
    pub id: EntityID,
    /// The unique name of the material.
    pub name: String,
    /// Whether the material should be created in the simulation.
    pub exists: bool,
    /// The diffuse colour as r, g, b, a.
    pub diffuse: Vector4<f64>,
    /// The texture file, empty for untextured materials.
    pub texture_filename: String,
    /// The render layers the material is visible in.
    pub cull_mask: u32,
    /// Additional fields appended by SMURF overlays.
    pub extra: ConfigMap,
}

impl Material {
    /// Merges a SMURF material record onto the material.
    ///
    /// `diffuseColor` (a map with `r`, `g`, `b` and optionally `a`), `texturename` and
    /// `cullMask` update the typed members, every other field is appended to
    /// [Material::extra].
    pub fn apply_overlay(&mut self, overlay: &ConfigMap) -> Vec<ConversionWarning> {
        let mut warnings = Vec::new();
        for (key, value) in overlay.iter() {
            let result = match key {
                "name" => Ok(()),
                "diffuseColor" => read_color(overlay, &self.name, key).map(|c| {
                    if let Some(c) = c {
                        self.diffuse = c;
                    }
                }),
                "texturename" => overlay.get_str(&self.name, key).map(|t| {
                    if let Some(t) = t {
                        self.texture_filename = t.to_string();
                    }
                }),
                "cullMask" => overlay.get_u64(&self.name, key).and_then(|m| {
                    if let Some(m) = m {
                        self.cull_mask = u32::try_from(m).map_err(|_| Error::FieldType {
                            record: self.name.clone(),
                            field: key.to_string(),
                            expected: "a 32 bit mask".to_string(),
                        })?;
                    }
                    Ok(())
                }),
                _ => {
                    let mut single = ConfigMap::new();
                    single.insert(key, value.clone());
                    self.extra.append(&single);
                    Ok(())
                }
            };

            if let Err(e) = result {
                warn!(material = self.name.as_str(), field = key, "Ignoring overlay field: {}", e);
                warnings.push(ConversionWarning::IgnoredOverlayField(e));
            }
        }

        warnings
    }

    /// Creates the material that is used for shapes without a material reference.
    pub fn fallback(id: EntityID, name: &str, diffuse: Vector4<f64>) -> Self {
        Self {
            id,
            name: name.to_string(),
            exists: true,
            diffuse,
            texture_filename: String::new(),
            cull_mask: 1,
            extra: ConfigMap::new(),
        }
    }

    /// Creates a material from a material of the input document.
    pub fn from_description(id: EntityID, description: &MaterialDescription) -> Self {
        Self {
            id,
            name: description.name.clone(),
            exists: true,
            diffuse: description.color,
            texture_filename: description.texture_filename.clone(),
            cull_mask: 1,
            extra: ConfigMap::new(),
        }
    }
}

fn read_color(overlay: &ConfigMap, record: &str, field: &str) -> Result<Option<Vector4<f64>>, Error> {
    let map = match overlay.get_map(record, field)? {
        None => return Ok(None),
        Some(m) => m,
    };

    let channel = |name: &str| map.get(name).and_then(ConfigValue::as_f64);
    match (channel("r"), channel("g"), channel("b")) {
        (Some(r), Some(g), Some(b)) => Ok(Some(Vector4::new(r, g, b, channel("a").unwrap_or(1.0)))),
        _ => Err(Error::FieldType {
            record: record.to_string(),
            field: field.to_string(),
            expected: "a colour {r, g, b, a}".to_string(),
        }),
    }
}
