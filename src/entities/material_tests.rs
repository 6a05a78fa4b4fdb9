use nalgebra::Vector4;

use crate::{
    config::{ConfigMap, ConfigValue},
    description::elements::MaterialDescription,
    registry::EntityID,
    ConversionWarning,
};

use super::Material;

#[test]
fn when_creating_the_fallback_material_should_be_visible_and_untextured() {
    let material = Material::fallback(
        EntityID::new(1),
        "_fakeMaterial",
        Vector4::new(1.0, 0.0, 0.0, 1.0),
    );

    assert!(material.exists);
    assert_eq!("_fakeMaterial", material.name);
    assert_eq!("", material.texture_filename);
    assert_eq!(1, material.cull_mask);
}

#[test]
fn when_creating_from_a_description_should_copy_colour_and_texture() {
    let description = MaterialDescription {
        name: "wood".to_string(),
        color: Vector4::new(0.5, 0.3, 0.1, 1.0),
        texture_filename: "wood.png".to_string(),
    };

    let material = Material::from_description(EntityID::new(2), &description);

    assert_eq!(EntityID::new(2), material.id);
    assert_eq!(Vector4::new(0.5, 0.3, 0.1, 1.0), material.diffuse);
    assert_eq!("wood.png", material.texture_filename);
}

#[test]
fn when_applying_an_overlay_should_update_colour_and_append_other_fields() {
    let mut material = Material::fallback(EntityID::new(2), "blue", Vector4::new(0.0, 0.0, 1.0, 1.0));
    let overlay = ConfigMap::from_yaml_str(
        "name: blue\ndiffuseColor: {r: 0.1, g: 0.2, b: 0.9}\nshininess: 50\nambientColor: {r: 1}\n",
    )
    .unwrap();

    let warnings = material.apply_overlay(&overlay);

    assert!(warnings.is_empty());
    assert_eq!(Vector4::new(0.1, 0.2, 0.9, 1.0), material.diffuse);
    assert_eq!(Some(&ConfigValue::Integer(50)), material.extra.get("shininess"));
    assert!(material.extra.contains_key("ambientColor"));
    assert!(!material.extra.contains_key("name"));
}

#[test]
fn when_applying_overlays_twice_should_merge_nested_fields() {
    let mut material = Material::fallback(EntityID::new(2), "m", Vector4::new(1.0, 1.0, 1.0, 1.0));
    material.apply_overlay(&ConfigMap::from_yaml_str("shader: {name: phong}\n").unwrap());
    material.apply_overlay(&ConfigMap::from_yaml_str("shader: {normals: true}\n").unwrap());

    let shader = material
        .extra
        .get("shader")
        .and_then(ConfigValue::as_map)
        .unwrap();
    assert_eq!(2, shader.len());
}

#[test]
fn when_the_colour_is_incomplete_should_warn_and_keep_the_colour() {
    let mut material = Material::fallback(EntityID::new(2), "m", Vector4::new(1.0, 1.0, 1.0, 1.0));
    let overlay = ConfigMap::from_yaml_str("diffuseColor: {r: 0.1}\ntexturename: t.png\n").unwrap();

    let warnings = material.apply_overlay(&overlay);

    assert_eq!(1, warnings.len());
    assert!(matches!(warnings[0], ConversionWarning::IgnoredOverlayField(_)));
    assert_eq!(Vector4::new(1.0, 1.0, 1.0, 1.0), material.diffuse);
    assert_eq!("t.png", material.texture_filename);
}
