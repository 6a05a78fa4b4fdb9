use tracing::trace;

use crate::{
    config::ConfigMap,
    entities::{
        node::OverlayKind,
        records::{GraphicsRecord, LightRecord},
    },
    ConversionWarning,
};

use super::ConversionState;

#[cfg(test)]
#[path = "overlay_merge_tests.rs"]
mod overlay_merge_tests;

fn unmatched(state: &mut ConversionState, section: &str, record: &ConfigMap) {
    state.warn(ConversionWarning::UnmatchedOverlay {
        section: section.to_string(),
        name: record.name().unwrap_or_default().to_string(),
    });
}

// The entities log their own overlay warnings.
fn report(state: &mut ConversionState, warnings: Vec<ConversionWarning>) {
    state.warnings.extend(warnings);
}

/// Merges the SMURF material records into the materials of the same name.
pub(super) fn merge_materials(state: &mut ConversionState, records: &[ConfigMap]) {
    for record in records {
        let target = record
            .name()
            .and_then(|name| state.materials.iter_mut().find(|m| m.name == name));
        match target {
            Some(material) => {
                let warnings = material.apply_overlay(record);
                report(state, warnings);
            }
            None => unmatched(state, "materials", record),
        }
    }
}

/// Merges the SMURF node records into the nodes of the same name.
pub(super) fn merge_nodes(state: &mut ConversionState, records: &[ConfigMap]) {
    for record in records {
        let target = record
            .name()
            .and_then(|name| state.nodes.iter_mut().find(|n| n.name == name));
        match target {
            Some(node) => {
                let warnings = node.apply_overlay(record, OverlayKind::Node);
                report(state, warnings);
            }
            None => unmatched(state, "nodes", record),
        }
    }
}

/// Merges the SMURF visual records into the node that carries the named visual shape. Records
/// that match no visual shape are dropped.
pub(super) fn merge_visuals(state: &mut ConversionState, records: &[ConfigMap]) {
    for record in records {
        let owner = record
            .name()
            .and_then(|name| state.registry.visual_owner(name))
            .map(str::to_string);
        let target = owner.and_then(|owner| state.nodes.iter_mut().find(|n| n.name == owner));
        match target {
            Some(node) => {
                let warnings = node.apply_overlay(record, OverlayKind::Visual);
                report(state, warnings);
            }
            None => trace!(
                visual = record.name().unwrap_or_default(),
                "Dropping visual overlay without a matching shape"
            ),
        }
    }
}

/// Merges the SMURF collision records into the node that owns the named collision shape.
/// Records that match no collision shape are dropped.
pub(super) fn merge_collisions(state: &mut ConversionState, records: &[ConfigMap]) {
    for record in records {
        let owner = record
            .name()
            .and_then(|name| state.registry.collision_owner(name));
        let target = owner.and_then(|id| state.nodes.iter_mut().find(|n| n.id == id));
        match target {
            Some(node) => {
                let warnings = node.apply_overlay(record, OverlayKind::Collision);
                report(state, warnings);
            }
            None => trace!(
                collision = record.name().unwrap_or_default(),
                "Dropping collision overlay without a matching shape"
            ),
        }
    }
}

pub(super) fn collect_lights(state: &mut ConversionState, records: &[ConfigMap]) {
    state.lights.extend(records.iter().map(|r| LightRecord {
        name: r.name().unwrap_or_default().to_string(),
        config: r.clone(),
    }));
}

pub(super) fn collect_graphics(state: &mut ConversionState, records: &[ConfigMap]) {
    state
        .graphics
        .extend(records.iter().map(|r| GraphicsRecord { config: r.clone() }));
}
