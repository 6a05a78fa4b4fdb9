//! Defines the registry that hands out the dense integer ids of the converted entities and
//! resolves names into those ids.

use std::{
    collections::HashMap,
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::Error;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;

/// Defines the kinds of entity that receive ids.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EntityCategory {
    /// A rigid body.
    Node,
    /// A joint between two nodes.
    Joint,
    /// A material used to render nodes.
    Material,
    /// A motor driving a joint.
    Motor,
    /// A sensor.
    Sensor,
    /// A controller connecting sensors and motors.
    Controller,
}

impl EntityCategory {
    /// All categories, in creation order.
    pub const ALL: [EntityCategory; 6] = [
        EntityCategory::Material,
        EntityCategory::Node,
        EntityCategory::Joint,
        EntityCategory::Motor,
        EntityCategory::Sensor,
        EntityCategory::Controller,
    ];

    fn slot(&self) -> usize {
        match self {
            EntityCategory::Node => 0,
            EntityCategory::Joint => 1,
            EntityCategory::Material => 2,
            EntityCategory::Motor => 3,
            EntityCategory::Sensor => 4,
            EntityCategory::Controller => 5,
        }
    }
}

impl Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityCategory::Node => "node",
            EntityCategory::Joint => "joint",
            EntityCategory::Material => "material",
            EntityCategory::Motor => "motor",
            EntityCategory::Sensor => "sensor",
            EntityCategory::Controller => "controller",
        };
        write!(f, "{}", name)
    }
}

/// The EntityID value for the 'NONE' ID.
const NONE_ENTITY_ID: u64 = 0;

/// Defines the id of a converted entity within its [EntityCategory].
///
/// Ids are handed out by an [IdRegistry], start at 1 and have no gaps. The value 0 is reserved
/// to mean "no entity", e.g. the parent of a root node or an unset group.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityID {
    id: u64,
}

impl EntityID {
    /// Returns a value indicating if the given ID is the [EntityID::none()] ID.
    pub fn is_none(&self) -> bool {
        self.id == NONE_ENTITY_ID
    }

    pub(crate) fn new(id: u64) -> Self {
        Self { id }
    }

    /// Returns the EntityID that doesn't belong to any entity.
    pub fn none() -> Self {
        Self { id: NONE_ENTITY_ID }
    }

    /// Returns the integer value of the id.
    pub fn value(&self) -> u64 {
        self.id
    }
}

impl Display for EntityID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityID [{}]", self.id)
    }
}

/// The RunID counter value for the 'NONE' ID.
const NONE_RUN_ID: u64 = 0;

/// Atomic counter for RunID instances
/// The counter starts at 1 because 0 is reserved for the 'NONE' ID.
static RUN_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Defines a unique id for one assembly of a converted robot into a simulation.
///
/// - Can be cloned safely
/// - Can be created safely across many threads
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RunID {
    id: u64,
}

impl RunID {
    /// Returns a value indicating if the given ID is the [RunID::none()] ID.
    pub fn is_none(&self) -> bool {
        self.id == NONE_RUN_ID
    }

    /// Create a new ID in a thread safe manner.
    #[cfg_attr(test, mutants::skip)] // The counter is shared by every test thread, the values are not predictable
    pub fn new() -> Self {
        Self {
            id: RUN_ID_COUNTER.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Returns the RunID that doesn't belong to any run.
    pub fn none() -> Self {
        Self { id: NONE_RUN_ID }
    }
}

impl Default for RunID {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RunID [{}]", self.id)
    }
}

/// Hands out ids per [EntityCategory] and keeps the name maps of one conversion.
///
/// A registry belongs to a single conversion. Every conversion starts from a fresh registry.
#[derive(Clone, Debug, Default)]
pub struct IdRegistry {
    /// The last id handed out per category.
    counters: [u64; 6],

    /// The mapping from name to id per category.
    names: [HashMap<String, EntityID>; 6],

    /// The mapping from collision shape name to the node that owns the shape.
    collision_owner: HashMap<String, EntityID>,

    /// The mapping from visual shape name to the name of the node its overlays apply to.
    visual_owner: HashMap<String, String>,
}

impl IdRegistry {
    /// Returns the node that owns the collision shape with the given name.
    pub fn collision_owner(&self, shape: &str) -> Option<EntityID> {
        self.collision_owner.get(shape).copied()
    }

    /// Returns the number of ids handed out for the category.
    pub fn count(&self, category: EntityCategory) -> u64 {
        self.counters[category.slot()]
    }

    /// Returns the registered names of a category together with their ids, ordered by id.
    pub fn entries(&self, category: EntityCategory) -> Vec<(&str, EntityID)> {
        let mut result: Vec<(&str, EntityID)> = self.names[category.slot()]
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
            .collect();
        result.sort_by_key(|(_, id)| *id);
        result
    }

    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the node that owns a collision shape. Unnamed shapes are not recorded.
    pub fn record_collision(&mut self, shape: &str, node: EntityID) {
        if !shape.is_empty() {
            self.collision_owner.insert(shape.to_string(), node);
        }
    }

    /// Records the node that overlays of a visual shape apply to. Unnamed shapes are not
    /// recorded.
    pub fn record_visual(&mut self, shape: &str, node: &str) {
        if !shape.is_empty() {
            self.visual_owner
                .insert(shape.to_string(), node.to_string());
        }
    }

    /// Hands out the next id of the category and records it under the given name.
    ///
    /// ## Parameters
    ///
    /// * 'category' - The category of the entity.
    /// * 'name' - The name of the entity. Must be unique within the category.
    ///
    /// ## Errors
    ///
    /// * [Error::DuplicateName] - Returned when the name is already registered in the category.
    ///   No id is used up in that case.
    pub fn register(&mut self, category: EntityCategory, name: &str) -> Result<EntityID, Error> {
        let slot = category.slot();
        if self.names[slot].contains_key(name) {
            return Err(Error::DuplicateName {
                category,
                name: name.to_string(),
            });
        }

        self.counters[slot] += 1;
        let id = EntityID::new(self.counters[slot]);
        self.names[slot].insert(name.to_string(), id);

        Ok(id)
    }

    /// Returns the id registered under the name in the category.
    pub fn resolve(&self, category: EntityCategory, name: &str) -> Option<EntityID> {
        self.names[category.slot()].get(name).copied()
    }

    /// Returns the id registered under the name in the category, or an error naming the record
    /// that holds the reference.
    ///
    /// ## Errors
    ///
    /// * [Error::UnresolvedReference] - Returned when the name is not registered.
    pub fn resolve_for(
        &self,
        category: EntityCategory,
        name: &str,
        record: &str,
    ) -> Result<EntityID, Error> {
        self.resolve(category, name)
            .ok_or_else(|| Error::UnresolvedReference {
                category,
                record: record.to_string(),
                reference: name.to_string(),
            })
    }

    /// Returns the name of the node that overlays of the visual shape apply to.
    pub fn visual_owner(&self, shape: &str) -> Option<&str> {
        self.visual_owner.get(shape).map(String::as_str)
    }
}

/// Stores the ids that the simulation assigned to the converted entities.
///
/// Entries are keyed by category, internal id and run so that the entities of different
/// assemblies never collide.
#[derive(Clone, Debug, Default)]
pub struct ExternalIdTable {
    entries: HashMap<(EntityCategory, EntityID, RunID), u64>,
}

impl ExternalIdTable {
    /// Returns the external id of an entity.
    pub fn get(&self, category: EntityCategory, id: EntityID, run: RunID) -> Option<u64> {
        self.entries.get(&(category, id, run)).copied()
    }

    /// Records the external id of an entity and returns the previous one, if any.
    pub fn insert(
        &mut self,
        category: EntityCategory,
        id: EntityID,
        run: RunID,
        external: u64,
    ) -> Option<u64> {
        self.entries.insert((category, id, run), external)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns a value indicating whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a view of the entries of one run.
    pub fn mapping(&self, run: RunID) -> IdMapping<'_> {
        IdMapping { table: self, run }
    }
}

/// Defines a read-only view of the external ids of one run.
#[derive(Clone, Copy, Debug)]
pub struct IdMapping<'a> {
    table: &'a ExternalIdTable,
    run: RunID,
}

impl<'a> IdMapping<'a> {
    /// Returns the external id of an entity in the run.
    pub fn get(&self, category: EntityCategory, id: EntityID) -> Option<u64> {
        self.table.get(category, id, self.run)
    }

    /// Returns the run of the view.
    pub fn run(&self) -> RunID {
        self.run
    }
}
