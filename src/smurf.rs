//! The SMURF annotation data and the top-level conversion request.
//!
//! A SMURF document annotates a URDF kinematic tree with records grouped in sections. Each
//! section is an ordered list of records, and a record may pull in further YAML files through a
//! `URI` or `URIs` field.

extern crate nalgebra as na;

use std::path::{Path, PathBuf};

use na::Vector3;
use tracing::debug;

use crate::{
    config::{ConfigMap, ConfigValue},
    pose::Pose,
    Error,
};

#[cfg(feature = "urdf")]
use crate::{
    assembly::{assemble, AssemblyReport, SimulationHost},
    conversion::{convert, ConversionOptions, ConvertedRobot},
    description::{tree::RobotDescription, urdf_import::load_urdf_file},
};

#[cfg(test)]
#[path = "smurf_tests.rs"]
mod smurf_tests;

const INCLUDE_FIELD: &str = "URI";
const INCLUDE_LIST_FIELD: &str = "URIs";

/// Defines the SMURF sections that are merged onto a converted robot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmurfOverlay {
    /// The motor records, each driving the joint named by its `joint` field.
    pub motors: Vec<ConfigMap>,
    /// The sensor records.
    pub sensors: Vec<ConfigMap>,
    /// The material records, merged onto the materials of the same name.
    pub materials: Vec<ConfigMap>,
    /// The node records, merged onto the nodes of the same name.
    pub nodes: Vec<ConfigMap>,
    /// The visual records, keyed by visual shape name.
    pub visual: Vec<ConfigMap>,
    /// The collision records, keyed by collision shape name.
    pub collision: Vec<ConfigMap>,
    /// The light records.
    pub lights: Vec<ConfigMap>,
    /// The graphics option records.
    pub graphics: Vec<ConfigMap>,
    /// The controller records.
    pub controllers: Vec<ConfigMap>,
}

impl SmurfOverlay {
    /// Appends the records of another overlay, section by section.
    pub fn append(&mut self, other: SmurfOverlay) {
        for ((_, section), records) in self.sections_mut().into_iter().zip(other.into_sections()) {
            section.extend(records);
        }
    }

    /// Reads the SMURF sections from a document. Keys that are not section names are ignored.
    ///
    /// A section is a list of records. A section holding a single record is accepted as a list of
    /// one.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidDocument] - Returned when a section is neither a record nor a list of
    ///   records.
    pub fn from_config(document: &ConfigMap) -> Result<Self, Error> {
        let mut overlay = SmurfOverlay::default();
        for (name, records) in overlay.sections_mut() {
            match document.get(name) {
                None | Some(ConfigValue::Null) => {}
                Some(ConfigValue::Map(record)) => records.push(record.clone()),
                Some(ConfigValue::Sequence(items)) => {
                    for item in items {
                        let record = item.as_map().ok_or_else(|| Error::InvalidDocument {
                            reason: format!(
                                "the {} section holds {} where a record was expected",
                                name,
                                item.type_name()
                            ),
                        })?;
                        records.push(record.clone());
                    }
                }
                Some(other) => {
                    return Err(Error::InvalidDocument {
                        reason: format!(
                            "the {} section must be a list of records, found {}",
                            name,
                            other.type_name()
                        ),
                    })
                }
            }
        }

        Ok(overlay)
    }

    /// Returns a value indicating whether none of the sections has a record.
    pub fn is_empty(&self) -> bool {
        self.sections().iter().all(|(_, records)| records.is_empty())
    }

    /// Returns the total number of records over all sections.
    pub fn len(&self) -> usize {
        self.sections().iter().map(|(_, records)| records.len()).sum()
    }

    /// Loads the files referenced by the `URI` and `URIs` fields of every record and merges them
    /// into the record.
    ///
    /// The included documents form the base of the record and the fields of the record itself
    /// are merged on top. Includes are resolved recursively. Relative paths are resolved against
    /// `base_dir`. The `URI` and `URIs` fields are removed.
    ///
    /// ## Errors
    ///
    /// * [Error::UnreadableDocument] - Returned when an included file cannot be read.
    /// * [Error::InvalidDocument] - Returned when an included file is not a YAML map, or when a
    ///   file includes itself.
    /// * [Error::FieldType] - Returned when an include field is not a string or a list of strings.
    pub fn resolve_uris(&mut self, base_dir: &Path) -> Result<(), Error> {
        for (_, records) in self.sections_mut() {
            for record in records.iter_mut() {
                if record.contains_key(INCLUDE_FIELD) || record.contains_key(INCLUDE_LIST_FIELD) {
                    let mut chain = Vec::new();
                    *record = resolve_record(record, base_dir, &mut chain)?;
                }
            }
        }

        Ok(())
    }

    fn into_sections(self) -> [Vec<ConfigMap>; 9] {
        [
            self.motors,
            self.sensors,
            self.materials,
            self.nodes,
            self.visual,
            self.collision,
            self.lights,
            self.graphics,
            self.controllers,
        ]
    }

    fn sections(&self) -> [(&'static str, &Vec<ConfigMap>); 9] {
        [
            ("motors", &self.motors),
            ("sensors", &self.sensors),
            ("materials", &self.materials),
            ("nodes", &self.nodes),
            ("visual", &self.visual),
            ("collision", &self.collision),
            ("lights", &self.lights),
            ("graphics", &self.graphics),
            ("controllers", &self.controllers),
        ]
    }

    fn sections_mut(&mut self) -> [(&'static str, &mut Vec<ConfigMap>); 9] {
        [
            ("motors", &mut self.motors),
            ("sensors", &mut self.sensors),
            ("materials", &mut self.materials),
            ("nodes", &mut self.nodes),
            ("visual", &mut self.visual),
            ("collision", &mut self.collision),
            ("lights", &mut self.lights),
            ("graphics", &mut self.graphics),
            ("controllers", &mut self.controllers),
        ]
    }
}

fn include_paths(record: &ConfigMap, base_dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let record_name = record.name().unwrap_or("include");
    let mut files = record
        .get_string_list(record_name, INCLUDE_FIELD)?
        .unwrap_or_default();
    files.extend(
        record
            .get_string_list(record_name, INCLUDE_LIST_FIELD)?
            .unwrap_or_default(),
    );

    // Absolute paths replace the base directory
    Ok(files
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| base_dir.join(f))
        .collect())
}

fn resolve_record(
    record: &ConfigMap,
    base_dir: &Path,
    chain: &mut Vec<PathBuf>,
) -> Result<ConfigMap, Error> {
    let mut resolved = ConfigMap::new();
    for path in include_paths(record, base_dir)? {
        if chain.contains(&path) {
            return Err(Error::InvalidDocument {
                reason: format!("{} includes itself", path.display()),
            });
        }

        debug!(file = %path.display(), "Including SMURF record file");
        let included = ConfigMap::from_yaml_file(&path)?;
        chain.push(path);
        let included = resolve_record(&included, base_dir, chain)?;
        chain.pop();

        resolved.append(&included);
    }

    let mut own = record.clone();
    own.remove(INCLUDE_FIELD);
    own.remove(INCLUDE_LIST_FIELD);
    resolved.append(&own);

    Ok(resolved)
}

/// Defines the kind of document a [ConversionRequest] points at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DocumentKind {
    /// A plain URDF document.
    Urdf,
    /// A SMURF manifest that references a URDF document and annotation files.
    Smurf,
}

/// Defines a request to load a robot into the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversionRequest {
    /// The name of the robot in the simulation. Replaces the name of the document.
    pub name: String,
    /// The kind of document.
    pub kind: DocumentKind,
    /// The directory the document and its includes are resolved against.
    pub path: PathBuf,
    /// The file name of the document, relative to [ConversionRequest::path].
    pub uri: String,
    /// The position of the robot root in the world.
    pub position: Vector3<f64>,
    /// The orientation of the robot root in the world, as Euler angles in degrees.
    pub rotation_degrees: Vector3<f64>,
}

impl ConversionRequest {
    /// Returns the full path of the document.
    pub fn document_path(&self) -> PathBuf {
        self.path.join(&self.uri)
    }

    /// Reads a request from an entity record.
    ///
    /// The record holds `name` and `URI`, and optionally `type` (`urdf` or `smurf`, defaults to
    /// `urdf`), `path`, `position` and `rotation`. `position` and `rotation` accept a map with
    /// `x`, `y` and `z` or a list of three numbers.
    ///
    /// ## Errors
    ///
    /// * [Error::MissingField] - Returned when `name` or `URI` is missing.
    /// * [Error::FieldType] - Returned when a field has the wrong type, or `type` names an
    ///   unknown document kind.
    pub fn from_config(record: &ConfigMap) -> Result<Self, Error> {
        const RECORD: &str = "entity";

        let name = record.require_str(RECORD, "name")?.to_string();
        let uri = record.require_str(RECORD, INCLUDE_FIELD)?.to_string();
        let kind = match record.get_str(RECORD, "type")? {
            None | Some("urdf") => DocumentKind::Urdf,
            Some("smurf") => DocumentKind::Smurf,
            Some(_) => {
                return Err(Error::FieldType {
                    record: RECORD.to_string(),
                    field: "type".to_string(),
                    expected: "one of urdf, smurf".to_string(),
                })
            }
        };
        let path = record
            .get_str(RECORD, "path")?
            .map(PathBuf::from)
            .unwrap_or_default();
        let position = record
            .get_vector3(RECORD, "position")?
            .unwrap_or_else(Vector3::zeros);
        let rotation_degrees = record
            .get_vector3(RECORD, "rotation")?
            .unwrap_or_else(Vector3::zeros);

        Ok(Self {
            name,
            kind,
            path,
            uri,
            position,
            rotation_degrees,
        })
    }

    /// Returns the pose the root node is placed at.
    pub fn root_pose(&self) -> Pose {
        Pose::from_position_and_euler_degrees(self.position, self.rotation_degrees)
    }
}

/// Reads a SMURF manifest and the documents it references.
///
/// The `files` list of the manifest names the documents, relative to the directory of the
/// manifest. The first `.urdf` file is the kinematic tree. Every `.yml` or `.yaml` file holds
/// SMURF sections that are appended to the overlay in file order. Sections written in the
/// manifest itself are appended last. Includes are resolved against the manifest directory.
///
/// ## Errors
///
/// * [Error::UnreadableDocument] - Returned when a document cannot be read.
/// * [Error::InvalidDocument] - Returned when a document is malformed, or when the manifest
///   names no URDF file.
#[cfg(feature = "urdf")]
pub fn load_smurf_file<P: AsRef<Path>>(path: P) -> Result<(RobotDescription, SmurfOverlay), Error> {
    let path = path.as_ref();
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let manifest = ConfigMap::from_yaml_file(path)?;
    let files = manifest
        .get_string_list(&path.display().to_string(), "files")?
        .unwrap_or_default();

    let mut description = None;
    let mut overlay = SmurfOverlay::default();
    for file in &files {
        let file_path = base_dir.join(file);
        match file_path.extension().and_then(|e| e.to_str()) {
            Some("urdf") if description.is_none() => {
                debug!(file = %file_path.display(), "Loading the kinematic tree");
                description = Some(load_urdf_file(&file_path)?);
            }
            Some("yml" | "yaml") => {
                debug!(file = %file_path.display(), "Loading SMURF annotations");
                let document = ConfigMap::from_yaml_file(&file_path)?;
                overlay.append(SmurfOverlay::from_config(&document)?);
            }
            _ => debug!(file = %file_path.display(), "Skipping SMURF file"),
        }
    }

    overlay.append(SmurfOverlay::from_config(&manifest)?);
    overlay.resolve_uris(&base_dir)?;

    let description = description.ok_or_else(|| Error::InvalidDocument {
        reason: format!("{} does not reference a URDF document", path.display()),
    })?;

    Ok((description, overlay))
}

/// Defines the outcome of [load_entity].
#[cfg(feature = "urdf")]
#[derive(Debug)]
pub struct LoadedEntity {
    /// The converted robot.
    pub robot: ConvertedRobot,
    /// The outcome of creating the robot in the simulation.
    pub report: AssemblyReport,
}

/// Loads the document named by the request, converts it and creates it in the simulation.
///
/// Group ids continue after the largest group id the host already uses. The robot is placed
/// at the pose of the request once every entity was created.
///
/// ## Errors
///
/// Returns the loading and conversion errors. Failures while creating the entities in the host
/// are reported in [LoadedEntity::report].
#[cfg(feature = "urdf")]
pub fn load_entity(
    request: &ConversionRequest,
    options: &ConversionOptions,
    host: &mut dyn SimulationHost,
) -> Result<LoadedEntity, Error> {
    let document = request.document_path();
    let (description, overlay) = match request.kind {
        DocumentKind::Urdf => (load_urdf_file(&document)?, None),
        DocumentKind::Smurf => {
            let (description, overlay) = load_smurf_file(&document)?;
            (description, Some(overlay))
        }
    };

    let first_group_id = host.max_group_id().saturating_add(1);
    let mut robot = convert(&description, overlay.as_ref(), options, first_group_id)?;
    robot.name = request.name.clone();

    let report = assemble(&robot, host, options, &request.root_pose());

    Ok(LoadedEntity { robot, report })
}
