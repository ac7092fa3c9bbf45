//! A project directory and the documents it holds.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::conditions::{self, ABL_CONDITIONS, INITIAL_CONDITIONS};
use crate::control::{ControlDict, DecomposeParDict, Probes};
use crate::error::{FoamError, Result};
use crate::fields::FieldKind;
use crate::foamfile::FoamFile;
use crate::geometry::Geometry;
use crate::solution::{FvSchemes, FvSolution, TurbulenceProperties};

pub const ZERO_FOLDER: &str = "0";
pub const CONSTANT_FOLDER: &str = "constant";
pub const SYSTEM_FOLDER: &str = "system";

/// Meshing inputs that solver documents depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshMetadata {
    /// The `locationInMesh` text of `snappyHexMeshDict`, e.g. `(0 0 1)`.
    pub location_in_mesh: String,
}

impl Default for MeshMetadata {
    fn default() -> Self {
        MeshMetadata {
            location_in_mesh: "(0 0 0)".to_string(),
        }
    }
}

pub struct Case {
    pub name: String,
    project_dir: PathBuf,
    pub control_dict: ControlDict,
    pub fv_schemes: Option<FvSchemes>,
    pub fv_solution: Option<FvSolution>,
    pub turbulence_properties: Option<TurbulenceProperties>,
    pub decompose_par_dict: Option<DecomposeParDict>,
    pub probes: Option<Probes>,
    pub abl_conditions: Option<FoamFile>,
    pub initial_conditions: Option<FoamFile>,
    pub geometries: Vec<Box<dyn Geometry>>,
    pub mesh: MeshMetadata,
    // Field and constant documents keyed by object name.
    documents: IndexMap<String, FoamFile>,
}

impl Case {
    /// An empty case rooted at `<parent_dir>/<name>`. Nothing touches the disk.
    pub fn new(name: impl Into<String>, parent_dir: impl AsRef<Path>) -> Self {
        let name = name.into();
        let project_dir = parent_dir.as_ref().join(&name);
        Case {
            name,
            project_dir,
            control_dict: ControlDict::default(),
            fv_schemes: None,
            fv_solution: None,
            turbulence_properties: None,
            decompose_par_dict: None,
            probes: None,
            abl_conditions: None,
            initial_conditions: None,
            geometries: Vec::new(),
            mesh: MeshMetadata::default(),
            documents: IndexMap::new(),
        }
    }

    /// Rebuilds a case from the documents found under `project_dir`.
    ///
    /// Missing documents stay unset. A document that exists but does not
    /// parse is an error, except in the zero folder, where it is skipped.
    pub fn load(project_dir: impl AsRef<Path>) -> Result<Self> {
        let project_dir = project_dir.as_ref();
        if !project_dir.is_dir() {
            return Err(FoamError::validation(
                "project_dir",
                format!("{} is not a directory", project_dir.display()),
            ));
        }
        let name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = project_dir.parent().unwrap_or_else(|| Path::new(""));
        let mut case = Case::new(name, parent);
        case.project_dir = project_dir.to_path_buf();

        let system = case.system_folder();
        let constant = case.constant_folder();

        if let Some(path) = existing(system.join("controlDict")) {
            case.control_dict = ControlDict::from_file(&path)?;
        }
        case.fv_schemes = existing(system.join("fvSchemes"))
            .map(|p| FvSchemes::from_file(&p))
            .transpose()?;
        case.fv_solution = existing(system.join("fvSolution"))
            .map(|p| FvSolution::from_file(&p))
            .transpose()?;
        case.decompose_par_dict = existing(system.join("decomposeParDict"))
            .map(|p| DecomposeParDict::from_file(&p))
            .transpose()?;
        case.probes = existing(system.join("probes"))
            .map(|p| Probes::from_file(&p))
            .transpose()?;
        if let Some(path) = existing(system.join("snappyHexMeshDict")) {
            let snappy = FoamFile::from_file(&path)?;
            match snappy.effective_value("locationInMesh") {
                Some(location) => case.mesh.location_in_mesh = location.inline_text(),
                None => warn!(path = %path.display(), "snappyHexMeshDict has no locationInMesh"),
            }
        }

        case.turbulence_properties = existing(constant.join("turbulenceProperties"))
            .map(|p| TurbulenceProperties::from_file(&p))
            .transpose()?;
        for kind in [FieldKind::TransportProperties, FieldKind::G] {
            if let Some(path) = existing(constant.join(kind.name())) {
                case.set_field(kind.from_file(&path)?);
            }
        }

        for path in zero_folder_files(&case.zero_folder())? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let loaded = match file_name.as_str() {
                INITIAL_CONDITIONS | ABL_CONDITIONS => conditions::conditions_from_file(&path),
                other => match FieldKind::from_name(other) {
                    Some(kind) => kind.from_file(&path),
                    None => FoamFile::from_file(&path),
                },
            };
            let file = match loaded {
                Ok(file) => file,
                Err(err) if is_unreadable(&err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable zero-folder file");
                    continue;
                }
                Err(err) => return Err(err),
            };
            match file_name.as_str() {
                INITIAL_CONDITIONS => case.initial_conditions = Some(file),
                ABL_CONDITIONS => case.abl_conditions = Some(file),
                _ => {
                    case.set_field(file);
                }
            }
        }

        info!(case = %case.name, documents = case.documents.len(), "loaded case");
        Ok(case)
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn zero_folder(&self) -> PathBuf {
        self.project_dir.join(ZERO_FOLDER)
    }

    pub fn constant_folder(&self) -> PathBuf {
        self.project_dir.join(CONSTANT_FOLDER)
    }

    pub fn system_folder(&self) -> PathBuf {
        self.project_dir.join(SYSTEM_FOLDER)
    }

    /// Makes sure `0/`, `constant/` and `system/` exist.
    pub fn create_folders(&self) -> Result<()> {
        for folder in [self.zero_folder(), self.constant_folder(), self.system_folder()] {
            fs::create_dir_all(&folder).map_err(|e| FoamError::io(&folder, e))?;
        }
        debug!(project_dir = %self.project_dir.display(), "case folders ready");
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FoamFile> {
        self.documents.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FoamFile> {
        self.documents.get_mut(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// Attaches `file` under its object name, replacing any previous one.
    pub fn set_field(&mut self, file: FoamFile) -> Option<FoamFile> {
        self.documents.insert(file.name().to_string(), file)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FoamFile> {
        self.documents.shift_remove(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FoamFile> {
        self.documents.values()
    }

    pub fn add_geometry(&mut self, geometry: impl Geometry + 'static) {
        self.geometries.push(Box::new(geometry));
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geometries: Vec<&str> = self.geometries.iter().map(|g| g.name()).collect();
        f.debug_struct("Case")
            .field("name", &self.name)
            .field("project_dir", &self.project_dir)
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .field("geometries", &geometries)
            .field("mesh", &self.mesh)
            .finish()
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.project_dir.display())
    }
}

// Text that is not a dictionary, or not text at all.
fn is_unreadable(err: &FoamError) -> bool {
    match err {
        FoamError::Parse { .. } => true,
        FoamError::Io { source, .. } => source.kind() == io::ErrorKind::InvalidData,
        _ => false,
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

/// Regular files of the zero folder, sorted by name. A missing folder is empty.
fn zero_folder_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(folder).map_err(|e| FoamError::io(folder, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| FoamError::io(folder, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BFGeometry, BoundaryConditionSet};
    use crate::types::foam_value::FoamDict;
    use tempfile::tempdir;

    #[test]
    fn new_case_lives_under_parent() {
        let case = Case::new("room", "/tmp/cases");
        assert_eq!(case.project_dir(), Path::new("/tmp/cases/room"));
        assert_eq!(case.zero_folder(), Path::new("/tmp/cases/room/0"));
        assert_eq!(case.control_dict.application(), Some("simpleFoam"));
        assert!(!case.has_field("U"));
    }

    #[test]
    fn create_folders_is_idempotent() {
        let dir = tempdir().unwrap();
        let case = Case::new("room", dir.path());
        case.create_folders().unwrap();
        case.create_folders().unwrap();
        assert!(case.system_folder().is_dir());
        assert!(case.constant_folder().is_dir());
    }

    #[test]
    fn load_picks_up_fields_and_mesh_location() {
        let dir = tempdir().unwrap();
        let mut case = Case::new("room", dir.path());
        case.add_geometry(BFGeometry::new("walls", BoundaryConditionSet::wall()));
        let k = FieldKind::K.from_geometries(&case.geometries);
        k.save(case.project_dir(), false).unwrap();
        conditions::initial_conditions().save(case.project_dir(), false).unwrap();
        let snappy = FoamFile::without_defaults(
            "snappyHexMeshDict",
            "dictionary",
            "system",
            crate::types::foam_value::dict([(
                "locationInMesh",
                crate::types::foam_value::FoamValue::vector([0.0, 0.0, 1.0]),
            )]),
        );
        snappy.save(case.project_dir(), false).unwrap();
        fs::create_dir_all(case.zero_folder().join("polyMesh")).unwrap();

        let loaded = Case::load(case.project_dir()).unwrap();
        assert_eq!(loaded.name, "room");
        assert_eq!(loaded.field("k"), Some(&k));
        assert!(loaded.initial_conditions.is_some());
        assert!(loaded.abl_conditions.is_none());
        assert_eq!(loaded.mesh.location_in_mesh, "(0 0 1)");
        assert_eq!(loaded.fields().count(), 1);
    }

    #[test]
    fn unknown_zero_folder_files_are_kept_generically() {
        let dir = tempdir().unwrap();
        let case = Case::new("room", dir.path());
        FoamFile::without_defaults("omega", "volScalarField", "0", FoamDict::new())
            .save(case.project_dir(), false)
            .unwrap();
        let loaded = Case::load(case.project_dir()).unwrap();
        assert_eq!(loaded.field("omega").map(|f| f.class()), Some("volScalarField"));
    }

    #[test]
    fn stray_zero_folder_files_are_skipped() {
        let dir = tempdir().unwrap();
        let case = Case::new("room", dir.path());
        case.create_folders().unwrap();
        fs::write(case.zero_folder().join("README"), "notes").unwrap();
        fs::write(case.zero_folder().join("U.gz"), [0x1f, 0x8b, 0xff, 0xfe]).unwrap();
        FieldKind::P.new_file(FoamDict::new()).save(case.project_dir(), false).unwrap();

        let loaded = Case::load(case.project_dir()).unwrap();
        assert!(loaded.has_field("p"));
        assert!(!loaded.has_field("README"));
        assert_eq!(loaded.fields().count(), 1);
    }

    #[test]
    fn broken_system_documents_still_fail() {
        let dir = tempdir().unwrap();
        let case = Case::new("room", dir.path());
        case.create_folders().unwrap();
        fs::write(case.system_folder().join("fvSchemes"), "notes").unwrap();
        assert!(matches!(Case::load(case.project_dir()), Err(FoamError::Parse { .. })));
    }

    #[test]
    fn load_of_missing_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(Case::load(dir.path().join("nope")).is_err());
    }
}
