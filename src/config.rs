use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::case::Case;
use crate::conditions;
use crate::control::{DecomposeParDict, Probes};
use crate::error::{FoamError, Result};
use crate::geometry::{BFGeometry, BoundaryConditionSet};
use crate::recipe::{CaseRecipe, PrepareOptions, RecipeKind, RecipeOverrides};
use crate::solution::{RelaxationFactors, ResidualControl, TurbulenceProperties};

/// A case description: where the case lives, which recipe prepares it, and
/// what goes into it.
#[derive(Deserialize, Debug, Clone)]
pub struct CaseConfig {
    pub project_dir: String,
    pub case_name: String,
    #[serde(default)]
    pub recipe: RecipeKind,
    pub location_in_mesh: Option<String>,
    pub decompose_subdomains: Option<u32>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub remove: bool,
    #[serde(default)]
    pub initial_conditions: bool,
    #[serde(default)]
    pub abl_conditions: bool,
    pub turbulence: Option<TurbulenceConfig>,
    #[serde(default)]
    pub residual_control: IndexMap<String, f64>,
    #[serde(default)]
    pub relaxation_factors: IndexMap<String, f64>,
    pub probes: Option<ProbesConfig>,
    #[serde(default)]
    pub geometries: Vec<GeometryConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TurbulenceConfig {
    pub simulation_type: String,
    pub model: Option<String>,
    /// LES filter width method.
    pub delta: Option<String>,
}

impl TurbulenceConfig {
    pub fn to_properties(&self) -> Result<TurbulenceProperties> {
        match self.simulation_type.to_lowercase().as_str() {
            "laminar" => Ok(TurbulenceProperties::laminar()),
            "ras" => Ok(TurbulenceProperties::ras(self.model.as_deref().unwrap_or("kEpsilon"))),
            "les" => Ok(TurbulenceProperties::les(
                self.model.as_deref().unwrap_or("Smagorinsky"),
                self.delta.as_deref().unwrap_or("cubeRootVol"),
            )),
            other => Err(FoamError::validation(
                "turbulence.simulation_type",
                format!("unknown simulation type '{}', expected laminar, RAS or LES", other),
            )),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProbesConfig {
    pub fields: Vec<String>,
    pub locations: Vec<[f64; 3]>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Wall,
    Inlet,
    Outlet,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GeometryConfig {
    pub name: String,
    pub kind: GeometryKind,
    pub velocity: Option<[f64; 3]>,
}

impl GeometryConfig {
    pub fn to_geometry(&self) -> Result<BFGeometry> {
        let boundary = match self.kind {
            GeometryKind::Wall => BoundaryConditionSet::wall(),
            GeometryKind::Outlet => BoundaryConditionSet::outlet(),
            GeometryKind::Inlet => {
                let velocity = self.velocity.ok_or_else(|| {
                    FoamError::validation(
                        format!("geometries.{}", self.name),
                        "an inlet needs a velocity",
                    )
                })?;
                BoundaryConditionSet::inlet(velocity)
            }
        };
        Ok(BFGeometry::new(self.name.clone(), boundary))
    }
}

impl CaseConfig {
    pub fn from_toml_str(source_name: &str, contents: &str) -> Result<Self> {
        toml::from_str::<CaseConfig>(contents).map_err(|e| FoamError::Config {
            path: PathBuf::from(source_name),
            message: format!("failed to parse: {}", e),
        })
    }

    pub fn case_dir(&self) -> PathBuf {
        PathBuf::from(&self.project_dir).join(&self.case_name)
    }

    pub fn prepare_options(&self) -> PrepareOptions {
        PrepareOptions {
            overwrite: self.overwrite,
            remove: self.remove,
        }
    }

    pub fn recipe_overrides(&self) -> Result<RecipeOverrides> {
        let turbulence_properties = self
            .turbulence
            .as_ref()
            .map(TurbulenceConfig::to_properties)
            .transpose()?;
        let residual_control = if self.residual_control.is_empty() {
            None
        } else {
            Some(ResidualControl::new(self.residual_control.clone())?)
        };
        let relaxation_factors = if self.relaxation_factors.is_empty() {
            None
        } else {
            Some(RelaxationFactors::new(self.relaxation_factors.clone())?)
        };
        Ok(RecipeOverrides {
            turbulence_properties,
            residual_control,
            relaxation_factors,
            ..RecipeOverrides::default()
        })
    }

    pub fn build_recipe(&self) -> Result<Box<dyn CaseRecipe>> {
        Ok(self.recipe.build(self.recipe_overrides()?))
    }

    /// Loads the case if its directory already exists, otherwise starts an
    /// empty one, then applies the described extras and creates the folders.
    pub fn build_case(&self) -> Result<Case> {
        let case_dir = self.case_dir();
        let mut case = if case_dir.is_dir() {
            debug!(path = %case_dir.display(), "loading existing case");
            Case::load(&case_dir)?
        } else {
            Case::new(self.case_name.clone(), &self.project_dir)
        };

        if let Some(location) = &self.location_in_mesh {
            case.mesh.location_in_mesh = location.clone();
        }
        if let Some(subdomains) = self.decompose_subdomains {
            case.decompose_par_dict = Some(DecomposeParDict::new(subdomains));
        }
        if let Some(probes) = &self.probes {
            case.probes = Some(Probes::new(probes.fields.as_slice(), probes.locations.as_slice()));
        }
        if self.initial_conditions && case.initial_conditions.is_none() {
            case.initial_conditions = Some(conditions::initial_conditions());
        }
        if self.abl_conditions && case.abl_conditions.is_none() {
            case.abl_conditions = Some(conditions::abl_conditions());
        }
        for geometry in &self.geometries {
            case.add_geometry(geometry.to_geometry()?);
        }
        case.create_folders()?;
        Ok(case)
    }
}

pub fn load_config_from_file(file_path: &str) -> Result<CaseConfig> {
    let contents = fs::read_to_string(file_path).map_err(|e| FoamError::Config {
        path: PathBuf::from(file_path),
        message: format!("failed to read: {}. Please ensure it exists.", e),
    })?;
    let loaded_config = CaseConfig::from_toml_str(file_path, &contents)?;
    let path = PathBuf::from(&loaded_config.project_dir);
    if path.is_dir() {
        Ok(loaded_config)
    } else {
        Err(FoamError::Config {
            path: PathBuf::from(file_path),
            message: format!(
                "project_dir ('{}') is not a valid directory",
                loaded_config.project_dir
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ROOM: &str = r#"
project_dir = "/tmp"
case_name = "room"
recipe = "heat_transfer"
location_in_mesh = "(0, 0, 1)"
decompose_subdomains = 4

[turbulence]
simulation_type = "RAS"
model = "realizableKE"

[residual_control]
p_rgh = 1e-5

[relaxation_factors]
U = 0.5

[probes]
fields = ["p_rgh", "T"]
locations = [[0.0, 0.0, 1.0]]

[[geometries]]
name = "inlet"
kind = "inlet"
velocity = [0.0, 0.0, 1.0]

[[geometries]]
name = "walls"
kind = "wall"
"#;

    #[test]
    fn parses_a_full_description() {
        let config = CaseConfig::from_toml_str("room.toml", ROOM).unwrap();
        assert_eq!(config.recipe, RecipeKind::HeatTransfer);
        assert_eq!(config.geometries.len(), 2);
        assert_eq!(config.geometries[1].kind, GeometryKind::Wall);
        assert!(!config.overwrite);

        let recipe = config.build_recipe().unwrap();
        assert_eq!(recipe.application(), Some("buoyantBoussinesqSimpleFoam"));
        let residuals = recipe.recipe().residual_control();
        assert_eq!(residuals.get("p_rgh"), Some(1e-5));
        assert_eq!(recipe.recipe().relaxation_factors().get("U"), Some(0.5));
        assert_eq!(
            recipe.recipe().turbulence_properties(),
            &TurbulenceProperties::ras("realizableKE")
        );
    }

    #[test]
    fn recipe_defaults_to_steady() {
        let config = CaseConfig::from_toml_str("min.toml", "project_dir = \".\"\ncase_name = \"c\"\n").unwrap();
        assert_eq!(config.recipe, RecipeKind::SteadyIncompressible);
        assert!(config.recipe_overrides().unwrap().turbulence_properties.is_none());
    }

    #[test]
    fn bad_values_are_rejected() {
        let toml_text = "project_dir = \".\"\ncase_name = \"c\"\n[relaxation_factors]\nU = 2.0\n";
        let config = CaseConfig::from_toml_str("bad.toml", toml_text).unwrap();
        assert!(matches!(config.build_recipe(), Err(FoamError::Validation { .. })));

        let inlet = GeometryConfig {
            name: "in".to_string(),
            kind: GeometryKind::Inlet,
            velocity: None,
        };
        assert!(inlet.to_geometry().is_err());

        assert!(matches!(
            CaseConfig::from_toml_str("broken.toml", "case_name = 3"),
            Err(FoamError::Config { .. })
        ));
    }

    #[test]
    fn load_checks_project_dir() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.toml");
        fs::write(
            &good,
            format!("project_dir = {:?}\ncase_name = \"room\"\n", dir.path().display().to_string()),
        )
        .unwrap();
        let config = load_config_from_file(good.to_str().unwrap()).unwrap();
        assert_eq!(config.case_dir(), dir.path().join("room"));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "project_dir = \"/definitely/not/here\"\ncase_name = \"room\"\n").unwrap();
        assert!(matches!(
            load_config_from_file(bad.to_str().unwrap()),
            Err(FoamError::Config { .. })
        ));
        assert!(load_config_from_file("missing.toml").is_err());
    }

    #[test]
    fn build_case_applies_extras() {
        let dir = tempdir().unwrap();
        let text = format!(
            "project_dir = {:?}\ncase_name = \"room\"\nlocation_in_mesh = \"(1, 2, 3)\"\ninitial_conditions = true\ndecompose_subdomains = 2\n[[geometries]]\nname = \"walls\"\nkind = \"wall\"\n",
            dir.path().display().to_string()
        );
        let config = CaseConfig::from_toml_str("room.toml", &text).unwrap();
        let case = config.build_case().unwrap();
        assert!(case.zero_folder().is_dir());
        assert_eq!(case.mesh.location_in_mesh, "(1, 2, 3)");
        assert_eq!(case.geometries.len(), 1);
        assert!(case.initial_conditions.is_some());
        assert_eq!(case.decompose_par_dict.as_ref().and_then(|d| d.subdomains()), Some(2));
    }
}
