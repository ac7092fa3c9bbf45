//! Recipes: what a solver run needs in a case, and the preparation pass
//! that writes it to disk.

pub mod presets;
pub mod single_command;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::case::Case;
use crate::conditions::is_conditions_file;
use crate::error::{FoamError, Result};
use crate::fields::FieldKind;
use crate::foamfile::{FoamFile, SaveOutcome};
use crate::solution::{
    apply_relaxation_factors, apply_residual_control, FvSchemes, FvSolution, RelaxationFactors,
    ResidualControl, TurbulenceProperties,
};

pub use presets::{HeatTransfer, RecipeKind, RecipeOverrides, SteadyIncompressible};
pub use single_command::SingleCommandRecipe;

/// Quantities used when a recipe is given none.
pub const DEFAULT_QUANTITIES: [&str; 4] = ["p", "U", "k", "epsilon"];

// Constant-folder documents every recipe needs besides its quantities.
const CONSTANT_DOCUMENTS: [&str; 2] = ["transportProperties", "g"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrepareOptions {
    /// Rewrite quantity and auxiliary documents that already exist.
    pub overwrite: bool,
    /// Delete zero-folder files the recipe does not need.
    pub remove: bool,
}

/// Files touched by one preparation pass, in the order they were handled.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct PrepareReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl PrepareReport {
    fn record(&mut self, path: PathBuf, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Written => self.written.push(path),
            SaveOutcome::Skipped => self.skipped.push(path),
        }
    }

    pub(crate) fn save(&mut self, file: &FoamFile, project_dir: &Path, overwrite: bool) -> Result<()> {
        let outcome = file.save(project_dir, overwrite)?;
        self.record(file.file_path(project_dir), outcome);
        Ok(())
    }
}

/// Common surface of every recipe, generic or preset.
pub trait CaseRecipe {
    fn recipe(&self) -> &Recipe;

    /// The solver this recipe runs, for single-command recipes.
    fn application(&self) -> Option<&str> {
        None
    }

    /// Residuals worth watching while the solver runs.
    fn residual_fields(&self) -> &[String] {
        &[]
    }

    fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    name: String,
    commands: Vec<String>,
    turbulence_properties: TurbulenceProperties,
    fv_solution: Option<FvSolution>,
    fv_schemes: Option<FvSchemes>,
    quantities: Vec<String>,
    residual_control: ResidualControl,
    relaxation_factors: RelaxationFactors,
}

impl Recipe {
    /// A recipe running `commands` in order. At least one non-blank command is required.
    pub fn new<I, S>(name: impl Into<String>, commands: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands: Vec<String> = commands.into_iter().map(Into::into).collect();
        if commands.is_empty() {
            return Err(FoamError::validation("commands", "a recipe needs at least one command"));
        }
        if let Some(position) = commands.iter().position(|c| c.trim().is_empty()) {
            return Err(FoamError::validation(
                "commands",
                format!("command {} is blank", position + 1),
            ));
        }
        Ok(Self::unchecked(name.into(), commands))
    }

    pub(crate) fn unchecked(name: String, commands: Vec<String>) -> Self {
        Recipe {
            name,
            commands,
            turbulence_properties: TurbulenceProperties::default(),
            fv_solution: None,
            fv_schemes: None,
            quantities: DEFAULT_QUANTITIES.iter().map(|q| q.to_string()).collect(),
            residual_control: ResidualControl::default(),
            relaxation_factors: RelaxationFactors::default(),
        }
    }

    pub fn with_turbulence_properties(mut self, turbulence_properties: TurbulenceProperties) -> Self {
        self.turbulence_properties = turbulence_properties;
        self
    }

    pub fn with_fv_solution(mut self, fv_solution: FvSolution) -> Self {
        self.fv_solution = Some(fv_solution);
        self
    }

    pub fn with_fv_schemes(mut self, fv_schemes: FvSchemes) -> Self {
        self.fv_schemes = Some(fv_schemes);
        self
    }

    /// Replaces the quantities. An empty list falls back to [`DEFAULT_QUANTITIES`].
    pub fn with_quantities<I, S>(mut self, quantities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let quantities: Vec<String> = quantities.into_iter().map(Into::into).collect();
        if quantities.is_empty() {
            debug!(recipe = %self.name, "no quantities given, using defaults");
            self.quantities = DEFAULT_QUANTITIES.iter().map(|q| q.to_string()).collect();
        } else {
            self.quantities = quantities;
        }
        self
    }

    pub fn with_residual_control(mut self, residual_control: ResidualControl) -> Self {
        self.residual_control = residual_control;
        self
    }

    pub fn with_relaxation_factors(mut self, relaxation_factors: RelaxationFactors) -> Self {
        self.relaxation_factors = relaxation_factors;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn turbulence_properties(&self) -> &TurbulenceProperties {
        &self.turbulence_properties
    }

    pub fn fv_solution(&self) -> Option<&FvSolution> {
        self.fv_solution.as_ref()
    }

    pub fn fv_schemes(&self) -> Option<&FvSchemes> {
        self.fv_schemes.as_ref()
    }

    pub fn quantities(&self) -> &[String] {
        &self.quantities
    }

    /// Residual targets with every quantity covered.
    pub fn residual_control(&self) -> ResidualControl {
        self.residual_control.clone().completed(&self.quantities)
    }

    pub fn relaxation_factors(&self) -> &RelaxationFactors {
        &self.relaxation_factors
    }

    /// A copy of the solution document with this recipe's residual targets
    /// and relaxation factors written into it.
    pub fn synchronized_solution(&self) -> Option<FvSolution> {
        let mut solution = self.fv_solution.clone()?;
        apply_residual_control(&mut solution, &self.residual_control());
        apply_relaxation_factors(&mut solution, &self.relaxation_factors);
        Some(solution)
    }

    /// Makes `case` ready for this recipe and persists what changed.
    ///
    /// Nothing is rolled back on failure: documents saved before the failing
    /// step stay on disk.
    pub fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
        self.prepare_case_with_solution(case, options, self.synchronized_solution(), PrepareReport::default())
    }

    pub(crate) fn prepare_case_with_solution(
        &self,
        case: &mut Case,
        options: PrepareOptions,
        solution: Option<FvSolution>,
        mut report: PrepareReport,
    ) -> Result<PrepareReport> {
        info!("preparing {} for {}", case, self);
        let project_dir = case.project_dir().to_path_buf();

        if let Some(schemes) = &self.fv_schemes {
            if case.fv_schemes.as_ref() != Some(schemes) {
                report.save(schemes.foam_file(), &project_dir, true)?;
                case.fv_schemes = Some(schemes.clone());
            }
        }
        if let Some(solution) = solution {
            if case.fv_solution.as_ref() != Some(&solution) {
                report.save(solution.foam_file(), &project_dir, true)?;
                case.fv_solution = Some(solution);
            }
        }
        if case.turbulence_properties.as_ref() != Some(&self.turbulence_properties) {
            report.save(self.turbulence_properties.foam_file(), &project_dir, true)?;
            case.turbulence_properties = Some(self.turbulence_properties.clone());
        }

        if let Some(decompose) = &case.decompose_par_dict {
            report.save(decompose.foam_file(), &project_dir, true)?;
        }
        if let Some(probes) = &case.probes {
            report.save(probes.foam_file(), &project_dir, true)?;
        }
        for auxiliary in [&case.abl_conditions, &case.initial_conditions].into_iter().flatten() {
            report.save(auxiliary, &project_dir, options.overwrite)?;
        }

        let mut handled: Vec<&str> = Vec::new();
        let required = self
            .quantities
            .iter()
            .map(String::as_str)
            .chain(CONSTANT_DOCUMENTS);
        for quantity in required {
            if handled.contains(&quantity) {
                continue;
            }
            handled.push(quantity);
            if !case.has_field(quantity) {
                let kind = FieldKind::from_name(quantity).ok_or_else(|| FoamError::MissingQuantity {
                    quantity: quantity.to_string(),
                    recipe: self.name.clone(),
                })?;
                debug!(quantity, geometries = case.geometries.len(), "synthesizing from geometries");
                let file = kind.from_geometries(&case.geometries);
                case.set_field(file);
            }
            if let Some(file) = case.field(quantity) {
                report.save(file, &project_dir, options.overwrite)?;
            }
        }

        if options.remove {
            self.remove_extra_files(case, &mut report)?;
        }
        Ok(report)
    }

    fn remove_extra_files(&self, case: &mut Case, report: &mut PrepareReport) -> Result<()> {
        let zero_folder = case.zero_folder();
        if !zero_folder.is_dir() {
            return Ok(());
        }
        let entries = fs::read_dir(&zero_folder).map_err(|e| FoamError::io(&zero_folder, e))?;
        let mut doomed = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| FoamError::io(&zero_folder, e))?.path();
            if !path.is_file() {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.quantities.contains(&name) || is_conditions_file(&name) {
                continue;
            }
            doomed.push((name, path));
        }
        doomed.sort();
        for (name, path) in doomed {
            fs::remove_file(&path).map_err(|e| FoamError::io(&path, e))?;
            info!(path = %path.display(), "removed");
            case.remove_field(&name);
            report.removed.push(path);
        }
        Ok(())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} recipe", self.name)
    }
}

impl CaseRecipe for Recipe {
    fn recipe(&self) -> &Recipe {
        self
    }

    fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
        Recipe::prepare_case(self, case, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::{RecipeTemplate, GLOBAL_CONVERGENCE};
    use tempfile::tempdir;

    #[test]
    fn commands_are_validated() {
        assert!(Recipe::new("empty", Vec::<String>::new()).is_err());
        assert!(matches!(
            Recipe::new("blank", ["blockMesh", "  "]),
            Err(FoamError::Validation { .. })
        ));
        let recipe = Recipe::new("mesh", ["blockMesh", "snappyHexMesh"]).unwrap();
        assert_eq!(recipe.commands().len(), 2);
        assert_eq!(recipe.quantities(), DEFAULT_QUANTITIES);
    }

    #[test]
    fn empty_quantities_fall_back_to_defaults() {
        let recipe = Recipe::new("r", ["simpleFoam"])
            .unwrap()
            .with_quantities(Vec::<String>::new());
        assert_eq!(recipe.quantities(), DEFAULT_QUANTITIES);
    }

    #[test]
    fn residual_control_covers_every_quantity() {
        let recipe = Recipe::new("r", ["simpleFoam"])
            .unwrap()
            .with_quantities(["p", "U", "T"])
            .with_residual_control(ResidualControl::new([("p", 1e-6)]).unwrap());
        let residuals = recipe.residual_control();
        assert_eq!(residuals.len(), 3);
        assert_eq!(residuals.get("p"), Some(1e-6));
        assert_eq!(residuals.get("T"), Some(GLOBAL_CONVERGENCE));
    }

    #[test]
    fn synchronized_solution_leaves_recipe_document_alone() {
        let template = FvSolution::from_template(RecipeTemplate::SteadyIncompressible);
        let recipe = Recipe::new("r", ["simpleFoam"])
            .unwrap()
            .with_fv_solution(template.clone())
            .with_relaxation_factors(RelaxationFactors::new([("U", 0.5)]).unwrap());
        let synced = recipe.synchronized_solution().unwrap();
        assert_eq!(recipe.fv_solution(), Some(&template));
        assert_ne!(synced, template);
        assert_eq!(synced.residual_control().map(|r| r.len()), Some(4));
    }

    #[test]
    fn unknown_quantity_is_reported() {
        let dir = tempdir().unwrap();
        let mut case = Case::new("room", dir.path());
        let recipe = Recipe::new("custom", ["pisoFoam"])
            .unwrap()
            .with_quantities(["p", "omega"]);
        let err = recipe.prepare_case(&mut case, PrepareOptions::default()).unwrap_err();
        match err {
            FoamError::MissingQuantity { quantity, recipe } => {
                assert_eq!(quantity, "omega");
                assert_eq!(recipe, "custom");
            }
            other => panic!("unexpected error {:?}", other),
        }
        // No rollback: the earlier quantity is already on disk.
        assert!(case.zero_folder().join("p").is_file());
    }
}
