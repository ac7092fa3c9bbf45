//! Ready-made solver recipes.

use std::fmt;

use serde::Deserialize;

use super::{CaseRecipe, PrepareOptions, PrepareReport, Recipe, SingleCommandRecipe};
use crate::case::Case;
use crate::error::Result;
use crate::parsing::parse_foam_value;
use crate::solution::{
    set_reference_point, FvSchemes, FvSolution, RecipeTemplate, RelaxationFactors,
    ResidualControl, TurbulenceProperties,
};

/// Caller choices layered over a preset's defaults.
#[derive(Debug, Clone, Default)]
pub struct RecipeOverrides {
    pub turbulence_properties: Option<TurbulenceProperties>,
    pub fv_solution: Option<FvSolution>,
    pub fv_schemes: Option<FvSchemes>,
    pub residual_control: Option<ResidualControl>,
    pub relaxation_factors: Option<RelaxationFactors>,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn preset(
    name: &str,
    application: &str,
    quantities: &[&str],
    residual_fields: &[&str],
    template: RecipeTemplate,
    overrides: RecipeOverrides,
) -> SingleCommandRecipe {
    let recipe = Recipe::unchecked(name.to_string(), vec![application.to_string()])
        .with_turbulence_properties(overrides.turbulence_properties.unwrap_or_default())
        .with_fv_solution(
            overrides
                .fv_solution
                .unwrap_or_else(|| FvSolution::from_template(template)),
        )
        .with_fv_schemes(
            overrides
                .fv_schemes
                .unwrap_or_else(|| FvSchemes::from_template(template)),
        )
        .with_quantities(quantities.iter().copied())
        .with_residual_control(overrides.residual_control.unwrap_or_default())
        .with_relaxation_factors(overrides.relaxation_factors.unwrap_or_default());
    SingleCommandRecipe::from_parts(recipe, to_strings(residual_fields))
}

/// `simpleFoam` on an incompressible steady flow.
#[derive(Debug, Clone, PartialEq)]
pub struct SteadyIncompressible(SingleCommandRecipe);

impl SteadyIncompressible {
    pub const APPLICATION: &'static str = "simpleFoam";
    pub const QUANTITIES: [&'static str; 5] = ["epsilon", "k", "nut", "U", "p"];
    pub const RESIDUAL_FIELDS: [&'static str; 6] = ["Ux", "Uy", "Uz", "p", "k", "epsilon"];

    pub fn new() -> Self {
        Self::with_overrides(RecipeOverrides::default())
    }

    pub fn with_overrides(overrides: RecipeOverrides) -> Self {
        SteadyIncompressible(preset(
            "SteadyIncompressible",
            Self::APPLICATION,
            &Self::QUANTITIES,
            &Self::RESIDUAL_FIELDS,
            RecipeTemplate::SteadyIncompressible,
            overrides,
        ))
    }

    pub fn single_command(&self) -> &SingleCommandRecipe {
        &self.0
    }

    pub fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
        self.0.prepare_case(case, options)
    }
}

impl Default for SteadyIncompressible {
    fn default() -> Self {
        Self::new()
    }
}

/// `buoyantBoussinesqSimpleFoam` with temperature transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatTransfer(SingleCommandRecipe);

impl HeatTransfer {
    pub const APPLICATION: &'static str = "buoyantBoussinesqSimpleFoam";
    pub const QUANTITIES: [&'static str; 7] = ["alphat", "epsilon", "k", "nut", "p_rgh", "T", "U"];
    pub const RESIDUAL_FIELDS: [&'static str; 7] = ["Ux", "Uy", "Uz", "p_rgh", "T", "k", "epsilon"];

    pub fn new() -> Self {
        Self::with_overrides(RecipeOverrides::default())
    }

    pub fn with_overrides(overrides: RecipeOverrides) -> Self {
        HeatTransfer(preset(
            "HeatTransfer",
            Self::APPLICATION,
            &Self::QUANTITIES,
            &Self::RESIDUAL_FIELDS,
            RecipeTemplate::HeatTransfer,
            overrides,
        ))
    }

    pub fn single_command(&self) -> &SingleCommandRecipe {
        &self.0
    }

    /// Also pins the pressure reference to the mesh's `locationInMesh`.
    pub fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
        self.0.prepare_with(case, options, |solution, case| {
            let point = case.mesh.location_in_mesh.replace(',', " ");
            set_reference_point(solution, parse_foam_value("locationInMesh", &point)?);
            Ok(())
        })
    }
}

impl Default for HeatTransfer {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! single_command_preset {
    ($preset:ty) => {
        impl CaseRecipe for $preset {
            fn recipe(&self) -> &Recipe {
                self.0.recipe()
            }

            fn application(&self) -> Option<&str> {
                Some(self.0.application())
            }

            fn residual_fields(&self) -> &[String] {
                self.0.residual_fields()
            }

            fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
                <$preset>::prepare_case(self, case, options)
            }
        }

        impl fmt::Display for $preset {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

single_command_preset!(SteadyIncompressible);
single_command_preset!(HeatTransfer);

/// Preset selector used by case descriptions.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecipeKind {
    #[default]
    SteadyIncompressible,
    HeatTransfer,
}

impl RecipeKind {
    pub const ALL: [RecipeKind; 2] = [RecipeKind::SteadyIncompressible, RecipeKind::HeatTransfer];

    pub fn name(self) -> &'static str {
        match self {
            RecipeKind::SteadyIncompressible => "steady_incompressible",
            RecipeKind::HeatTransfer => "heat_transfer",
        }
    }

    pub fn build(self, overrides: RecipeOverrides) -> Box<dyn CaseRecipe> {
        match self {
            RecipeKind::SteadyIncompressible => Box::new(SteadyIncompressible::with_overrides(overrides)),
            RecipeKind::HeatTransfer => Box::new(HeatTransfer::with_overrides(overrides)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::GLOBAL_CONVERGENCE;
    use crate::types::foam_value::FoamValue;
    use tempfile::tempdir;

    #[test]
    fn presets_carry_their_solver_setup() {
        let steady = SteadyIncompressible::new();
        let recipe = CaseRecipe::recipe(&steady);
        assert_eq!(recipe.commands(), ["simpleFoam"]);
        assert_eq!(recipe.quantities(), SteadyIncompressible::QUANTITIES);
        assert_eq!(steady.single_command().log_file(), "simpleFoam.log");
        assert_eq!(recipe.turbulence_properties(), &TurbulenceProperties::ras("kEpsilon"));
        assert_eq!(
            recipe.fv_schemes(),
            Some(&FvSchemes::from_template(RecipeTemplate::SteadyIncompressible))
        );

        let heat = HeatTransfer::new();
        assert_eq!(heat.application(), Some("buoyantBoussinesqSimpleFoam"));
        assert_eq!(heat.residual_fields().len(), 7);
        assert_eq!(heat.single_command().err_file(), "buoyantBoussinesqSimpleFoam.err");
    }

    #[test]
    fn overrides_replace_defaults() {
        let steady = SteadyIncompressible::with_overrides(RecipeOverrides {
            turbulence_properties: Some(TurbulenceProperties::laminar()),
            residual_control: Some(ResidualControl::new([("p", 1e-6)]).unwrap()),
            ..RecipeOverrides::default()
        });
        let recipe = CaseRecipe::recipe(&steady);
        assert_eq!(recipe.turbulence_properties().simulation_type(), Some("laminar"));
        let residuals = recipe.residual_control();
        assert_eq!(residuals.get("p"), Some(1e-6));
        assert_eq!(residuals.get("nut"), Some(GLOBAL_CONVERGENCE));
    }

    #[test]
    fn heat_transfer_pins_reference_point() {
        let dir = tempdir().unwrap();
        let mut case = Case::new("hot", dir.path());
        case.mesh.location_in_mesh = "(1,2,3)".to_string();
        HeatTransfer::new()
            .prepare_case(&mut case, PrepareOptions::default())
            .unwrap();

        let solution = case.fv_solution.as_ref().unwrap();
        let simple = solution.foam_file().effective_value("SIMPLE").unwrap().as_dict().unwrap();
        assert_eq!(simple["pRefPoint"], FoamValue::vector([1.0, 2.0, 3.0]));
        assert_eq!(case.control_dict.application(), Some(HeatTransfer::APPLICATION));
        // The recipe's own document is left untouched.
        let own = HeatTransfer::new();
        let own_simple = CaseRecipe::recipe(&own)
            .fv_solution()
            .and_then(|s| s.foam_file().effective_value("SIMPLE"))
            .and_then(|v| v.as_dict())
            .map(|d| d.contains_key("pRefPoint"));
        assert_eq!(own_simple, Some(false));
    }

    #[test]
    fn kinds_build_matching_presets() {
        let boxed = RecipeKind::HeatTransfer.build(RecipeOverrides::default());
        assert_eq!(boxed.recipe().name(), "HeatTransfer");
        assert_eq!(RecipeKind::default().name(), "steady_incompressible");
    }
}
