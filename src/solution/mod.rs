//! Documents governing solver numerics and physics models.
//!
//! Each role (scheme control, solution control, turbulence model) is its own
//! type; a generic [`FoamFile`] only becomes one through `TryFrom`, which
//! checks the object name and class.

pub mod fv_schemes;
pub mod fv_solution;
pub mod turbulence;

use std::fmt;

use crate::error::{FoamError, Result};
use crate::foamfile::FoamFile;

pub use fv_schemes::FvSchemes;
pub use fv_solution::{
    apply_relaxation_factors, apply_residual_control, set_reference_point, FvSolution,
    RelaxationFactors, ResidualControl, GLOBAL_CONVERGENCE,
};
pub use turbulence::TurbulenceProperties;

/// The closed set of document roles a recipe can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRole {
    TurbulenceModel,
    SolutionControl,
    SchemeControl,
}

impl DocumentRole {
    pub fn object_name(self) -> &'static str {
        match self {
            DocumentRole::TurbulenceModel => "turbulenceProperties",
            DocumentRole::SolutionControl => "fvSolution",
            DocumentRole::SchemeControl => "fvSchemes",
        }
    }

    pub fn location(self) -> &'static str {
        match self {
            DocumentRole::TurbulenceModel => "constant",
            DocumentRole::SolutionControl | DocumentRole::SchemeControl => "system",
        }
    }

    pub fn of(file: &FoamFile) -> Option<Self> {
        [
            DocumentRole::TurbulenceModel,
            DocumentRole::SolutionControl,
            DocumentRole::SchemeControl,
        ]
        .into_iter()
        .find(|role| role.object_name() == file.name() && file.class() == "dictionary")
    }

    /// Rejects `file` unless it plays this role.
    pub(crate) fn check(self, file: &FoamFile) -> Result<()> {
        match DocumentRole::of(file) {
            Some(role) if role == self => Ok(()),
            _ => Err(FoamError::validation(
                self.object_name(),
                format!(
                    "expected a {} document, got '{}' of class {}",
                    self,
                    file.name(),
                    file.class()
                ),
            )),
        }
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentRole::TurbulenceModel => "turbulence model",
            DocumentRole::SolutionControl => "solution control",
            DocumentRole::SchemeControl => "scheme control",
        };
        f.write_str(label)
    }
}

/// Which preset numerics a solution or scheme document starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeTemplate {
    #[default]
    SteadyIncompressible,
    HeatTransfer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldKind;
    use crate::types::foam_value::FoamDict;

    #[test]
    fn role_detection_uses_name_and_class() {
        let solution = FvSolution::from_template(RecipeTemplate::SteadyIncompressible);
        assert_eq!(
            DocumentRole::of(solution.foam_file()),
            Some(DocumentRole::SolutionControl)
        );
        let k = FieldKind::K.new_file(FoamDict::new());
        assert_eq!(DocumentRole::of(&k), None);
    }

    #[test]
    fn wrong_document_is_a_validation_error() {
        let k = FieldKind::K.new_file(FoamDict::new());
        let err = TurbulenceProperties::try_from(k).unwrap_err();
        match err {
            FoamError::Validation { what, reason } => {
                assert_eq!(what, "turbulenceProperties");
                assert!(reason.contains("'k'"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let schemes = FvSchemes::from_template(RecipeTemplate::SteadyIncompressible);
        assert!(FvSolution::try_from(schemes.into_foam_file()).is_err());
    }
}
