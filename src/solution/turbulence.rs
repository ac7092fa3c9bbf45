use std::path::Path;
use std::sync::{Arc, OnceLock};

use super::DocumentRole;
use crate::error::{FoamError, Result};
use crate::foamfile::{FoamFile, SaveOutcome};
use crate::types::foam_value::{dict, FoamDict, FoamValue};

/// `constant/turbulenceProperties`.
#[derive(Debug, Clone, PartialEq)]
pub struct TurbulenceProperties(FoamFile);

impl TurbulenceProperties {
    fn with_values(values: FoamDict) -> Self {
        let role = DocumentRole::TurbulenceModel;
        TurbulenceProperties(FoamFile::new(
            role.object_name(),
            "dictionary",
            role.location(),
            defaults(),
            values,
        ))
    }

    pub fn laminar() -> Self {
        Self::with_values(dict([("simulationType", FoamValue::token("laminar"))]))
    }

    /// Reynolds-averaged model, e.g. `kEpsilon` or `realizableKE`.
    pub fn ras(model: &str) -> Self {
        Self::with_values(dict([
            ("simulationType", FoamValue::token("RAS")),
            (
                "RAS",
                FoamValue::Dict(dict([
                    ("RASModel", FoamValue::token(model)),
                    ("turbulence", FoamValue::token("on")),
                    ("printCoeffs", FoamValue::token("on")),
                ])),
            ),
        ]))
    }

    /// Large-eddy model with the given filter width (`delta`) method.
    pub fn les(model: &str, delta: &str) -> Self {
        let coeffs = format!("{}Coeffs", delta);
        Self::with_values(dict([
            ("simulationType", FoamValue::token("LES")),
            (
                "LES",
                FoamValue::Dict(dict([
                    ("LESModel", FoamValue::token(model)),
                    ("turbulence", FoamValue::token("on")),
                    ("printCoeffs", FoamValue::token("on")),
                    ("delta", FoamValue::token(delta)),
                    (
                        coeffs.as_str(),
                        FoamValue::Dict(dict([("deltaCoeff", FoamValue::token("1"))])),
                    ),
                ])),
            ),
        ]))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        FoamFile::from_file_as(path, "dictionary", defaults()).and_then(Self::try_from)
    }

    pub fn simulation_type(&self) -> Option<&str> {
        self.0.effective_value("simulationType").and_then(|v| v.as_token())
    }

    pub fn foam_file(&self) -> &FoamFile {
        &self.0
    }

    pub fn into_foam_file(self) -> FoamFile {
        self.0
    }

    pub fn save(&self, project_dir: &Path, overwrite: bool) -> Result<SaveOutcome> {
        self.0.save(project_dir, overwrite)
    }
}

impl Default for TurbulenceProperties {
    fn default() -> Self {
        TurbulenceProperties::ras("kEpsilon")
    }
}

impl TryFrom<FoamFile> for TurbulenceProperties {
    type Error = FoamError;

    fn try_from(file: FoamFile) -> Result<Self> {
        DocumentRole::TurbulenceModel.check(&file)?;
        Ok(TurbulenceProperties(file))
    }
}

fn defaults() -> Arc<FoamDict> {
    static TEMPLATE: OnceLock<Arc<FoamDict>> = OnceLock::new();
    TEMPLATE
        .get_or_init(|| Arc::new(dict([("simulationType", FoamValue::token("laminar"))])))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_k_epsilon() {
        let tp = TurbulenceProperties::default();
        assert_eq!(tp.simulation_type(), Some("RAS"));
        let ras = tp.foam_file().effective_value("RAS").unwrap().as_dict().unwrap();
        assert_eq!(ras["RASModel"], FoamValue::token("kEpsilon"));
        assert_eq!(tp, TurbulenceProperties::ras("kEpsilon"));
        assert_ne!(tp, TurbulenceProperties::laminar());
    }

    #[test]
    fn les_carries_delta_coefficients() {
        let tp = TurbulenceProperties::les("dynamicKEqn", "cubeRootVol");
        let les = tp.foam_file().effective_value("LES").unwrap().as_dict().unwrap();
        assert!(les.contains_key("cubeRootVolCoeffs"));
        assert_eq!(tp.foam_file().location(), "constant");
    }
}
