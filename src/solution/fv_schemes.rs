use std::path::Path;
use std::sync::{Arc, OnceLock};

use super::{DocumentRole, RecipeTemplate};
use crate::error::{FoamError, Result};
use crate::foamfile::{FoamFile, SaveOutcome};
use crate::types::foam_value::{dict, FoamDict, FoamValue};

#[derive(Debug, Clone, PartialEq)]
pub struct FvSchemes(FoamFile);

impl FvSchemes {
    pub fn from_template(template: RecipeTemplate) -> Self {
        Self::with_values(template, FoamDict::new())
    }

    pub fn with_values(template: RecipeTemplate, values: FoamDict) -> Self {
        let role = DocumentRole::SchemeControl;
        FvSchemes(FoamFile::new(
            role.object_name(),
            "dictionary",
            role.location(),
            defaults(template),
            values,
        ))
    }

    /// Reads the document as written; no template is layered under it.
    pub fn from_file(path: &Path) -> Result<Self> {
        FoamFile::from_file_as(path, "dictionary", Arc::new(FoamDict::new())).and_then(Self::try_from)
    }

    pub fn foam_file(&self) -> &FoamFile {
        &self.0
    }

    pub fn foam_file_mut(&mut self) -> &mut FoamFile {
        &mut self.0
    }

    pub fn into_foam_file(self) -> FoamFile {
        self.0
    }

    pub fn save(&self, project_dir: &Path, overwrite: bool) -> Result<SaveOutcome> {
        self.0.save(project_dir, overwrite)
    }
}

impl TryFrom<FoamFile> for FvSchemes {
    type Error = FoamError;

    fn try_from(file: FoamFile) -> Result<Self> {
        DocumentRole::SchemeControl.check(&file)?;
        Ok(FvSchemes(file))
    }
}

fn defaults(template: RecipeTemplate) -> Arc<FoamDict> {
    static STEADY: OnceLock<Arc<FoamDict>> = OnceLock::new();
    static HEAT: OnceLock<Arc<FoamDict>> = OnceLock::new();
    match template {
        RecipeTemplate::SteadyIncompressible => STEADY.get_or_init(|| Arc::new(build(template))).clone(),
        RecipeTemplate::HeatTransfer => HEAT.get_or_init(|| Arc::new(build(template))).clone(),
    }
}

fn default_only(scheme: &str) -> FoamValue {
    FoamValue::Dict(dict([("default", FoamValue::token(scheme))]))
}

fn build(template: RecipeTemplate) -> FoamDict {
    let div = match template {
        RecipeTemplate::SteadyIncompressible => dict([
            ("default", FoamValue::token("none")),
            ("div(phi,U)", FoamValue::token("bounded Gauss linearUpwind grad(U)")),
            ("div(phi,k)", FoamValue::token("bounded Gauss upwind")),
            ("div(phi,epsilon)", FoamValue::token("bounded Gauss upwind")),
            ("div((nuEff*dev2(T(grad(U)))))", FoamValue::token("Gauss linear")),
        ]),
        RecipeTemplate::HeatTransfer => dict([
            ("default", FoamValue::token("none")),
            ("div(phi,U)", FoamValue::token("bounded Gauss upwind")),
            ("div(phi,T)", FoamValue::token("bounded Gauss upwind")),
            ("div(phi,k)", FoamValue::token("bounded Gauss upwind")),
            ("div(phi,epsilon)", FoamValue::token("bounded Gauss upwind")),
            ("div((nuEff*dev2(T(grad(U)))))", FoamValue::token("Gauss linear")),
        ]),
    };
    let mut schemes = dict([
        ("ddtSchemes", default_only("steadyState")),
        (
            "gradSchemes",
            FoamValue::Dict(dict([
                ("default", FoamValue::token("Gauss linear")),
                ("grad(U)", FoamValue::token("cellLimited Gauss linear 1")),
            ])),
        ),
        ("divSchemes", FoamValue::Dict(div)),
        ("laplacianSchemes", default_only("Gauss linear limited corrected 0.333")),
        ("interpolationSchemes", default_only("linear")),
        ("snGradSchemes", default_only("limited corrected 0.333")),
    ]);
    if template == RecipeTemplate::SteadyIncompressible {
        schemes.insert(
            "wallDist".to_string(),
            FoamValue::Dict(dict([("method", FoamValue::token("meshWave"))])),
        );
    }
    schemes
}
