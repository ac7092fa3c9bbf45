use std::path::Path;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::Serialize;

use super::{DocumentRole, RecipeTemplate};
use crate::error::{FoamError, Result};
use crate::foamfile::{FoamFile, SaveOutcome};
use crate::types::foam_value::{dict, FoamDict, FoamValue};

/// Residual target given to every quantity the caller did not set.
pub const GLOBAL_CONVERGENCE: f64 = 1e-4;

// Quantities relaxed as fields rather than as equations.
const FIELD_RELAXED: [&str; 2] = ["p", "p_rgh"];

const ALGORITHM_BLOCKS: [&str; 3] = ["SIMPLE", "PIMPLE", "PISO"];

fn checked_entries<I, K>(what: &str, values: I, valid: impl Fn(f64) -> bool) -> Result<IndexMap<String, f64>>
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    let mut entries = IndexMap::new();
    for (quantity, value) in values {
        let quantity = quantity.into();
        if !valid(value) {
            return Err(FoamError::validation(
                what,
                format!("{} has out-of-range value {}", quantity, value),
            ));
        }
        entries.insert(quantity, value);
    }
    Ok(entries)
}

/// Convergence threshold per quantity.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ResidualControl {
    values: IndexMap<String, f64>,
}

impl ResidualControl {
    pub fn new<I, K>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let values = checked_entries("residualControl", values, |v| v.is_finite() && v > 0.0)?;
        Ok(ResidualControl { values })
    }

    /// Fills every quantity without an entry with [`GLOBAL_CONVERGENCE`].
    pub fn completed<S: AsRef<str>>(mut self, quantities: &[S]) -> Self {
        for quantity in quantities {
            self.values
                .entry(quantity.as_ref().to_string())
                .or_insert(GLOBAL_CONVERGENCE);
        }
        self
    }

    pub fn get(&self, quantity: &str) -> Option<f64> {
        self.values.get(quantity).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn to_foam_dict(&self) -> FoamDict {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), FoamValue::number(*v)))
            .collect()
    }
}

/// Under-relaxation factor per quantity. Partial coverage is fine.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct RelaxationFactors {
    values: IndexMap<String, f64>,
}

impl RelaxationFactors {
    pub fn new<I, K>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let values = checked_entries("relaxationFactors", values, |v| v.is_finite() && v > 0.0 && v <= 1.0)?;
        Ok(RelaxationFactors { values })
    }

    pub fn get(&self, quantity: &str) -> Option<f64> {
        self.values.get(quantity).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `{ fields { p ..; } equations { U ..; } }`; empty sections are dropped.
    pub fn to_foam_dict(&self) -> FoamDict {
        let mut fields = FoamDict::new();
        let mut equations = FoamDict::new();
        for (quantity, factor) in &self.values {
            let target = if FIELD_RELAXED.contains(&quantity.as_str()) {
                &mut fields
            } else {
                &mut equations
            };
            target.insert(quantity.clone(), FoamValue::number(*factor));
        }
        let mut out = FoamDict::new();
        if !fields.is_empty() {
            out.insert("fields".to_string(), FoamValue::Dict(fields));
        }
        if !equations.is_empty() {
            out.insert("equations".to_string(), FoamValue::Dict(equations));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FvSolution(FoamFile);

impl FvSolution {
    pub fn from_template(template: RecipeTemplate) -> Self {
        Self::with_values(template, FoamDict::new())
    }

    pub fn with_values(template: RecipeTemplate, values: FoamDict) -> Self {
        let role = DocumentRole::SolutionControl;
        FvSolution(FoamFile::new(
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

    /// Name of the pressure-velocity algorithm block (`SIMPLE` unless the
    /// document already carries `PIMPLE` or `PISO`).
    pub fn algorithm_block(&self) -> &'static str {
        ALGORITHM_BLOCKS
            .into_iter()
            .find(|block| self.0.effective_value(block).is_some())
            .unwrap_or("SIMPLE")
    }

    /// Residual targets currently written in the algorithm block.
    pub fn residual_control(&self) -> Option<ResidualControl> {
        let block = self.0.effective_value(self.algorithm_block())?.as_dict()?;
        let residuals = block.get("residualControl")?.as_dict()?;
        let values = residuals
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
            .collect();
        Some(ResidualControl { values })
    }
}

impl TryFrom<FoamFile> for FvSolution {
    type Error = FoamError;

    fn try_from(file: FoamFile) -> Result<Self> {
        DocumentRole::SolutionControl.check(&file)?;
        Ok(FvSolution(file))
    }
}

/// Writes `residuals` into the algorithm block of `doc`.
pub fn apply_residual_control(doc: &mut FvSolution, residuals: &ResidualControl) {
    let block = doc.algorithm_block();
    doc.0.update_block(block, |b| {
        b.insert(
            "residualControl".to_string(),
            FoamValue::Dict(residuals.to_foam_dict()),
        );
    });
}

/// Merges `factors` into the document's `relaxationFactors` block; entries
/// already there for other quantities are kept. An empty set changes nothing.
pub fn apply_relaxation_factors(doc: &mut FvSolution, factors: &RelaxationFactors) {
    if factors.is_empty() {
        return;
    }
    doc.0.update_block("relaxationFactors", |b| {
        for (section, entries) in factors.to_foam_dict() {
            let Some(entries) = entries.as_dict() else { continue };
            let target = b
                .entry(section)
                .or_insert_with(|| FoamValue::Dict(FoamDict::new()));
            if target.as_dict().is_none() {
                *target = FoamValue::Dict(FoamDict::new());
            }
            if let Some(target) = target.as_dict_mut() {
                target.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
    });
}

/// Sets `pRefPoint` in the algorithm block.
pub fn set_reference_point(doc: &mut FvSolution, point: FoamValue) {
    let block = doc.algorithm_block();
    doc.0.update_block(block, |b| {
        b.insert("pRefPoint".to_string(), point);
    });
}

fn defaults(template: RecipeTemplate) -> Arc<FoamDict> {
    static STEADY: OnceLock<Arc<FoamDict>> = OnceLock::new();
    static HEAT: OnceLock<Arc<FoamDict>> = OnceLock::new();
    match template {
        RecipeTemplate::SteadyIncompressible => STEADY.get_or_init(|| Arc::new(steady_template())).clone(),
        RecipeTemplate::HeatTransfer => HEAT.get_or_init(|| Arc::new(heat_transfer_template())).clone(),
    }
}

fn steady_template() -> FoamDict {
    dict([
        (
            "solvers",
            FoamValue::Dict(dict([
                (
                    "p",
                    FoamValue::Dict(dict([
                        ("solver", FoamValue::token("GAMG")),
                        ("tolerance", FoamValue::number(1e-6)),
                        ("relTol", FoamValue::number(0.1)),
                        ("smoother", FoamValue::token("GaussSeidel")),
                    ])),
                ),
                (
                    "\"(U|k|epsilon|omega|R|nuTilda)\"",
                    FoamValue::Dict(dict([
                        ("solver", FoamValue::token("smoothSolver")),
                        ("smoother", FoamValue::token("GaussSeidel")),
                        ("tolerance", FoamValue::number(1e-5)),
                        ("relTol", FoamValue::number(0.1)),
                    ])),
                ),
            ])),
        ),
        (
            "SIMPLE",
            FoamValue::Dict(dict([
                ("nNonOrthogonalCorrectors", FoamValue::token("0")),
                (
                    "residualControl",
                    FoamValue::Dict(dict([
                        ("p", FoamValue::number(GLOBAL_CONVERGENCE)),
                        ("U", FoamValue::number(GLOBAL_CONVERGENCE)),
                        ("\"(k|epsilon|omega)\"", FoamValue::number(GLOBAL_CONVERGENCE)),
                    ])),
                ),
            ])),
        ),
        (
            "relaxationFactors",
            FoamValue::Dict(dict([
                ("fields", FoamValue::Dict(dict([("p", FoamValue::number(0.3))]))),
                (
                    "equations",
                    FoamValue::Dict(dict([
                        ("U", FoamValue::number(0.7)),
                        ("\"(k|epsilon|omega)\"", FoamValue::number(0.7)),
                    ])),
                ),
            ])),
        ),
    ])
}

fn heat_transfer_template() -> FoamDict {
    dict([
        (
            "solvers",
            FoamValue::Dict(dict([
                (
                    "p_rgh",
                    FoamValue::Dict(dict([
                        ("solver", FoamValue::token("PCG")),
                        ("preconditioner", FoamValue::token("DIC")),
                        ("tolerance", FoamValue::number(1e-8)),
                        ("relTol", FoamValue::number(0.01)),
                    ])),
                ),
                (
                    "\"(U|T|k|epsilon|R)\"",
                    FoamValue::Dict(dict([
                        ("solver", FoamValue::token("PBiCG")),
                        ("preconditioner", FoamValue::token("DILU")),
                        ("tolerance", FoamValue::number(1e-6)),
                        ("relTol", FoamValue::number(0.1)),
                    ])),
                ),
            ])),
        ),
        (
            "SIMPLE",
            FoamValue::Dict(dict([
                ("nNonOrthogonalCorrectors", FoamValue::token("0")),
                ("pRefValue", FoamValue::token("0")),
                (
                    "residualControl",
                    FoamValue::Dict(dict([
                        ("p_rgh", FoamValue::number(1e-2)),
                        ("U", FoamValue::number(1e-3)),
                        ("T", FoamValue::number(1e-3)),
                        ("\"(k|epsilon|omega)\"", FoamValue::number(1e-3)),
                    ])),
                ),
            ])),
        ),
        (
            "relaxationFactors",
            FoamValue::Dict(dict([
                ("fields", FoamValue::Dict(dict([("p_rgh", FoamValue::number(0.7))]))),
                (
                    "equations",
                    FoamValue::Dict(dict([
                        ("U", FoamValue::number(0.3)),
                        ("T", FoamValue::number(0.5)),
                        ("\"(k|epsilon|R)\"", FoamValue::number(0.7)),
                    ])),
                ),
            ])),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn completion_fills_missing_quantities() {
        let completed = ResidualControl::new([("p", 1e-5)])
            .unwrap()
            .completed(&["p", "U", "k", "epsilon"]);
        assert_eq!(completed.len(), 4);
        assert_eq!(completed.get("p"), Some(1e-5));
        assert_eq!(completed.get("U"), Some(1e-4));
        assert_eq!(completed.get("k"), Some(1e-4));
        assert_eq!(completed.get("epsilon"), Some(1e-4));
    }

    #[test]
    fn completion_of_empty_input_covers_every_quantity() {
        let quantities = ["epsilon", "k", "nut", "U", "p"];
        let completed = ResidualControl::default().completed(&quantities);
        assert_eq!(completed.len(), quantities.len());
        assert!(completed.iter().all(|(_, v)| v == GLOBAL_CONVERGENCE));
    }

    #[test]
    fn non_positive_residual_is_rejected() {
        assert!(ResidualControl::new([("p", 0.0)]).is_err());
        assert!(ResidualControl::new([("p", f64::NAN)]).is_err());
        assert!(RelaxationFactors::new([("U", 1.5)]).is_err());
    }

    #[test]
    fn relaxation_splits_fields_and_equations() {
        let factors = RelaxationFactors::new([("p", 0.3), ("U", 0.7)]).unwrap();
        let d = factors.to_foam_dict();
        assert_eq!(d["fields"].as_dict().unwrap()["p"], FoamValue::token("0.3"));
        assert_eq!(d["equations"].as_dict().unwrap()["U"], FoamValue::token("0.7"));

        let partial = RelaxationFactors::new([("k", 0.5)]).unwrap().to_foam_dict();
        assert!(partial.get("fields").is_none());
    }

    #[test]
    fn residuals_land_in_the_simple_block() {
        let mut doc = FvSolution::from_template(RecipeTemplate::SteadyIncompressible);
        let residuals = ResidualControl::new([("p", 1e-5)])
            .unwrap()
            .completed(&["p", "U"]);
        apply_residual_control(&mut doc, &residuals);

        assert_eq!(doc.residual_control(), Some(residuals));
        let simple = doc.foam_file().effective_value("SIMPLE").unwrap().as_dict().unwrap();
        assert_eq!(simple["nNonOrthogonalCorrectors"], FoamValue::token("0"));
    }

    #[test]
    fn empty_relaxation_keeps_template() {
        let mut doc = FvSolution::from_template(RecipeTemplate::SteadyIncompressible);
        let before = doc.foam_file().effective_values();
        apply_relaxation_factors(&mut doc, &RelaxationFactors::default());
        assert_eq!(doc.foam_file().effective_values(), before);
    }

    #[test]
    fn reference_point_joins_the_simple_block() {
        let mut doc = FvSolution::from_template(RecipeTemplate::HeatTransfer);
        set_reference_point(&mut doc, FoamValue::vector([1.0, 2.0, 3.0]));
        let simple = doc.foam_file().effective_value("SIMPLE").unwrap().as_dict().unwrap();
        assert_eq!(simple["pRefPoint"].inline_text(), "(1 2 3)");
        assert_eq!(simple["pRefValue"], FoamValue::token("0"));
    }

    #[test]
    fn partial_relaxation_keeps_other_factors() {
        let mut doc = FvSolution::from_template(RecipeTemplate::SteadyIncompressible);
        apply_relaxation_factors(&mut doc, &RelaxationFactors::new([("U", 0.5)]).unwrap());
        let block = doc.foam_file().effective_value("relaxationFactors").unwrap().as_dict().unwrap();
        let fields = block["fields"].as_dict().unwrap();
        let equations = block["equations"].as_dict().unwrap();
        assert_eq!(fields["p"], FoamValue::token("0.3"));
        assert_eq!(equations["U"], FoamValue::token("0.5"));
        assert_eq!(equations["\"(k|epsilon|omega)\""], FoamValue::token("0.7"));
    }

    #[test]
    fn empty_relaxation_keeps_factors_read_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fvSolution");
        fs::write(
            &path,
            "FoamFile { version 2.0; format ascii; class dictionary; location \"system\"; object fvSolution; }\n\
             SIMPLE { nNonOrthogonalCorrectors 0; }\n\
             relaxationFactors { equations { U 0.9; } }\n",
        )
        .unwrap();
        let mut doc = FvSolution::from_file(&path).unwrap();
        let before = doc.foam_file().effective_values();
        apply_relaxation_factors(&mut doc, &RelaxationFactors::default());
        assert_eq!(doc.foam_file().effective_values(), before);
        assert!(doc.foam_file().to_foam_string().contains("U               0.9;"));
    }
}
