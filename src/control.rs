//! Run-control documents of the `system` folder that recipes touch but do
//! not own: `controlDict`, `decomposeParDict` and `probes`.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::foamfile::{FoamFile, SaveOutcome};
use crate::types::foam_value::{dict, format_number, FoamDict, FoamValue};

fn shared(cell: &'static OnceLock<Arc<FoamDict>>, build: fn() -> FoamDict) -> Arc<FoamDict> {
    cell.get_or_init(|| Arc::new(build())).clone()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlDict(FoamFile);

impl ControlDict {
    pub fn new(values: FoamDict) -> Self {
        static TEMPLATE: OnceLock<Arc<FoamDict>> = OnceLock::new();
        ControlDict(FoamFile::new(
            "controlDict",
            "dictionary",
            "system",
            shared(&TEMPLATE, control_template),
            values,
        ))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        FoamFile::from_file_as(path, "dictionary", Arc::new(FoamDict::new())).map(ControlDict)
    }

    pub fn application(&self) -> Option<&str> {
        self.0.effective_value("application").and_then(|v| v.as_token())
    }

    pub fn set_application(&mut self, application: &str) {
        self.0.set("application", application);
    }

    pub fn foam_file(&self) -> &FoamFile {
        &self.0
    }

    pub fn foam_file_mut(&mut self) -> &mut FoamFile {
        &mut self.0
    }

    pub fn save(&self, project_dir: &Path, overwrite: bool) -> Result<SaveOutcome> {
        self.0.save(project_dir, overwrite)
    }
}

impl Default for ControlDict {
    fn default() -> Self {
        ControlDict::new(FoamDict::new())
    }
}

fn control_template() -> FoamDict {
    dict([
        ("application", FoamValue::token("simpleFoam")),
        ("startFrom", FoamValue::token("latestTime")),
        ("startTime", FoamValue::token("0")),
        ("stopAt", FoamValue::token("endTime")),
        ("endTime", FoamValue::token("1000")),
        ("deltaT", FoamValue::token("1")),
        ("writeControl", FoamValue::token("timeStep")),
        ("writeInterval", FoamValue::token("100")),
        ("purgeWrite", FoamValue::token("0")),
        ("writeFormat", FoamValue::token("ascii")),
        ("writePrecision", FoamValue::token("7")),
        ("writeCompression", FoamValue::token("off")),
        ("timeFormat", FoamValue::token("general")),
        ("timePrecision", FoamValue::token("6")),
        ("runTimeModifiable", FoamValue::token("true")),
    ])
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecomposeParDict(FoamFile);

impl DecomposeParDict {
    /// Scotch decomposition into `subdomains` pieces.
    pub fn new(subdomains: u32) -> Self {
        DecomposeParDict(FoamFile::without_defaults(
            "decomposeParDict",
            "dictionary",
            "system",
            dict([
                ("numberOfSubdomains", FoamValue::token(subdomains.to_string())),
                ("method", FoamValue::token("scotch")),
            ]),
        ))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        FoamFile::from_file_as(path, "dictionary", Arc::new(FoamDict::new())).map(DecomposeParDict)
    }

    pub fn subdomains(&self) -> Option<u32> {
        self.0
            .effective_value("numberOfSubdomains")
            .and_then(|v| v.as_token())
            .and_then(|t| t.parse().ok())
    }

    pub fn foam_file(&self) -> &FoamFile {
        &self.0
    }

    pub fn save(&self, project_dir: &Path, overwrite: bool) -> Result<SaveOutcome> {
        self.0.save(project_dir, overwrite)
    }
}

/// Point probes sampled while the solver runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Probes(FoamFile);

impl Probes {
    pub fn new<S: AsRef<str>>(fields: &[S], locations: &[[f64; 3]]) -> Self {
        let fields = FoamValue::List(fields.iter().map(|f| FoamValue::token(f.as_ref())).collect());
        let locations = FoamValue::List(locations.iter().map(|p| FoamValue::vector(*p)).collect());
        Probes(FoamFile::without_defaults(
            "probes",
            "dictionary",
            "system",
            dict([
                ("type", FoamValue::token("probes")),
                ("functionObjectLibs", FoamValue::List(vec![FoamValue::token("\"libsampling.so\"")])),
                ("writeControl", FoamValue::token("timeStep")),
                ("writeInterval", FoamValue::token(format_number(1.0))),
                ("fields", fields),
                ("probeLocations", locations),
            ]),
        ))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        FoamFile::from_file_as(path, "dictionary", Arc::new(FoamDict::new())).map(Probes)
    }

    pub fn foam_file(&self) -> &FoamFile {
        &self.0
    }

    pub fn save(&self, project_dir: &Path, overwrite: bool) -> Result<SaveOutcome> {
        self.0.save(project_dir, overwrite)
    }
}
