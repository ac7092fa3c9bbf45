//! Auxiliary `*Conditions` documents of the zero folder. Field files pull
//! them in through `#include`, so they are never treated as stray files.

use std::path::Path;

use crate::error::Result;
use crate::foamfile::FoamFile;
use crate::types::foam_value::{dict, FoamDict, FoamValue};

pub const INITIAL_CONDITIONS: &str = "initialConditions";
pub const ABL_CONDITIONS: &str = "ABLConditions";

/// Suffix shared by every auxiliary document.
pub const CONDITIONS_SUFFIX: &str = "Conditions";

pub fn is_conditions_file(name: &str) -> bool {
    name.ends_with(CONDITIONS_SUFFIX)
}

/// Uniform starting values referenced by the field files.
pub fn initial_conditions() -> FoamFile {
    FoamFile::without_defaults(
        INITIAL_CONDITIONS,
        "dictionary",
        "0",
        dict([
            ("flowVelocity", FoamValue::vector([0.0, 0.0, 0.0])),
            ("pressure", FoamValue::token("0")),
            ("turbulentKE", FoamValue::token("0.375")),
            ("turbulentEpsilon", FoamValue::token("0.14855")),
        ]),
    )
}

/// Atmospheric boundary layer inlet parameters.
pub fn abl_conditions() -> FoamFile {
    FoamFile::without_defaults(
        ABL_CONDITIONS,
        "dictionary",
        "0",
        dict([
            ("Uref", FoamValue::token("10.0")),
            ("Zref", FoamValue::token("20")),
            ("zDir", FoamValue::vector([0.0, 0.0, 1.0])),
            ("flowDir", FoamValue::vector([1.0, 0.0, 0.0])),
            ("z0", FoamValue::token("uniform 0.1")),
            ("zGround", FoamValue::token("uniform 0.0")),
        ]),
    )
}

/// Reads an auxiliary document as written.
pub fn conditions_from_file(path: &Path) -> Result<FoamFile> {
    FoamFile::from_file_as(path, "dictionary", std::sync::Arc::new(FoamDict::new()))
}
