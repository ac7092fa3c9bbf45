// Dictionary model and case preparation for OpenFOAM-style solver cases.
pub mod error;
pub mod config;
pub mod types {
    pub mod foam_value;
}
pub mod parsing;
pub mod foamfile;
pub mod fields;
pub mod geometry;
pub mod solution;
pub mod control;
pub mod conditions;
pub mod case;
pub mod recipe;

pub use case::{Case, MeshMetadata};
pub use error::{FoamError, Result};
pub use foamfile::{FoamFile, SaveOutcome};
pub use recipe::{CaseRecipe, HeatTransfer, PrepareOptions, PrepareReport, Recipe, SteadyIncompressible};
pub use types::foam_value::{FoamDict, FoamValue};
