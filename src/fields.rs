//! Typed field files: the per-quantity initial-condition documents of the
//! zero folder, plus the `g` and `transportProperties` documents every
//! recipe needs in `constant/`.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::Result;
use crate::foamfile::FoamFile;
use crate::geometry::Geometry;
use crate::types::foam_value::{dict, FoamDict, FoamValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    U,
    P,
    K,
    Epsilon,
    Nut,
    T,
    Alphat,
    PRgh,
    G,
    TransportProperties,
}

impl FieldKind {
    pub const ALL: [FieldKind; 10] = [
        FieldKind::U,
        FieldKind::P,
        FieldKind::K,
        FieldKind::Epsilon,
        FieldKind::Nut,
        FieldKind::T,
        FieldKind::Alphat,
        FieldKind::PRgh,
        FieldKind::G,
        FieldKind::TransportProperties,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        FieldKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::U => "U",
            FieldKind::P => "p",
            FieldKind::K => "k",
            FieldKind::Epsilon => "epsilon",
            FieldKind::Nut => "nut",
            FieldKind::T => "T",
            FieldKind::Alphat => "alphat",
            FieldKind::PRgh => "p_rgh",
            FieldKind::G => "g",
            FieldKind::TransportProperties => "transportProperties",
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            FieldKind::U => "volVectorField",
            FieldKind::G => "uniformDimensionedVectorField",
            FieldKind::TransportProperties => "dictionary",
            _ => "volScalarField",
        }
    }

    pub fn location(self) -> &'static str {
        match self {
            FieldKind::G | FieldKind::TransportProperties => "constant",
            _ => "0",
        }
    }

    /// True for documents living in the zero folder with a `boundaryField` block.
    pub fn is_zero_folder_field(self) -> bool {
        self.location() == "0"
    }

    /// The process-wide default template for this kind.
    pub fn defaults(self) -> Arc<FoamDict> {
        static TEMPLATES: OnceLock<Vec<(FieldKind, Arc<FoamDict>)>> = OnceLock::new();
        let templates = TEMPLATES.get_or_init(|| {
            FieldKind::ALL
                .into_iter()
                .map(|kind| (kind, Arc::new(build_template(kind))))
                .collect()
        });
        templates
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, template)| template.clone())
            .unwrap_or_default()
    }

    pub fn new_file(self, values: FoamDict) -> FoamFile {
        FoamFile::new(self.name(), self.class(), self.location(), self.defaults(), values)
    }

    pub fn from_file(self, path: &Path) -> Result<FoamFile> {
        FoamFile::from_file_as(path, self.class(), self.defaults())
    }

    /// Builds the document with its boundary map collected from `geometries`.
    ///
    /// When two geometries contribute the same patch name the first one wins.
    pub fn from_geometries(self, geometries: &[Box<dyn Geometry>]) -> FoamFile {
        if !self.is_zero_folder_field() {
            return self.new_file(FoamDict::new());
        }
        let mut boundary = FoamDict::new();
        for geometry in geometries {
            for (patch, condition) in geometry.boundary_conditions(self.name()) {
                if boundary.contains_key(&patch) {
                    debug!(field = self.name(), patch = %patch, geometry = geometry.name(), "patch already set, keeping first");
                    continue;
                }
                boundary.insert(patch, FoamValue::Dict(condition.to_foam_dict()));
            }
        }
        self.new_file(dict([("boundaryField", FoamValue::Dict(boundary))]))
    }
}

fn field_template(dimensions: &str, internal_field: &str) -> FoamDict {
    dict([
        ("dimensions", FoamValue::dimensions(dimensions)),
        ("#include", FoamValue::Unset),
        ("internalField", FoamValue::token(internal_field)),
        ("boundaryField", FoamValue::Dict(FoamDict::new())),
    ])
}

fn build_template(kind: FieldKind) -> FoamDict {
    match kind {
        FieldKind::U => field_template("[0 1 -1 0 0 0 0]", "uniform (0 0 0)"),
        FieldKind::P => field_template("[0 2 -2 0 0 0 0]", "uniform 0"),
        FieldKind::K => field_template("[0 2 -2 0 0 0 0]", "uniform 0.1"),
        FieldKind::Epsilon => field_template("[0 2 -3 0 0 0 0]", "uniform 0.01"),
        FieldKind::Nut => field_template("[0 2 -1 0 0 0 0]", "uniform 0"),
        FieldKind::T => field_template("[0 0 0 1 0 0 0]", "uniform 300"),
        FieldKind::Alphat => field_template("[0 2 -1 0 0 0 0]", "uniform 0"),
        FieldKind::PRgh => field_template("[0 2 -2 0 0 0 0]", "uniform 0"),
        FieldKind::G => dict([
            ("dimensions", FoamValue::dimensions("[0 1 -2 0 0 0 0]")),
            ("value", FoamValue::vector([0.0, 0.0, -9.81])),
        ]),
        FieldKind::TransportProperties => dict([
            ("transportModel", FoamValue::token("Newtonian")),
            ("nu", FoamValue::token("[0 2 -1 0 0 0 0] 1e-05")),
            // Boussinesq properties, read by the heat-transfer solver only.
            ("beta", FoamValue::token("[0 0 0 -1 0 0 0] 3e-03")),
            ("TRef", FoamValue::token("[0 0 0 1 0 0 0] 300")),
            ("Pr", FoamValue::token("[0 0 0 0 0 0 0] 0.9")),
            ("Prt", FoamValue::token("[0 0 0 0 0 0 0] 0.7")),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BFGeometry, BoundaryCondition, BoundaryConditionSet};

    #[test]
    fn names_round_trip_through_registry() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(FieldKind::from_name("omega"), None);
    }

    #[test]
    fn templates_are_shared() {
        let a = FieldKind::K.defaults();
        let b = FieldKind::K.defaults();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a["internalField"], FoamValue::token("uniform 0.1"));
    }

    #[test]
    fn first_geometry_wins_per_patch() {
        let mut auto_walls = BoundaryConditionSet::wall();
        auto_walls.set("k", BoundaryCondition::new("zeroGradient", None));
        let geometries: Vec<Box<dyn Geometry>> = vec![
            Box::new(BFGeometry::new("inlet", BoundaryConditionSet::inlet([0.0, 0.0, 1.0]))),
            Box::new(BFGeometry::new("walls", BoundaryConditionSet::wall())),
            Box::new(BFGeometry::new("walls", auto_walls)),
        ];
        let k = FieldKind::K.from_geometries(&geometries);
        let boundary = k.effective_value("boundaryField").unwrap().as_dict().unwrap();
        assert_eq!(boundary.len(), 2);
        let walls = boundary["walls"].as_dict().unwrap();
        assert_eq!(walls["type"], FoamValue::token("kqRWallFunction"));
    }

    #[test]
    fn geometry_without_contribution_leaves_map_empty() {
        let geometries: Vec<Box<dyn Geometry>> =
            vec![Box::new(BFGeometry::new("blob", BoundaryConditionSet::default()))];
        let u = FieldKind::U.from_geometries(&geometries);
        assert!(u.effective_value("boundaryField").unwrap().is_empty());
        assert_eq!(u.location(), "0");
        assert_eq!(u.class(), "volVectorField");
    }

    #[test]
    fn constant_documents_ignore_geometries() {
        let geometries: Vec<Box<dyn Geometry>> =
            vec![Box::new(BFGeometry::new("walls", BoundaryConditionSet::wall()))];
        let g = FieldKind::G.from_geometries(&geometries);
        assert_eq!(g.location(), "constant");
        assert!(g.effective_value("boundaryField").is_none());
        assert_eq!(g.require("value").unwrap().inline_text(), "(0 0 -9.81)");
    }
}
