use indexmap::IndexMap;

use crate::types::foam_value::{format_number, FoamDict, FoamValue};

/// A patch-level boundary condition: `{ type ...; value ...; }`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCondition {
    pub bc_type: String,
    pub value: Option<String>,
}

impl BoundaryCondition {
    pub fn new(bc_type: impl Into<String>, value: Option<&str>) -> Self {
        BoundaryCondition {
            bc_type: bc_type.into(),
            value: value.map(String::from),
        }
    }

    pub fn to_foam_dict(&self) -> FoamDict {
        let mut entry = FoamDict::new();
        entry.insert("type".to_string(), FoamValue::token(self.bc_type.clone()));
        if let Some(value) = &self.value {
            entry.insert("value".to_string(), FoamValue::token(value.clone()));
        }
        entry
    }
}

/// Anything that can contribute boundary patches to the field files of a case.
pub trait Geometry {
    fn name(&self) -> &str;

    /// The (patch, condition) pairs this geometry contributes for `quantity`.
    /// An empty result is valid.
    fn boundary_conditions(&self, quantity: &str) -> Vec<(String, BoundaryCondition)>;
}

/// Boundary-condition hints of one geometry, keyed by quantity name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryConditionSet {
    conditions: IndexMap<String, BoundaryCondition>,
}

impl BoundaryConditionSet {
    pub fn set(&mut self, quantity: impl Into<String>, condition: BoundaryCondition) {
        self.conditions.insert(quantity.into(), condition);
    }

    pub fn get(&self, quantity: &str) -> Option<&BoundaryCondition> {
        self.conditions.get(quantity)
    }

    fn from_pairs(pairs: &[(&str, &str, Option<&str>)]) -> Self {
        let mut set = BoundaryConditionSet::default();
        for (quantity, bc_type, value) in pairs {
            set.set(*quantity, BoundaryCondition::new(*bc_type, *value));
        }
        set
    }

    /// No-slip wall with wall functions for the turbulence quantities.
    pub fn wall() -> Self {
        Self::from_pairs(&[
            ("U", "fixedValue", Some("uniform (0 0 0)")),
            ("p", "zeroGradient", None),
            ("k", "kqRWallFunction", Some("uniform 0.1")),
            ("epsilon", "epsilonWallFunction", Some("uniform 0.01")),
            ("nut", "nutkWallFunction", Some("uniform 0")),
            ("T", "zeroGradient", None),
            ("alphat", "calculated", Some("uniform 0")),
            ("p_rgh", "fixedFluxPressure", Some("uniform 0")),
        ])
    }

    /// Fixed-velocity inlet.
    pub fn inlet(velocity: [f64; 3]) -> Self {
        let u = format!(
            "uniform ({} {} {})",
            format_number(velocity[0]),
            format_number(velocity[1]),
            format_number(velocity[2])
        );
        let mut set = Self::from_pairs(&[
            ("p", "zeroGradient", None),
            ("k", "fixedValue", Some("uniform 0.1")),
            ("epsilon", "fixedValue", Some("uniform 0.01")),
            ("nut", "calculated", Some("uniform 0")),
            ("T", "fixedValue", Some("uniform 300")),
            ("alphat", "calculated", Some("uniform 0")),
            ("p_rgh", "fixedFluxPressure", Some("uniform 0")),
        ]);
        set.set("U", BoundaryCondition::new("fixedValue", Some(&u)));
        set
    }

    /// Fixed-pressure outlet.
    pub fn outlet() -> Self {
        Self::from_pairs(&[
            ("U", "zeroGradient", None),
            ("p", "fixedValue", Some("uniform 0")),
            ("k", "zeroGradient", None),
            ("epsilon", "zeroGradient", None),
            ("nut", "calculated", Some("uniform 0")),
            ("T", "zeroGradient", None),
            ("alphat", "calculated", Some("uniform 0")),
            ("p_rgh", "fixedValue", Some("uniform 0")),
        ])
    }
}

/// A named surface whose patch shares its name.
#[derive(Debug, Clone, PartialEq)]
pub struct BFGeometry {
    name: String,
    boundary: BoundaryConditionSet,
}

impl BFGeometry {
    pub fn new(name: impl Into<String>, boundary: BoundaryConditionSet) -> Self {
        BFGeometry {
            name: name.into(),
            boundary,
        }
    }

    pub fn boundary(&self) -> &BoundaryConditionSet {
        &self.boundary
    }
}

impl Geometry for BFGeometry {
    fn name(&self) -> &str {
        &self.name
    }

    fn boundary_conditions(&self, quantity: &str) -> Vec<(String, BoundaryCondition)> {
        self.boundary
            .get(quantity)
            .map(|condition| vec![(self.name.clone(), condition.clone())])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inlet_velocity_is_rendered_uniform() {
        let inlet = BFGeometry::new("inlet", BoundaryConditionSet::inlet([0.0, 0.0, 1.5]));
        let conditions = inlet.boundary_conditions("U");
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].0, "inlet");
        assert_eq!(conditions[0].1.value.as_deref(), Some("uniform (0 0 1.5)"));
    }

    #[test]
    fn zero_gradient_has_no_value_entry() {
        let dict = BoundaryCondition::new("zeroGradient", None).to_foam_dict();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict["type"], FoamValue::token("zeroGradient"));
    }

    #[test]
    fn unknown_quantity_contributes_nothing() {
        let wall = BFGeometry::new("walls", BoundaryConditionSet::wall());
        assert!(wall.boundary_conditions("omega").is_empty());
    }
}
